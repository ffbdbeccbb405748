//! Registry of retrieval sources in fallback order.

use nonzero_ext::nonzero;
use std::sync::Arc;

use super::{
    ArxivSource, DoiSource, LocalSource, OpenAccessSource, PmcSource, PubMedSource, Source,
    SourceError,
};
use crate::config::Config;
use crate::utils::{RateLimit, RateLimiter};

/// Priority of a source registered without one.
///
/// Lower priorities are tried first, so this sits after the identifier
/// lookups of the default chain and before the last-resort band.
pub const DEFAULT_PRIORITY: i32 = 50;

/// Priority that is always tried last
pub const LAST_RESORT_PRIORITY: i32 = i32::MAX;

/// How a source takes part in the fallback chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceOptions {
    /// Lower is tried earlier
    pub priority: i32,
    /// Ceiling on this source's request rate, `None` for unthrottled
    pub rate_limit: Option<RateLimit>,
    /// Whether the source receives the shared HTTP session
    pub requires_session: bool,
}

impl SourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn rate_limit(mut self, limit: RateLimit) -> Self {
        self.rate_limit = Some(limit);
        self
    }

    /// The source works without network access and gets no session
    pub fn without_session(mut self) -> Self {
        self.requires_session = false;
        self
    }
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            rate_limit: None,
            requires_session: true,
        }
    }
}

/// A source together with its options and its own rate limiter
#[derive(Debug, Clone)]
pub struct RegisteredSource {
    source: Arc<dyn Source>,
    options: SourceOptions,
    limiter: Option<Arc<RateLimiter>>,
}

impl RegisteredSource {
    fn new(source: Arc<dyn Source>, options: SourceOptions) -> Self {
        let limiter = options.rate_limit.map(|limit| Arc::new(RateLimiter::new(limit)));
        Self {
            source,
            options,
            limiter,
        }
    }

    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }

    pub fn id(&self) -> &str {
        self.source.id()
    }

    pub fn priority(&self) -> i32 {
        self.options.priority
    }

    pub fn rate_limit(&self) -> Option<RateLimit> {
        self.options.rate_limit
    }

    pub fn requires_session(&self) -> bool {
        self.options.requires_session
    }

    /// The limiter owned by this entry
    pub fn limiter(&self) -> Option<&Arc<RateLimiter>> {
        self.limiter.as_ref()
    }
}

/// Registry for retrieval sources
///
/// Entries are kept in execution order: ascending priority, ties in
/// registration order. Sources are only ever added.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    entries: Vec<RegisteredSource>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in chain:
    /// arxiv, pmc, pubmed, open_access, doi, local.
    pub fn with_defaults(config: &Config) -> Self {
        let mut registry = Self::new();

        registry
            .register(
                Arc::new(ArxivSource::new()),
                SourceOptions::new()
                    .priority(1)
                    .rate_limit(RateLimit::per_minute(nonzero!(30u32))),
            )
            .register(
                Arc::new(PmcSource::new()),
                SourceOptions::new()
                    .priority(2)
                    .rate_limit(RateLimit::per_minute(nonzero!(30u32))),
            )
            .register(
                Arc::new(PubMedSource::new()),
                SourceOptions::new()
                    .priority(3)
                    .rate_limit(RateLimit::per_minute(nonzero!(30u32))),
            )
            .register(
                Arc::new(OpenAccessSource::new()),
                SourceOptions::new()
                    .priority(4)
                    .rate_limit(RateLimit::per_minute(nonzero!(45u32))),
            )
            .register(
                Arc::new(DoiSource::from_config(&config.doi)),
                SourceOptions::new()
                    .priority(90)
                    .rate_limit(RateLimit::per_minute(nonzero!(30u32))),
            )
            .register(
                Arc::new(LocalSource::new()),
                SourceOptions::new()
                    .priority(LAST_RESORT_PRIORITY)
                    .without_session(),
            );

        registry
    }

    /// Register a new source. Duplicate ids are not rejected.
    pub fn register(&mut self, source: Arc<dyn Source>, options: SourceOptions) -> &mut Self {
        let at = self
            .entries
            .partition_point(|entry| entry.priority() <= options.priority);
        tracing::trace!(
            source = source.id(),
            priority = options.priority,
            position = at,
            "Registering source"
        );
        self.entries.insert(at, RegisteredSource::new(source, options));
        self
    }

    /// Entries in the order they should be tried
    pub fn ordered(&self) -> &[RegisteredSource] {
        &self.entries
    }

    /// Get the first source with this id
    pub fn get(&self, id: &str) -> Option<&RegisteredSource> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    /// Get a source by ID, returning an error if not found
    pub fn get_required(&self, id: &str) -> Result<&RegisteredSource, SourceError> {
        self.get(id)
            .ok_or_else(|| SourceError::NotFound(format!("Source '{}' not found", id)))
    }

    /// Source ids in execution order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.id())
    }

    /// Get the number of registered sources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{MockBehavior, MockSource};

    fn mock(id: &str) -> Arc<dyn Source> {
        Arc::new(MockSource::new(id, MockBehavior::NotApplicable))
    }

    #[test]
    fn test_default_chain_order() {
        let registry = SourceRegistry::with_defaults(&Config::default());

        assert_eq!(registry.len(), 6);
        assert_eq!(
            registry.ids().collect::<Vec<_>>(),
            vec!["arxiv", "pmc", "pubmed", "open_access", "doi", "local"]
        );

        let local = registry.get("local").unwrap();
        assert!(!local.requires_session());
        assert!(local.limiter().is_none());

        let open_access = registry.get("open_access").unwrap();
        assert_eq!(open_access.rate_limit().unwrap().to_string(), "45/min");
    }

    #[test]
    fn test_ties_keep_registration_order() {
        let mut registry = SourceRegistry::new();
        registry
            .register(mock("late"), SourceOptions::new().priority(10))
            .register(mock("first"), SourceOptions::new().priority(1))
            .register(mock("second"), SourceOptions::new().priority(1))
            .register(mock("default"), SourceOptions::new())
            .register(mock("third"), SourceOptions::new().priority(1));

        let order: Vec<_> = registry.ids().collect();
        assert_eq!(order, vec!["first", "second", "third", "late", "default"]);

        // Same order on every call
        assert_eq!(registry.ids().collect::<Vec<_>>(), order);
    }

    #[test]
    fn test_duplicates_and_lookup() {
        let mut registry = SourceRegistry::new();
        registry
            .register(mock("dup"), SourceOptions::new().priority(2))
            .register(mock("dup"), SourceOptions::new().priority(1));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("dup").unwrap().priority(), 1);
        assert!(registry.get_required("missing").is_err());
    }

    #[test]
    fn test_each_entry_owns_its_limiter() {
        let mut registry = SourceRegistry::new();
        let limit = RateLimit::per_minute(nonzero!(30u32));
        registry
            .register(mock("a"), SourceOptions::new().rate_limit(limit))
            .register(mock("b"), SourceOptions::new().rate_limit(limit));

        let a = registry.get("a").unwrap().limiter().unwrap();
        let b = registry.get("b").unwrap().limiter().unwrap();
        assert!(!Arc::ptr_eq(a, b));
    }
}
