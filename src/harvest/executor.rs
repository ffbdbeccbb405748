//! Per-paper fallback over the source chain.

use std::path::Path;
use tracing::Instrument;

use crate::models::Paper;
use crate::sources::{RegisteredSource, SourceError, SourceRegistry};
use crate::utils::{discard, has_content, HttpClient};

/// How one source fared for one paper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    /// The paper lacks what the source needs
    NotApplicable,
    /// The source tried and failed
    Failed(String),
    Retrieved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub source_id: String,
    pub result: AttemptResult,
}

/// Result of running the chain for one paper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Retrieved {
        source_id: String,
        attempts: Vec<Attempt>,
    },
    /// Every source was tried without success
    Exhausted { attempts: Vec<Attempt> },
}

impl FetchOutcome {
    pub fn is_retrieved(&self) -> bool {
        matches!(self, FetchOutcome::Retrieved { .. })
    }

    /// Id of the source that produced the PDF
    pub fn source_id(&self) -> Option<&str> {
        match self {
            FetchOutcome::Retrieved { source_id, .. } => Some(source_id),
            FetchOutcome::Exhausted { .. } => None,
        }
    }

    pub fn attempts(&self) -> &[Attempt] {
        match self {
            FetchOutcome::Retrieved { attempts, .. } | FetchOutcome::Exhausted { attempts } => {
                attempts
            }
        }
    }
}

/// Tries each registered source in order until one writes the PDF.
#[derive(Debug, Clone, Copy)]
pub struct FallbackExecutor<'a> {
    registry: &'a SourceRegistry,
    session: &'a HttpClient,
}

impl<'a> FallbackExecutor<'a> {
    pub fn new(registry: &'a SourceRegistry, session: &'a HttpClient) -> Self {
        Self { registry, session }
    }

    /// Retrieve `paper` to `destination`.
    ///
    /// Source failures never escape: they are logged, recorded in the
    /// outcome and the next source is tried.
    pub async fn fetch(&self, paper: &Paper, destination: &Path) -> FetchOutcome {
        let span = tracing::debug_span!("paper", id = %paper.paper_id);
        self.run_chain(paper, destination).instrument(span).await
    }

    async fn run_chain(&self, paper: &Paper, destination: &Path) -> FetchOutcome {
        let mut attempts = Vec::new();

        for entry in self.registry.ordered() {
            let source_id = entry.id().to_string();
            let result = match self.attempt(entry, paper, destination).await {
                Ok(false) => AttemptResult::NotApplicable,
                Ok(true) if has_content(destination) => AttemptResult::Retrieved,
                Ok(true) => {
                    tracing::debug!(source = %source_id, "Reported success but wrote nothing");
                    if let Err(e) = discard(destination) {
                        tracing::debug!("Could not remove {}: {}", destination.display(), e);
                    }
                    AttemptResult::Failed("no file written".to_string())
                }
                Err(e) => {
                    tracing::debug!(source = %source_id, "Failed: {}", e);
                    AttemptResult::Failed(e.to_string())
                }
            };

            let retrieved = result == AttemptResult::Retrieved;
            attempts.push(Attempt {
                source_id: source_id.clone(),
                result,
            });

            if retrieved {
                tracing::debug!(source = %source_id, "Retrieved {}", destination.display());
                return FetchOutcome::Retrieved {
                    source_id,
                    attempts,
                };
            }
        }

        tracing::debug!("No source could retrieve the paper");
        FetchOutcome::Exhausted { attempts }
    }

    async fn attempt(
        &self,
        entry: &RegisteredSource,
        paper: &Paper,
        destination: &Path,
    ) -> Result<bool, SourceError> {
        if entry.requires_session() {
            // Each request the source makes waits on the entry's limiter.
            let client = self.session.throttled(entry.limiter().cloned());
            entry
                .source()
                .retrieve(paper, destination, Some(&client))
                .await
        } else {
            if let Some(limiter) = entry.limiter() {
                limiter.acquire().await;
            }
            entry.source().retrieve(paper, destination, None).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperBuilder;
    use crate::sources::{MockBehavior, MockSource, SourceOptions};
    use std::sync::Arc;

    fn pdf() -> MockBehavior {
        MockBehavior::Write(b"%PDF-1.4 test".to_vec())
    }

    #[tokio::test]
    async fn test_first_success_stops_chain() {
        let first = Arc::new(MockSource::new("first", pdf()));
        let second = Arc::new(MockSource::new("second", pdf()));

        let mut registry = SourceRegistry::new();
        registry
            .register(second.clone(), SourceOptions::new().priority(2))
            .register(first.clone(), SourceOptions::new().priority(1));

        let session = HttpClient::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let paper = PaperBuilder::new("p").build();

        let outcome = FallbackExecutor::new(&registry, &session)
            .fetch(&paper, &dir.path().join("p.pdf"))
            .await;

        assert_eq!(outcome.source_id(), Some("first"));
        assert_eq!(first.call_count(), 1);
        assert_eq!(second.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failures_fall_through() {
        let na = Arc::new(MockSource::new("na", MockBehavior::NotApplicable));
        let broken = Arc::new(MockSource::new("broken", MockBehavior::Fail("503".to_string())));
        let liar = Arc::new(MockSource::new("liar", MockBehavior::ClaimOnly));
        let good = Arc::new(MockSource::new("good", pdf()));

        let mut registry = SourceRegistry::new();
        registry
            .register(na, SourceOptions::new().priority(1))
            .register(broken, SourceOptions::new().priority(2))
            .register(liar, SourceOptions::new().priority(3))
            .register(good, SourceOptions::new().priority(4));

        let session = HttpClient::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let paper = PaperBuilder::new("p").build();

        let outcome = FallbackExecutor::new(&registry, &session)
            .fetch(&paper, &dir.path().join("p.pdf"))
            .await;

        assert!(outcome.is_retrieved());
        let results: Vec<_> = outcome.attempts().iter().map(|a| a.result.clone()).collect();
        assert_eq!(results[0], AttemptResult::NotApplicable);
        assert!(matches!(&results[1], AttemptResult::Failed(msg) if msg.contains("503")));
        assert_eq!(results[2], AttemptResult::Failed("no file written".to_string()));
        assert_eq!(results[3], AttemptResult::Retrieved);
    }

    #[tokio::test]
    async fn test_exhausted_chain() {
        let mut registry = SourceRegistry::new();
        registry.register(
            Arc::new(MockSource::new("na", MockBehavior::NotApplicable)),
            SourceOptions::new(),
        );

        let session = HttpClient::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("p.pdf");

        let outcome = FallbackExecutor::new(&registry, &session)
            .fetch(&PaperBuilder::new("p").build(), &destination)
            .await;

        assert!(matches!(outcome, FetchOutcome::Exhausted { ref attempts } if attempts.len() == 1));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_session_only_when_required() {
        let online = Arc::new(MockSource::new("online", MockBehavior::NotApplicable));
        let offline = Arc::new(MockSource::new("offline", MockBehavior::NotApplicable));

        let mut registry = SourceRegistry::new();
        registry
            .register(online.clone(), SourceOptions::new().priority(1))
            .register(offline.clone(), SourceOptions::new().priority(2).without_session());

        let session = HttpClient::new().unwrap();
        let dir = tempfile::tempdir().unwrap();

        FallbackExecutor::new(&registry, &session)
            .fetch(&PaperBuilder::new("p").build(), &dir.path().join("p.pdf"))
            .await;

        assert!(online.calls()[0].with_session);
        assert!(!offline.calls()[0].with_session);
    }
}
