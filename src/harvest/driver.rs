//! Pagination driver tying search, batching and retrieval together.

use reqwest::header::HeaderMap;
use std::sync::Arc;
use tracing::{info, Instrument};

use super::batch::BatchCoordinator;
use super::executor::FallbackExecutor;
use super::{
    Harvest, HarvestError, HarvestObserver, HarvestRequest, HarvestSummary, NoopObserver,
    PageCursor,
};
use crate::config::{Config, HttpConfig};
use crate::models::RetrievalResults;
use crate::search::{SearchBackend, SemanticScholarClient};
use crate::sources::SourceRegistry;
use crate::utils::{ensure_dir, HttpClient};

/// Runs harvests against a search backend and a source registry.
///
/// Every harvest opens its own HTTP session, shared by the search backend
/// and all sources for the lifetime of that harvest.
#[derive(Clone)]
pub struct Harvester {
    backend: Arc<dyn SearchBackend>,
    registry: Arc<SourceRegistry>,
    http: HttpConfig,
    observer: Arc<dyn HarvestObserver>,
}

impl std::fmt::Debug for Harvester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harvester")
            .field("backend", &self.backend)
            .field("sources", &self.registry.ids().collect::<Vec<_>>())
            .field("http", &self.http)
            .finish()
    }
}

impl Harvester {
    pub fn new(backend: Arc<dyn SearchBackend>, registry: SourceRegistry) -> Self {
        Self {
            backend,
            registry: Arc::new(registry),
            http: HttpConfig::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Semantic Scholar search plus the default source chain
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        config.validate()?;

        let backend = Arc::new(SemanticScholarClient::from_config(config));
        let registry = SourceRegistry::with_defaults(config);

        Ok(Self::new(backend, registry).http_config(config.http.clone()))
    }

    /// Report progress to `observer`
    pub fn observer(mut self, observer: Arc<dyn HarvestObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Transport settings for the per-harvest session
    pub fn http_config(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Harvest into a fresh result map.
    ///
    /// A search failure after at least one paper was retrieved is reported
    /// as [`HarvestError::Interrupted`] carrying what was retrieved.
    pub async fn harvest(&self, request: &HarvestRequest) -> Result<Harvest, HarvestError> {
        let mut results = RetrievalResults::new();

        match self.harvest_into(request, &mut results).await {
            Ok(summary) => Ok(Harvest { results, summary }),
            Err(HarvestError::Search(source)) if !results.is_empty() => {
                Err(HarvestError::Interrupted {
                    source,
                    partial: Box::new(results),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Harvest into `results`, which may already hold entries.
    ///
    /// Entries already present are never overwritten and count towards
    /// `request.limit`. On error `results` keeps everything merged so far.
    pub async fn harvest_into(
        &self,
        request: &HarvestRequest,
        results: &mut RetrievalResults,
    ) -> Result<HarvestSummary, HarvestError> {
        request.validate()?;

        let span = tracing::info_span!("harvest", query = %request.query.query);
        self.run(request, results).instrument(span).await
    }

    async fn run(
        &self,
        request: &HarvestRequest,
        results: &mut RetrievalResults,
    ) -> Result<HarvestSummary, HarvestError> {
        let mut summary = HarvestSummary::default();

        if results.len() >= request.limit {
            info!("Already holding {} of {} papers", results.len(), request.limit);
            return Ok(summary);
        }

        ensure_dir(&request.directory)?;
        let session =
            HttpClient::from_config(&self.http, HeaderMap::new()).map_err(HarvestError::Session)?;

        let executor = FallbackExecutor::new(&self.registry, &session);
        let coordinator = BatchCoordinator::new(
            executor,
            self.observer.as_ref(),
            request.batch_size,
            request.limit,
        );
        let mut cursor = PageCursor::new(request.query.clone(), request.page_size);

        loop {
            let mut page = self
                .backend
                .search(&session, &cursor.query, cursor.offset, cursor.page_size)
                .await
                .map_err(HarvestError::Search)?;

            summary.pages += 1;
            summary.total_available = page.total;
            cursor.total = Some(page.total);

            // Most influential first; ties keep API order.
            page.data
                .sort_by_key(|paper| std::cmp::Reverse(paper.influence()));

            let (from, to) = cursor.span(page.data.len());
            info!("Found {} papers, analyzing {} to {}", page.total, from, to);
            self.observer.page_fetched(&cursor, page.data.len());

            if page.data.is_empty() {
                break;
            }

            let stats = coordinator
                .run(&page.data, &request.directory, results)
                .await;
            summary.absorb(&stats);

            if !cursor.has_next(results.len(), request.limit) {
                break;
            }
            cursor.advance();
        }

        info!(
            "Retrieved {} papers ({} attempted, {} exhausted)",
            summary.retrieved, summary.attempted, summary.exhausted
        );
        Ok(summary)
    }
}
