//! Harvest orchestration: search pages in, PDFs out.
//!
//! A harvest pages through search results, splits each page into fixed-size
//! batches and retrieves every paper of a batch concurrently. Each paper is
//! handed to the [`FallbackExecutor`], which walks the source chain until one
//! source produces a PDF. Results accumulate in a caller-owned
//! [`RetrievalResults`] map; the harvest stops once that map holds `limit`
//! entries or the search is exhausted.
//!
//! ```text
//! Harvester ── page ──> BatchCoordinator ── paper ──> FallbackExecutor ──> Source...
//!     ^                        │
//!     └──── more pages? <──────┘ (merge results at batch boundary)
//! ```

mod batch;
mod driver;
mod executor;

pub use batch::{BatchCoordinator, BatchStats};
pub use driver::Harvester;
pub use executor::{Attempt, AttemptResult, FallbackExecutor, FetchOutcome};

use std::path::PathBuf;

use crate::config::{ConfigError, DownloadConfig, HarvestConfig, MAX_PAGE_SIZE};
use crate::models::{Paper, RetrievalResults, SearchQuery};
use crate::sources::SourceError;

/// What to harvest and how much of it
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestRequest {
    pub query: SearchQuery,
    /// Number of PDFs wanted
    pub limit: usize,
    /// Directory PDFs are written to
    pub directory: PathBuf,
    /// Search results requested per page
    pub page_size: usize,
    /// Papers retrieved concurrently
    pub batch_size: usize,
}

impl HarvestRequest {
    /// Create a request with default sizes
    pub fn new(query: SearchQuery) -> Self {
        Self::from_config(query, &HarvestConfig::default(), &DownloadConfig::default())
    }

    /// Create a request with sizes and directory from configuration
    pub fn from_config(query: SearchQuery, harvest: &HarvestConfig, downloads: &DownloadConfig) -> Self {
        Self {
            query,
            limit: harvest.limit,
            directory: downloads.directory.clone(),
            page_size: harvest.page_size,
            batch_size: harvest.batch_size,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Reject sizes that would stall pagination or batching.
    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.query.query.trim().is_empty() {
            return Err(HarvestError::InvalidRequest("query must not be empty".to_string()));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(HarvestError::InvalidRequest(format!(
                "page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        if self.batch_size == 0 {
            return Err(HarvestError::InvalidRequest(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors that end a harvest
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// A search page could not be fetched before anything was retrieved
    #[error("Search failed: {0}")]
    Search(#[source] SourceError),

    /// A search page could not be fetched after some papers were retrieved
    #[error("Search failed after {} papers were retrieved: {source}", .partial.len())]
    Interrupted {
        source: SourceError,
        partial: Box<RetrievalResults>,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The HTTP session could not be created
    #[error("Failed to create HTTP session: {0}")]
    Session(#[source] SourceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Results retrieved before the failure, if any
    pub fn partial(&self) -> Option<&RetrievalResults> {
        match self {
            HarvestError::Interrupted { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

/// Position in the search result list.
///
/// The offset only moves forward within a harvest.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCursor {
    pub query: SearchQuery,
    pub offset: usize,
    pub page_size: usize,
    /// Total matches, known after the first page
    pub total: Option<usize>,
}

impl PageCursor {
    pub fn new(query: SearchQuery, page_size: usize) -> Self {
        Self {
            query,
            offset: 0,
            page_size,
            total: None,
        }
    }

    /// Whether another page should be fetched after the current one.
    pub fn has_next(&self, retrieved: usize, limit: usize) -> bool {
        let total = self.total.unwrap_or(0);
        retrieved < limit && self.offset + self.page_size < total
    }

    /// Move to the next page
    pub fn advance(&mut self) {
        self.offset += self.page_size;
    }

    /// Range of result positions covered by a page of `len` papers
    pub fn span(&self, len: usize) -> (usize, usize) {
        (self.offset, self.offset + len)
    }
}

/// Progress hooks for a running harvest.
///
/// All methods default to doing nothing. The library never prints; front
/// ends implement this to show progress.
pub trait HarvestObserver: Send + Sync {
    /// A search page arrived with `len` papers
    fn page_fetched(&self, _cursor: &PageCursor, _len: usize) {}

    /// The fallback chain finished for one paper
    fn item_finished(&self, _paper: &Paper, _outcome: &FetchOutcome) {}

    /// A batch finished and its results were merged; `retrieved` is the map size
    fn batch_finished(&self, _stats: &BatchStats, _retrieved: usize) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl HarvestObserver for NoopObserver {}

/// Counters for a whole harvest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    /// Search pages fetched
    pub pages: usize,
    /// Total matches reported by the search API
    pub total_available: usize,
    pub batches: usize,
    /// Papers sent through the fallback chain
    pub attempted: usize,
    pub retrieved: usize,
    /// Papers no source could retrieve
    pub exhausted: usize,
    /// Papers skipped because their path already had a result
    pub skipped: usize,
}

impl HarvestSummary {
    fn absorb(&mut self, stats: &BatchStats) {
        self.batches += stats.batches;
        self.attempted += stats.attempted;
        self.retrieved += stats.retrieved;
        self.exhausted += stats.exhausted;
        self.skipped += stats.skipped;
    }
}

/// A finished harvest
#[derive(Debug, Clone, PartialEq)]
pub struct Harvest {
    pub results: RetrievalResults,
    pub summary: HarvestSummary,
}
