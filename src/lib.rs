//! # Paper Scraper
//!
//! Search Semantic Scholar for papers and retrieve their PDFs through a
//! prioritized chain of retrieval sources.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Paper records, search queries and the retrieval result map
//! - [`search`]: The paginated search API client
//! - [`sources`]: Retrieval sources (arXiv, PMC, PubMed, open access, DOI, local) and their registry
//! - [`harvest`]: Fallback execution, batching and the pagination driver
//! - [`utils`]: Throttled HTTP session, rate limiting, citation rendering and PDF checks
//! - [`config`]: Configuration management
//!
//! ## Example
//!
//! ```rust,no_run
//! use paper_scraper::config::get_config;
//! use paper_scraper::harvest::{HarvestRequest, Harvester};
//! use paper_scraper::models::SearchQuery;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = get_config();
//! let harvester = Harvester::from_config(&config)?;
//! let request = HarvestRequest::new(SearchQuery::new("protein folding"))
//!     .limit(5)
//!     .directory("papers");
//!
//! let harvest = harvester.harvest(&request).await?;
//! for (path, meta) in harvest.results.iter() {
//!     println!("{} -> {}", path.display(), meta.citation);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod harvest;
pub mod models;
pub mod search;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use harvest::{HarvestRequest, Harvester};
pub use models::{Paper, RetrievalResults};
pub use sources::{Source, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
