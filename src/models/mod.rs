//! Core data models for paper records, search queries and retrieval results.

mod paper;
mod results;
mod search;

pub use paper::{CitationStyles, ExternalId, OpenAccessPdf, Paper, PaperBuilder, Tldr};
pub use results::{PaperMetadata, RetrievalResults};
pub use search::{SearchPage, SearchQuery, YearFilter};
