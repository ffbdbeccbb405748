//! Paper search backends.
//!
//! The harvester only needs pages of [`Paper`](crate::models::Paper) records
//! and the total number of matches; [`SearchBackend`] is that seam.
//! [`SemanticScholarClient`] is the production implementation.

mod semantic;

pub use semantic::{SemanticScholarClient, SEARCH_FIELDS, SEMANTIC_SCHOLAR_API_URL};

use async_trait::async_trait;

use crate::models::{SearchPage, SearchQuery};
use crate::sources::SourceError;
use crate::utils::HttpClient;

/// A paginated paper search
#[async_trait]
pub trait SearchBackend: Send + Sync + std::fmt::Debug {
    /// Fetch up to `limit` results starting at `offset`.
    ///
    /// `session` is the harvest's shared HTTP session.
    async fn search(
        &self,
        session: &HttpClient,
        query: &SearchQuery,
        offset: usize,
        limit: usize,
    ) -> Result<SearchPage, SourceError>;
}
