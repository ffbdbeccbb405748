//! Retrieval sources with an extensible trait-based architecture.
//!
//! This module defines the [`Source`] trait that every retrieval strategy
//! implements. A source looks at a [`Paper`] and, if it knows how to obtain
//! that paper's PDF, writes it to the destination path. Sources are
//! registered with a [`SourceRegistry`] together with a priority and an
//! optional rate limit; the harvester tries them in priority order until one
//! succeeds.
//!
//! # Built-in sources
//!
//! | id | needs | priority |
//! |---|---|---|
//! | `arxiv` | `externalIds.ArXiv` | 1 |
//! | `pmc` | `externalIds.PubMedCentral` | 2 |
//! | `pubmed` | `externalIds.PubMed` | 3 |
//! | `open_access` | `isOpenAccess` and `openAccessPdf.url` | 4 |
//! | `doi` | `externalIds.DOI` | 90 |
//! | `local` | an existing PDF at the destination | last |
//!
//! Lower priorities are tried first. See [`SourceRegistry::with_defaults`].

mod arxiv;
mod doi;
mod link;
mod local;
mod open_access;
mod pmc;
mod pubmed;
mod registry;

pub mod mock;

pub use arxiv::ArxivSource;
pub use doi::DoiSource;
pub use link::{find_pdf_link, MAX_LINK_HOPS};
pub use local::LocalSource;
pub use mock::{MockBehavior, MockCall, MockSource};
pub use open_access::OpenAccessSource;
pub use pmc::PmcSource;
pub use pubmed::PubMedSource;
pub use registry::{
    RegisteredSource, SourceOptions, SourceRegistry, DEFAULT_PRIORITY, LAST_RESORT_PRIORITY,
};

use async_trait::async_trait;
use std::path::Path;

use crate::models::Paper;
use crate::utils::ThrottledClient;

/// The Source trait defines the interface for all retrieval strategies.
///
/// # Implementing a New Source
///
/// 1. Create a struct that implements `Source`
/// 2. Return `Ok(false)` from `retrieve` when the paper lacks whatever the
///    source depends on, without touching the network
/// 3. Return `Ok(true)` only after the PDF has been written to `destination`
/// 4. Register it with [`SourceRegistry::register`]
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g., "arxiv", "doi")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Try to write `paper`'s PDF to `destination`.
    ///
    /// `session` is present when the source was registered as requiring one.
    /// It is already bound to this source's rate limiter.
    async fn retrieve(
        &self,
        paper: &Paper,
        destination: &Path,
        session: Option<&ThrottledClient>,
    ) -> Result<bool, SourceError>;
}

/// Borrow the session or fail if the source was registered without one.
pub(crate) fn require_session<'a>(
    source: &str,
    session: Option<&'a ThrottledClient>,
) -> Result<&'a ThrottledClient, SourceError> {
    session.ok_or_else(|| {
        SourceError::InvalidRequest(format!("Source '{}' requires an HTTP session", source))
    })
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (JSON, HTML, etc.)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Paper or PDF not found
    #[error("Paper not found: {0}")]
    NotFound(String),

    /// API error from the source
    #[error("API error: {0}")]
    Api(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<url::ParseError> for SourceError {
    fn from(err: url::ParseError) -> Self {
        SourceError::Parse(format!("URL: {}", err))
    }
}
