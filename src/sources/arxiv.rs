//! arXiv retrieval source.

use async_trait::async_trait;
use std::path::Path;

use crate::models::Paper;
use crate::sources::link::download_pdf;
use crate::sources::{require_session, Source, SourceError};
use crate::utils::ThrottledClient;

/// Base URL for arXiv PDFs
const ARXIV_BASE_URL: &str = "https://arxiv.org";

/// Downloads `https://arxiv.org/pdf/<id>.pdf` for papers with an arXiv id
#[derive(Debug, Clone)]
pub struct ArxivSource {
    base_url: String,
}

impl ArxivSource {
    /// Create a new arXiv source
    pub fn new() -> Self {
        Self::with_base_url(ARXIV_BASE_URL)
    }

    /// Create against a different host (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Strip `arXiv:` prefixes and version suffixes
    fn clean_id(id: &str) -> &str {
        let id = id.trim();
        let id = id
            .strip_prefix("arXiv:")
            .or_else(|| id.strip_prefix("arxiv:"))
            .unwrap_or(id);
        match id.rsplit_once('v') {
            Some((base, version))
                if !base.is_empty()
                    && !version.is_empty()
                    && version.chars().all(|c| c.is_ascii_digit()) =>
            {
                base
            }
            _ => id,
        }
    }
}

impl Default for ArxivSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for ArxivSource {
    fn id(&self) -> &str {
        "arxiv"
    }

    fn name(&self) -> &str {
        "arXiv"
    }

    async fn retrieve(
        &self,
        paper: &Paper,
        destination: &Path,
        session: Option<&ThrottledClient>,
    ) -> Result<bool, SourceError> {
        let Some(arxiv_id) = paper.arxiv_id() else {
            return Ok(false);
        };
        let client = require_session(self.id(), session)?;

        let url = format!("{}/pdf/{}.pdf", self.base_url, Self::clean_id(&arxiv_id));
        download_pdf(client, &url, destination)
            .await
            .map_err(|e| match e {
                SourceError::NotFound(_) => {
                    SourceError::NotFound(format!("No paper with arxiv id {}", arxiv_id))
                }
                other => other,
            })?;
        Ok(true)
    }
}
