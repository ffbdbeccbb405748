//! PubMed retrieval source.
//!
//! PubMed itself hosts no full text. The article page is scanned for a PMC
//! identifier and the PDF is then fetched through PubMed Central.

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use std::path::Path;
use std::sync::LazyLock;

use crate::models::Paper;
use crate::sources::{require_session, PmcSource, Source, SourceError};
use crate::utils::ThrottledClient;

const PUBMED_BASE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

static PMC_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"PMC(\d+)").expect("valid regex"));

/// PubMed retrieval source
#[derive(Debug, Clone)]
pub struct PubMedSource {
    base_url: String,
    pmc: PmcSource,
}

impl PubMedSource {
    pub fn new() -> Self {
        Self {
            base_url: PUBMED_BASE_URL.to_string(),
            pmc: PmcSource::new(),
        }
    }

    /// Create against different PubMed and NCBI hosts (for testing)
    pub fn with_base_urls(pubmed: impl Into<String>, ncbi: impl Into<String>) -> Self {
        Self {
            base_url: pubmed.into().trim_end_matches('/').to_string(),
            pmc: PmcSource::with_base_url(ncbi),
        }
    }

    /// Find the PMC id linked from the PubMed page of `pubmed_id`.
    async fn find_pmc_id(
        &self,
        client: &ThrottledClient,
        pubmed_id: &str,
    ) -> Result<String, SourceError> {
        let url = format!("{}/{}/", self.base_url, pubmed_id);
        let response = client.get(&url).await?;
        if response.status() != StatusCode::OK {
            return Err(SourceError::NotFound(format!(
                "Error fetching PMC ID for PubMed ID {}. {}",
                pubmed_id,
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read PubMed page: {}", e)))?;
        PMC_ID
            .captures(&html)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| {
                SourceError::NotFound(format!("No PMC ID found for PubMed ID {}.", pubmed_id))
            })
    }
}

impl Default for PubMedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for PubMedSource {
    fn id(&self) -> &str {
        "pubmed"
    }

    fn name(&self) -> &str {
        "PubMed"
    }

    async fn retrieve(
        &self,
        paper: &Paper,
        destination: &Path,
        session: Option<&ThrottledClient>,
    ) -> Result<bool, SourceError> {
        let Some(pubmed_id) = paper.pubmed_id() else {
            return Ok(false);
        };
        let client = require_session(self.id(), session)?;

        let pmc_id = self.find_pmc_id(client, &pubmed_id).await?;
        tracing::trace!(pubmed_id = %pubmed_id, pmc_id = %pmc_id, "Resolved PubMed to PMC");
        self.pmc.fetch(client, &pmc_id, destination).await?;
        Ok(true)
    }
}
