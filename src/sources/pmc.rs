//! PubMed Central (PMC) retrieval source.

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use std::path::Path;
use std::sync::LazyLock;
use url::Url;

use crate::models::Paper;
use crate::sources::link::download_pdf;
use crate::sources::{require_session, Source, SourceError};
use crate::utils::ThrottledClient;

const NCBI_BASE_URL: &str = "https://www.ncbi.nlm.nih.gov";

static PMC_PDF_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]*\.pdf)""#).expect("valid regex"));

/// PMC retrieval source
///
/// Scrapes the PMC article page for its PDF link and downloads it.
#[derive(Debug, Clone)]
pub struct PmcSource {
    base_url: String,
}

impl PmcSource {
    pub fn new() -> Self {
        Self::with_base_url(NCBI_BASE_URL)
    }

    /// Create against a different NCBI host (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Clean PMCID (remove PMC prefix if present)
    fn clean_pmcid(pmcid: &str) -> &str {
        pmcid.trim().trim_start_matches("PMC")
    }

    /// Locate the PDF link on the article page of `pmc_id`.
    async fn find_pdf_link(
        &self,
        client: &ThrottledClient,
        pmc_id: &str,
    ) -> Result<String, SourceError> {
        let page = format!("{}/pmc/articles/PMC{}", self.base_url, pmc_id);
        let response = client.get(&page).await?;
        if response.status() != StatusCode::OK {
            return Err(SourceError::NotFound(format!(
                "No paper with pmc id {}. {} {}",
                pmc_id,
                page,
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read article page: {}", e)))?;
        let link = PMC_PDF_LINK
            .captures(&html)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| {
                SourceError::NotFound(format!("No PDF link found for pmc id {}. {}", pmc_id, page))
            })?;

        Ok(Url::parse(&page)?.join(&link)?.to_string())
    }

    /// Download the PDF of `pmc_id` to `destination`.
    pub(crate) async fn fetch(
        &self,
        client: &ThrottledClient,
        pmc_id: &str,
        destination: &Path,
    ) -> Result<(), SourceError> {
        let pmc_id = Self::clean_pmcid(pmc_id);
        let pdf_url = self.find_pdf_link(client, pmc_id).await?;
        download_pdf(client, &pdf_url, destination).await
    }
}

impl Default for PmcSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for PmcSource {
    fn id(&self) -> &str {
        "pmc"
    }

    fn name(&self) -> &str {
        "PubMed Central"
    }

    async fn retrieve(
        &self,
        paper: &Paper,
        destination: &Path,
        session: Option<&ThrottledClient>,
    ) -> Result<bool, SourceError> {
        let Some(pmc_id) = paper.pmc_id() else {
            return Ok(false);
        };
        let client = require_session(self.id(), session)?;

        self.fetch(client, &pmc_id, destination).await?;
        Ok(true)
    }
}
