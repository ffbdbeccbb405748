//! DOI resolution source.
//!
//! Tries the DOI resolver first, following whatever landing page it leads
//! to. When that fails and a fallback mirror is configured (`DOI2PDF`), the
//! mirror's viewer page is scraped for its download link.

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use std::path::Path;
use std::sync::LazyLock;

use crate::config::DoiConfig;
use crate::models::Paper;
use crate::sources::link::{download_pdf, link_to_pdf};
use crate::sources::{require_session, Source, SourceError};
use crate::utils::ThrottledClient;

/// Default DOI resolver
pub const DOI_RESOLVER_URL: &str = "https://doi.org";

static DOWNLOAD_BUTTON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"location\.href='(.*?download=true)'").expect("valid regex"));

#[derive(Debug, Clone)]
pub struct DoiSource {
    resolver_base: String,
    fallback_base: Option<String>,
}

impl DoiSource {
    /// Resolve through doi.org with no fallback mirror
    pub fn new() -> Self {
        Self {
            resolver_base: DOI_RESOLVER_URL.to_string(),
            fallback_base: None,
        }
    }

    pub fn from_config(config: &DoiConfig) -> Self {
        let source = Self::new().with_resolver(&config.resolver_base);
        match &config.fallback_base {
            Some(base) => source.with_fallback(base),
            None => source,
        }
    }

    /// Use a different resolver (for testing)
    pub fn with_resolver(mut self, base: &str) -> Self {
        self.resolver_base = base.trim_end_matches('/').to_string();
        self
    }

    /// Set the fallback mirror; a trailing `/` is trimmed
    pub fn with_fallback(mut self, base: &str) -> Self {
        let base = base.trim().trim_end_matches('/');
        self.fallback_base = (!base.is_empty()).then(|| base.to_string());
        self
    }

    async fn from_fallback(
        &self,
        client: &ThrottledClient,
        doi: &str,
        destination: &Path,
    ) -> Result<(), SourceError> {
        let base = self
            .fallback_base
            .as_deref()
            .ok_or_else(|| SourceError::Config("No DOI2PDF fallback configured".to_string()))?;

        let viewer = format!("{}/{}", base, doi);
        let response = client.get(&viewer).await?;
        if response.status() != StatusCode::OK {
            return Err(SourceError::NotFound(format!("No paper with doi {}", doi)));
        }
        let html = response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read viewer page: {}", e)))?;

        let link = DOWNLOAD_BUTTON
            .captures(&html)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| SourceError::NotFound(format!("No paper with doi {}", doi)))?;

        download_pdf(client, &absolute_link(base, &link), destination).await
    }
}

impl Default for DoiSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Protocol-relative links get `https:`, anything else is relative to `base`.
fn absolute_link(base: &str, link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        link.to_string()
    } else if let Some(rest) = link.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        format!("{}{}", base, link)
    }
}

#[async_trait]
impl Source for DoiSource {
    fn id(&self) -> &str {
        "doi"
    }

    fn name(&self) -> &str {
        "DOI"
    }

    async fn retrieve(
        &self,
        paper: &Paper,
        destination: &Path,
        session: Option<&ThrottledClient>,
    ) -> Result<bool, SourceError> {
        let Some(doi) = paper.doi() else {
            return Ok(false);
        };
        let client = require_session(self.id(), session)?;

        let resolver = format!("{}/{}", self.resolver_base, doi);
        match link_to_pdf(client, &resolver, destination).await {
            Ok(()) => return Ok(true),
            Err(e) => tracing::debug!(doi = %doi, "Resolver did not lead to a PDF: {}", e),
        }

        self.from_fallback(client, &doi, destination).await?;
        Ok(true)
    }
}
