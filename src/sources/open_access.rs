//! Open access link source.
//!
//! Follows the `openAccessPdf.url` Semantic Scholar reports for open access
//! papers. The link often points at a publisher landing page rather than the
//! PDF itself, so it goes through [`link_to_pdf`].

use async_trait::async_trait;
use std::path::Path;

use crate::models::Paper;
use crate::sources::link::link_to_pdf;
use crate::sources::{require_session, Source, SourceError};
use crate::utils::ThrottledClient;

#[derive(Debug, Clone, Default)]
pub struct OpenAccessSource;

impl OpenAccessSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Source for OpenAccessSource {
    fn id(&self) -> &str {
        "open_access"
    }

    fn name(&self) -> &str {
        "Open Access"
    }

    async fn retrieve(
        &self,
        paper: &Paper,
        destination: &Path,
        session: Option<&ThrottledClient>,
    ) -> Result<bool, SourceError> {
        let Some(url) = paper.open_access_url() else {
            return Ok(false);
        };
        let client = require_session(self.id(), session)?;

        link_to_pdf(client, url, destination).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperBuilder;
    use crate::utils::{sample_pdf, HttpClient};

    #[tokio::test]
    async fn test_direct_pdf_link() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/oa/paper.pdf")
            .with_header("content-type", "application/pdf")
            .with_body(sample_pdf())
            .create_async()
            .await;

        let session = HttpClient::new().unwrap().throttled(None);
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("p.pdf");
        let paper = PaperBuilder::new("p")
            .open_access(format!("{}/oa/paper.pdf", server.url()))
            .build();

        assert!(OpenAccessSource::new()
            .retrieve(&paper, &destination, Some(&session))
            .await
            .unwrap());
        assert_eq!(std::fs::read(&destination).unwrap(), sample_pdf());
    }

    #[tokio::test]
    async fn test_missing_link_is_failure() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/oa/gone").with_status(404).create_async().await;

        let session = HttpClient::new().unwrap().throttled(None);
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("p.pdf");
        let paper = PaperBuilder::new("p")
            .open_access(format!("{}/oa/gone", server.url()))
            .build();

        let result = OpenAccessSource::new()
            .retrieve(&paper, &destination, Some(&session))
            .await;
        assert!(matches!(result, Err(SourceError::NotFound(_))));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_closed_access_not_applicable() {
        let mut paper = PaperBuilder::new("p").open_access("http://127.0.0.1:9/a.pdf").build();
        paper.is_open_access = Some(false);
        let dir = tempfile::tempdir().unwrap();

        let result = OpenAccessSource::new()
            .retrieve(&paper, &dir.path().join("p.pdf"), None)
            .await;
        assert!(!result.unwrap());
    }
}
