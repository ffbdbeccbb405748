//! Shared download helpers: direct PDF downloads and landing-page link following.

use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::path::Path;
use std::sync::LazyLock;
use url::Url;

use crate::sources::SourceError;
use crate::utils::{likely_pdf, write_atomic, ThrottledClient};

/// Landing pages followed before giving up on a link
pub const MAX_LINK_HOPS: usize = 3;

static EPDF_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]*\.epdf)""#).expect("valid regex"));
static PDF_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]*pdf[^"]*)""#).expect("valid regex"));

/// Download `url` and store it at `destination` if the body looks like a PDF.
pub(crate) async fn download_pdf(
    client: &ThrottledClient,
    url: &str,
    destination: &Path,
) -> Result<(), SourceError> {
    let response = client.get(url).await?;
    if response.status() != StatusCode::OK {
        return Err(SourceError::NotFound(format!(
            "Unable to download {}, status code {}",
            url,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SourceError::Network(format!("Failed to read PDF: {}", e)))?;
    if !likely_pdf(&bytes) {
        return Err(SourceError::NotFound(format!("No PDF at {}", url)));
    }

    write_atomic(destination, &bytes)
}

/// Follow `url` to a PDF.
///
/// A response whose `Content-Type` mentions `pdf` is stored directly. Anything
/// else is treated as a landing page and searched for a PDF link, which is
/// resolved against the page URL and followed, up to [`MAX_LINK_HOPS`] times.
pub(crate) async fn link_to_pdf(
    client: &ThrottledClient,
    url: &str,
    destination: &Path,
) -> Result<(), SourceError> {
    let mut current = url.to_string();

    for _ in 0..=MAX_LINK_HOPS {
        let response = client.get(&current).await?;
        if response.status() != StatusCode::OK {
            return Err(SourceError::NotFound(format!(
                "Unable to download {}, status code {}",
                current,
                response.status()
            )));
        }

        let is_pdf = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("pdf"))
            .unwrap_or(false);

        if is_pdf {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| SourceError::Network(format!("Failed to read PDF: {}", e)))?;
            return write_atomic(destination, &bytes);
        }

        let page_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read page: {}", e)))?;
        let link = find_pdf_link(&html)
            .ok_or_else(|| SourceError::NotFound(format!("No PDF link found for {}", current)))?;

        let next = resolve(&page_url, &link)?;
        tracing::trace!(from = %current, to = %next, "Following PDF link");
        current = next;
    }

    Err(SourceError::NotFound(format!(
        "No PDF within {} links of {}",
        MAX_LINK_HOPS, url
    )))
}

/// Find the most promising PDF link on an HTML page.
///
/// `.epdf` viewer links are preferred and rewritten to their `pdf` form;
/// otherwise the first `href` mentioning `pdf` is returned.
pub fn find_pdf_link(html: &str) -> Option<String> {
    if let Some(caps) = EPDF_LINK.captures(html) {
        return Some(caps[1].replace("epdf", "pdf"));
    }
    PDF_LINK.captures(html).map(|caps| caps[1].to_string())
}

fn resolve(base: &Url, link: &str) -> Result<String, SourceError> {
    let link = link.replace("&amp;", "&");
    base.join(&link)
        .map(String::from)
        .map_err(|e| SourceError::Parse(format!("Malformed URL {} -- {}: {}", link, base, e)))
}
