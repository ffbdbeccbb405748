//! Utility modules supporting retrieval.
//!
//! - [`HttpClient`]: The shared HTTP session, created once per harvest
//! - [`ThrottledClient`]: A view of the session bound to one source's rate limiter
//! - [`RateLimiter`]: Delays calls to stay under a [`RateLimit`], never rejects them
//! - [`RetryConfig`] and [`with_retry`]: Exponential backoff for transient failures
//! - [`cite`]: BibTeX cleanup and plain-text citations
//! - [`check_pdf`]: Confirm a file on disk parses as a PDF
//! - [`write_atomic`]: Write a file so readers never observe a partial download
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use paper_scraper::utils::{search_retry_config, with_retry, HttpClient};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let session = HttpClient::new()?;
//! let client = session.throttled(None);
//! let _response = with_retry(search_retry_config(), || client.get("https://api.example.com")).await?;
//! # Ok(())
//! # }
//! ```

pub mod cite;
mod fs;
mod http;
mod pdf;
mod rate_limit;
mod retry;

pub use fs::{discard, ensure_dir, has_content, write_atomic};
pub use http::{HttpClient, ThrottledClient, DEFAULT_USER_AGENT};
pub use pdf::{check_pdf, inspect_pdf, likely_pdf, PdfError, PdfInfo};
pub use rate_limit::{RateLimit, RateLimiter};
pub use retry::{
    is_transient, search_retry_config, throttled_retry_config, with_retry, RetryConfig,
};

#[cfg(test)]
pub(crate) use pdf::sample_pdf;
