//! HTTP session utilities.
//!
//! [`HttpClient`] is the shared session: one connection pool and one set of
//! default headers per harvest. [`ThrottledClient`] is a view of that session
//! bound to one rate limiter, which is what sources receive.

use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::sources::SourceError;
use crate::utils::rate_limit::RateLimiter;
use crate::utils::retry::{throttled_retry_config, RetryConfig};

/// Default user agent for outgoing requests
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with sensible defaults
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::from_config(&HttpConfig::default(), HeaderMap::new())
    }

    /// Create a client from configuration plus extra default headers
    pub fn from_config(config: &HttpConfig, headers: HeaderMap) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// A view of this session whose requests wait on `limiter`.
    pub fn throttled(&self, limiter: Option<Arc<RateLimiter>>) -> ThrottledClient {
        ThrottledClient {
            client: Arc::clone(&self.client),
            limiter,
            retry: throttled_retry_config(),
        }
    }
}

/// Rate-limited view of the shared session.
///
/// Every send, including retries after a 429, first waits on the limiter.
#[derive(Debug, Clone)]
pub struct ThrottledClient {
    client: Arc<Client>,
    limiter: Option<Arc<RateLimiter>>,
    retry: RetryConfig,
}

impl ThrottledClient {
    /// Override how 429 answers are retried
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The limiter requests wait on, if any
    pub fn limiter(&self) -> Option<&Arc<RateLimiter>> {
        self.limiter.as_ref()
    }

    /// Send the request built by `build`.
    ///
    /// `build` runs once per attempt because a sent request cannot be reused.
    pub async fn send<F>(&self, build: F) -> Result<Response, SourceError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut attempt = 0;

        loop {
            if let Some(limiter) = &self.limiter {
                limiter.acquire().await;
            }

            let response = build(&self.client).send().await?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS
                || attempt + 1 >= self.retry.max_attempts
            {
                return Ok(response);
            }

            let delay = self.retry.backoff(attempt);
            tracing::debug!(
                url = %response.url(),
                "Too many requests, backing off for {:?}",
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// GET a URL, following redirects.
    pub async fn get(&self, url: &str) -> Result<Response, SourceError> {
        self.send(|client| client.get(url)).await
    }
}
