//! Semantic Scholar Graph API search.

use async_trait::async_trait;
use nonzero_ext::nonzero;
use reqwest::StatusCode;
use std::sync::Arc;

use crate::config::Config;
use crate::models::{SearchPage, SearchQuery};
use crate::search::SearchBackend;
use crate::sources::SourceError;
use crate::utils::{search_retry_config, with_retry, HttpClient, RateLimit, RateLimiter};

pub const SEMANTIC_SCHOLAR_API_URL: &str = "https://api.semanticscholar.org";

/// Paper fields requested with every search
pub const SEARCH_FIELDS: &[&str] = &[
    "citationStyles",
    "externalIds",
    "url",
    "openAccessPdf",
    "year",
    "isOpenAccess",
    "influentialCitationCount",
    "tldr",
    "title",
];

/// Semantic Scholar search client
///
/// Requests carry the API key in `x-api-key` when one is configured. Keyed
/// access is throttled at 90 requests per second, anonymous access at 15 per
/// minute.
#[derive(Debug, Clone)]
pub struct SemanticScholarClient {
    base_url: String,
    api_key: Option<String>,
    limiter: Arc<RateLimiter>,
}

impl SemanticScholarClient {
    /// Create a new client, optionally with an API key
    pub fn new(api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        let limit = if api_key.is_some() {
            RateLimit::per_second(nonzero!(90u32))
        } else {
            RateLimit::per_minute(nonzero!(15u32))
        };

        Self {
            base_url: SEMANTIC_SCHOLAR_API_URL.to_string(),
            api_key,
            limiter: Arc::new(RateLimiter::new(limit)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_keys.semantic_scholar.clone())
    }

    /// Point at a different host (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the request rate ceiling
    pub fn with_rate_limit(mut self, limit: RateLimit) -> Self {
        self.limiter = Arc::new(RateLimiter::new(limit));
        self
    }

    pub fn rate_limit(&self) -> RateLimit {
        self.limiter.limit()
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn params(query: &SearchQuery, offset: usize, limit: usize) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("query", query.query.clone()),
            ("fields", SEARCH_FIELDS.join(",")),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(year) = query.year {
            params.push(("year", year.to_string()));
        }
        params
    }
}

#[async_trait]
impl SearchBackend for SemanticScholarClient {
    async fn search(
        &self,
        session: &HttpClient,
        query: &SearchQuery,
        offset: usize,
        limit: usize,
    ) -> Result<SearchPage, SourceError> {
        let client = session.throttled(Some(Arc::clone(&self.limiter)));
        let url = format!("{}/graph/v1/paper/search", self.base_url);
        let params = Self::params(query, offset, limit);

        let client = &client;
        let url = url.as_str();
        let params = &params;
        let api_key = self.api_key.as_deref();

        let response = with_retry(search_retry_config(), move || {
            client.send(move |http| {
                let request = http.get(url).query(params);
                match api_key {
                    Some(key) => request.header("x-api-key", key),
                    None => request,
                }
            })
        })
        .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api(format!(
                "Error searching papers: {} {}",
                status, body
            )));
        }

        response
            .json::<SearchPage>()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse search response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_rate_limit_depends_on_key() {
        assert_eq!(SemanticScholarClient::new(None).rate_limit().to_string(), "15/min");
        assert_eq!(
            SemanticScholarClient::new(Some("key".to_string())).rate_limit().to_string(),
            "90/s"
        );
        assert!(!SemanticScholarClient::new(Some("  ".to_string())).has_api_key());
    }

    #[tokio::test]
    async fn test_search_sends_parameters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/graph/v1/paper/search")
            .match_header("x-api-key", "secret")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "protein folding".into()),
                Matcher::UrlEncoded("fields".into(), SEARCH_FIELDS.join(",")),
                Matcher::UrlEncoded("limit".into(), "100".into()),
                Matcher::UrlEncoded("offset".into(), "200".into()),
                Matcher::UrlEncoded("year".into(), "2018-2022".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(r#"{"total": 1234, "offset": 200, "data": [{"paperId": "a", "title": "A"}]}"#)
            .create_async()
            .await;

        let client = SemanticScholarClient::new(Some("secret".to_string()))
            .with_base_url(server.url());
        let session = HttpClient::new().unwrap();
        let query = SearchQuery::new("protein folding").year("2018-2022");

        let page = client.search(&session, &query, 200, 100).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.total, 1234);
        assert_eq!(page.data[0].title.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_error_status_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/graph/v1/paper/search")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error": "Unrecognized or unsupported fields"}"#)
            .create_async()
            .await;

        let client = SemanticScholarClient::new(None)
            .with_base_url(server.url())
            .with_rate_limit(RateLimit::per_second(nonzero!(100u32)));
        let session = HttpClient::new().unwrap();

        let err = client
            .search(&session, &SearchQuery::new("x"), 0, 100)
            .await
            .unwrap_err();

        match err {
            SourceError::Api(message) => {
                assert!(message.contains("400"));
                assert!(message.contains("Unrecognized"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
