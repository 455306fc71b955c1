//! HTTP client utilities.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::sources::SourceError;

/// A fetched page, whatever its status code
#[derive(Debug, Clone)]
pub struct Page {
    pub status: StatusCode,
    pub body: String,
}

/// Shared HTTP client with browser-like headers and an optional rate limit.
///
/// Every request is a single GET: no retries, no redirects beyond reqwest's
/// defaults. Failures are logged here once and returned as [`SourceError`].
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl HttpClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::from_config(&HttpConfig::default())
    }

    /// Create a client from configuration
    pub fn from_config(config: &HttpConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&config.user_agent)?);
        headers.insert(ACCEPT, header_value(&config.accept)?);
        headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))?;

        let limiter = match config.requests_per_second {
            Some(rps) => Some(Arc::new(rate_limiter(rps)?)),
            None => None,
        };

        Ok(Self {
            client: Arc::new(client),
            limiter,
        })
    }

    /// Create from an existing reqwest Client
    pub fn from_client(client: Arc<Client>) -> Self {
        Self {
            client,
            limiter: None,
        }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Whether requests wait on a rate limiter
    pub fn is_rate_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Issue a GET and return the page without judging its status code
    pub async fn get(&self, url: &str) -> Result<Page, SourceError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let response = self.client.get(url).send().await.map_err(|e| {
            let kind = if e.is_timeout() { "timed out" } else { "failed" };
            tracing::warn!(url, "Request {}: {}", kind, e);
            SourceError::Network(e.to_string())
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            tracing::warn!(url, "Failed to read response body: {}", e);
            SourceError::Network(e.to_string())
        })?;

        Ok(Page { status, body })
    }

    /// Issue a GET and return the body, treating any non-2xx status as failure
    pub async fn fetch(&self, url: &str) -> Result<String, SourceError> {
        let page = self.get(url).await?;

        if !page.status.is_success() {
            tracing::warn!(url, status = %page.status, "Request returned non-success status");
            return Err(SourceError::Http {
                status: page.status,
            });
        }

        Ok(page.body)
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("rate_limited", &self.limiter.is_some())
            .finish()
    }
}

fn header_value(value: &str) -> Result<HeaderValue, SourceError> {
    HeaderValue::from_str(value)
        .map_err(|e| SourceError::InvalidRequest(format!("Invalid header value: {}", e)))
}

fn rate_limiter(requests_per_second: f32) -> Result<DefaultDirectRateLimiter, SourceError> {
    if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
        return Err(SourceError::InvalidRequest(format!(
            "requests_per_second must be positive, got {}",
            requests_per_second
        )));
    }

    let period = Duration::try_from_secs_f32(1.0 / requests_per_second).map_err(|e| {
        SourceError::InvalidRequest(format!(
            "requests_per_second {} gives no usable period: {}",
            requests_per_second, e
        ))
    })?;
    let quota = Quota::with_period(period)
        .ok_or_else(|| SourceError::InvalidRequest("rate limit period is zero".to_string()))?
        .allow_burst(nonzero!(1u32));

    Ok(RateLimiter::direct(quota))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_fetch_sends_browser_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .match_header("accept-language", Matcher::Regex("^ru-RU".to_string()))
            .match_header("user-agent", Matcher::Regex("Mozilla/5.0".to_string()))
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let body = client.fetch(&format!("{}/page", server.url())).await.unwrap();

        assert_eq!(body, "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(503)
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let result = client.fetch(&format!("{}/missing", server.url())).await;

        match result {
            Err(SourceError::Http { status }) => assert_eq!(status.as_u16(), 503),
            other => panic!("Expected HTTP error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_keeps_forbidden_page() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/forbidden")
            .with_status(403)
            .with_body("blocked")
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let page = client
            .get(&format!("{}/forbidden", server.url()))
            .await
            .unwrap();

        assert_eq!(page.status, StatusCode::FORBIDDEN);
        assert_eq!(page.body, "blocked");
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let client = HttpClient::new().unwrap();
        let result = client.fetch("http://127.0.0.1:1/").await;
        assert!(matches!(result, Err(SourceError::Network(_))));
    }

    #[test]
    fn test_rate_limit_config() {
        let config = HttpConfig {
            requests_per_second: Some(2.5),
            ..HttpConfig::default()
        };
        assert!(HttpClient::from_config(&config).unwrap().is_rate_limited());
        assert!(!HttpClient::new().unwrap().is_rate_limited());

        let bad = HttpConfig {
            requests_per_second: Some(0.0),
            ..HttpConfig::default()
        };
        assert!(HttpClient::from_config(&bad).is_err());
    }

    #[test]
    fn test_tiny_rate_rejected() {
        for rps in [1e-39_f32, f32::MIN_POSITIVE] {
            let config = HttpConfig {
                requests_per_second: Some(rps),
                ..HttpConfig::default()
            };
            assert!(matches!(
                HttpClient::from_config(&config),
                Err(SourceError::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn test_invalid_header_rejected() {
        let config = HttpConfig {
            user_agent: "bad\nagent".to_string(),
            ..HttpConfig::default()
        };
        assert!(matches!(
            HttpClient::from_config(&config),
            Err(SourceError::InvalidRequest(_))
        ));
    }
}
