//! HTTP client abstraction for testability

use std::time::Duration;

use super::types::{BoxFuture, DirectionsError};

/// Default request timeout for directions calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// The parts of an HTTP response the directions client needs.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed `Retry-After` header (delta-seconds form only).
    pub retry_after: Option<Duration>,
    pub body: Vec<u8>,
}

/// Trait for HTTP client operations.
///
/// This abstraction allows mock clients to stand in for the network in tests.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request. Non-2xx statuses are returned, not errors.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<HttpResponse, DirectionsError>>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, DirectionsError> {
        Self::with_timeout(DEFAULT_HTTP_TIMEOUT)
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, DirectionsError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("flowcast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DirectionsError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<HttpResponse, DirectionsError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| DirectionsError::Transport(format!("Request failed: {}", e)))?;

            let status = response.status().as_u16();
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);

            let body = response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| DirectionsError::Transport(format!("Failed to read response: {}", e)))?;

            Ok(HttpResponse {
                status,
                retry_after,
                body,
            })
        })
    }
}

/// Parse a `Retry-After` value given in (possibly fractional) seconds.
///
/// HTTP-date values are not supported and yield `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Mock HTTP client returning a fixed response and recording URLs.
    pub struct MockHttpClient {
        pub response: Result<HttpResponse, DirectionsError>,
        pub urls: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub fn new(response: Result<HttpResponse, DirectionsError>) -> Self {
            Self {
                response,
                urls: Mutex::new(Vec::new()),
            }
        }

        pub fn ok(body: &str) -> Self {
            Self::new(Ok(HttpResponse {
                status: 200,
                retry_after: None,
                body: body.as_bytes().to_vec(),
            }))
        }
    }

    impl HttpClient for MockHttpClient {
        fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<HttpResponse, DirectionsError>> {
            self.urls.lock().push(url.to_string());
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("2"), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_after(" 1.5 "), Some(Duration::from_millis(1500)));
        assert_eq!(parse_retry_after("-1"), None);
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[tokio::test]
    async fn test_mock_client_records_urls() {
        let mock = MockHttpClient::ok("{}");
        let response = mock.get("http://example.com/a").await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(mock.urls.lock().as_slice(), ["http://example.com/a"]);
    }
}
