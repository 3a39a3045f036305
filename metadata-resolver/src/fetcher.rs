//! Fetch transport used by the resolution pipeline
//!
//! The pipeline only needs "given a URL, return bytes or a failure". The
//! [`ContentFetcher`] trait is that seam; [`ReqwestFetcher`] is the HTTP
//! implementation used in production.

use async_trait::async_trait;
use std::time::Duration;

/// Raw response of a fetch attempt
///
/// Network-level failures are reported as `ok == false` with status 0.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchResponse {
    pub ok: bool,
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Successful response with a body
    pub fn success(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            ok: (200..300).contains(&status),
            status,
            body: body.into(),
        }
    }

    /// Network-level failure
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.ok && (200..300).contains(&self.status)
    }

    /// Body decoded as lossy UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Trait for fetch transports
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch `url` and return its raw response; never panics on network errors
    async fn fetch(&self, url: &str) -> FetchResponse;
}

/// Configuration for the reqwest-backed fetcher
#[derive(Debug, Clone)]
pub struct ReqwestFetcherConfig {
    /// Timeout for HTTP requests in seconds
    pub request_timeout_secs: u64,
    /// Maximum content size to keep in bytes
    pub max_content_size: usize,
    /// User agent string for HTTP requests
    pub user_agent: String,
    /// Maximum number of redirects to follow
    pub max_redirects: usize,
}

impl Default for ReqwestFetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 15,
            max_content_size: 5 * 1024 * 1024, // 5MB
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            max_redirects: 5,
        }
    }
}

/// HTTP fetch transport built on reqwest
pub struct ReqwestFetcher {
    client: reqwest::Client,
    config: ReqwestFetcherConfig,
}

impl ReqwestFetcher {
    /// Create a new fetcher with default configuration
    pub fn new() -> Self {
        Self::with_config(ReqwestFetcherConfig::default())
    }

    /// Create a new fetcher with custom configuration
    pub fn with_config(config: ReqwestFetcherConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(&config.user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, config }
    }

    pub fn config(&self) -> &ReqwestFetcherConfig {
        &self.config
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> FetchResponse {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                if e.is_timeout() {
                    tracing::debug!(url, "fetch timed out");
                } else {
                    tracing::debug!(url, error = %e, "fetch failed");
                }
                return FetchResponse::failed();
            }
        };

        let status = response.status().as_u16();

        if let Some(content_length) = response.content_length() {
            if content_length > self.config.max_content_size as u64 {
                tracing::debug!(url, content_length, "response too large");
                return FetchResponse {
                    ok: false,
                    status,
                    body: Vec::new(),
                };
            }
        }

        match response.bytes().await {
            Ok(bytes) => {
                let mut body = bytes.to_vec();
                body.truncate(self.config.max_content_size);
                FetchResponse::success(status, body)
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "reading body failed");
                FetchResponse {
                    ok: false,
                    status,
                    body: Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_response_status() {
        assert!(FetchResponse::success(200, "ok").is_success());
        assert!(!FetchResponse::success(404, "missing").is_success());
        assert!(!FetchResponse::failed().is_success());
        assert_eq!(FetchResponse::success(200, vec![0xff, b'a']).text(), "\u{fffd}a");
    }

    #[test]
    fn test_fetcher_config_default() {
        let fetcher = ReqwestFetcher::new();
        assert_eq!(fetcher.config().request_timeout_secs, 15);
        assert_eq!(fetcher.config().max_redirects, 5);
    }
}
