//! Metadata Resolution Pipeline
//!
//! Resolves a title and image for a URL through two best-effort proxies:
//!
//! 1. a rendering proxy returning the page HTML,
//! 2. a text-extraction proxy returning Markdown-like text, tried only when
//!    the first attempt produced no usable body.
//!
//! Attempts run sequentially and each is bounded by a timeout. Resolution
//! never fails: when both attempts come back empty the placeholder result
//! is returned so a bookmark can still be created.

use linkshelf_core::canonical::canonicalize;
use linkshelf_core::MetadataResult;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::extractor::{ContentFormat, MetadataExtractor};
use crate::fetcher::{ContentFetcher, FetchResponse};

/// Default rendering proxy, the target URL is appended percent-encoded
pub const DEFAULT_RENDER_PROXY: &str = "https://api.allorigins.win/raw?url=";

/// Default text-extraction proxy, the target URL is appended verbatim
pub const DEFAULT_TEXT_PROXY: &str = "https://r.jina.ai/";

/// Markers of interstitial, bot-check and block pages, matched lowercase
const BLOCK_PAGE_MARKERS: &[&str] = &[
    "forbidden",
    "cf-browser-verification",
    "challenge-platform",
    "just a moment...",
    "attention required",
];

/// Proxy endpoints used by the two attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoints {
    pub render_proxy: String,
    pub text_proxy: String,
}

impl Default for ProxyEndpoints {
    fn default() -> Self {
        Self {
            render_proxy: DEFAULT_RENDER_PROXY.to_string(),
            text_proxy: DEFAULT_TEXT_PROXY.to_string(),
        }
    }
}

impl ProxyEndpoints {
    /// Proxy URL for the HTML attempt
    pub fn render_url(&self, target: &str) -> String {
        format!("{}{}", self.render_proxy, urlencoding::encode(target))
    }

    /// Proxy URL for the Markdown attempt
    pub fn text_url(&self, target: &str) -> String {
        format!("{}{}", self.text_proxy, target)
    }
}

/// Configuration for the resolution pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub endpoints: ProxyEndpoints,
    /// Upper bound for a single fetch attempt
    pub attempt_timeout: Duration,
    /// HTML bodies shorter than this are treated as block pages
    pub min_html_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoints: ProxyEndpoints::default(),
            attempt_timeout: Duration::from_secs(12),
            min_html_bytes: 500,
        }
    }
}

/// Why an attempt's body was discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    Timeout,
    Network,
    Status(u16),
    BlockPage(&'static str),
    TooShort(usize),
    Empty,
}

/// Fetch-with-fallback metadata resolver
pub struct MetadataPipeline {
    fetcher: Arc<dyn ContentFetcher>,
    extractor: MetadataExtractor,
    config: PipelineConfig,
}

impl MetadataPipeline {
    /// Create a pipeline with default configuration
    pub fn new(fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self::with_config(fetcher, PipelineConfig::default())
    }

    /// Create a pipeline with custom configuration
    pub fn with_config(fetcher: Arc<dyn ContentFetcher>, config: PipelineConfig) -> Self {
        Self::with_extractor(fetcher, config, MetadataExtractor::new())
    }

    pub fn with_extractor(
        fetcher: Arc<dyn ContentFetcher>,
        config: PipelineConfig,
        extractor: MetadataExtractor,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            config,
        }
    }

    /// Get the current configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolve metadata for `url`, falling back to the placeholder result
    pub async fn resolve(&self, url: &str) -> MetadataResult {
        let target = canonicalize(url);

        match self.fetch_html(&target).await {
            Ok(body) => {
                let result = self.extractor.extract(&body, &target, ContentFormat::Html);
                info!(url = %target, title = ?result.title, image = ?result.image, "resolved metadata from html");
                return result;
            }
            Err(reason) => warn!(url = %target, ?reason, "html attempt failed, trying text proxy"),
        }

        match self.fetch_markdown(&target).await {
            Ok(body) => {
                let result = self.extractor.extract(&body, &target, ContentFormat::Markdown);
                info!(url = %target, title = ?result.title, image = ?result.image, "resolved metadata from text proxy");
                result
            }
            Err(reason) => {
                warn!(url = %target, ?reason, "text attempt failed, using placeholder");
                MetadataResult::placeholder(target)
            }
        }
    }

    async fn fetch_bounded(&self, proxy_url: &str) -> Result<FetchResponse, AttemptFailure> {
        debug!(proxy_url, "fetching");
        let response = tokio::time::timeout(self.config.attempt_timeout, self.fetcher.fetch(proxy_url))
            .await
            .map_err(|_| AttemptFailure::Timeout)?;

        if !response.ok && response.status == 0 {
            return Err(AttemptFailure::Network);
        }
        if !response.is_success() {
            return Err(AttemptFailure::Status(response.status));
        }
        Ok(response)
    }

    /// Attempt 1: rendered HTML through the rendering proxy
    async fn fetch_html(&self, target: &str) -> Result<String, AttemptFailure> {
        let response = self.fetch_bounded(&self.config.endpoints.render_url(target)).await?;
        let body = response.text();

        let lower = body.to_lowercase();
        if let Some(marker) = BLOCK_PAGE_MARKERS.iter().copied().find(|m| lower.contains(m)) {
            return Err(AttemptFailure::BlockPage(marker));
        }
        if body.len() < self.config.min_html_bytes {
            return Err(AttemptFailure::TooShort(body.len()));
        }
        Ok(body)
    }

    /// Attempt 2: Markdown-like text through the extraction proxy
    async fn fetch_markdown(&self, target: &str) -> Result<String, AttemptFailure> {
        let response = self.fetch_bounded(&self.config.endpoints.text_url(target)).await?;
        let body = response.text();
        if body.trim().is_empty() {
            return Err(AttemptFailure::Empty);
        }
        Ok(body)
    }
}
