/// Integration module for linkshelf
///
/// Wires the collection store, the metadata pipeline and the ambient
/// services (configuration, logging, error tracking) into one context.

use anyhow::Context as _;
use collection_manager::{
    export_batch, import_batch, read_snapshot_file, write_snapshot_file, BookmarkStore,
    ImportSummary,
};
use linkshelf_core::errors::{Result, SystemError};
use linkshelf_core::{BookmarkId, BookmarkRecord, CheckStatus, LinkshelfError, MetadataResult};
use metadata_resolver::{
    ContentFetcher, MetadataPipeline, PipelineConfig, ProxyEndpoints, ReqwestFetcher,
    ReqwestFetcherConfig, ResolutionSlot,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub mod application;
pub mod error_handler;
pub mod logger;

pub use application::Application;
pub use error_handler::{ErrorSeverity, ErrorStatistics, UnifiedErrorHandler};
pub use logger::{LoggerConfig, UnifiedLogger};

/// Application configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Snapshot file; `None` keeps the collection in memory only
    pub snapshot_path: Option<PathBuf>,

    /// Log level
    pub log_level: String,

    /// Rendering proxy prefix for the HTML attempt
    pub render_proxy: String,

    /// Text-extraction proxy prefix for the Markdown attempt
    pub text_proxy: String,

    /// Upper bound for each fetch attempt in seconds
    pub attempt_timeout_secs: u64,

    /// HTML bodies shorter than this fall back to the text proxy
    pub min_html_bytes: usize,

    /// Image shown for bookmarks without a resolved image
    pub placeholder_image: String,

    /// User agent sent with every fetch
    pub user_agent: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            snapshot_path: None,
            log_level: "info".to_string(),
            render_proxy: pipeline.endpoints.render_proxy,
            text_proxy: pipeline.endpoints.text_proxy,
            attempt_timeout_secs: pipeline.attempt_timeout.as_secs(),
            min_html_bytes: pipeline.min_html_bytes,
            placeholder_image: "/assets/placeholder.svg".to_string(),
            user_agent: ReqwestFetcherConfig::default().user_agent,
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file; absent fields keep their defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.check()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn check(&self) -> std::result::Result<(), SystemError> {
        LoggerConfig::from_app_config(self).directive_filter()?;
        if self.attempt_timeout_secs == 0 {
            return Err(SystemError::Configuration {
                details: "attempt_timeout_secs must be greater than zero".to_string(),
            });
        }
        for (name, value) in [("render_proxy", &self.render_proxy), ("text_proxy", &self.text_proxy)] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(SystemError::Configuration {
                    details: format!("{} must be an http(s) URL prefix: {}", name, value),
                });
            }
        }
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            endpoints: ProxyEndpoints {
                render_proxy: self.render_proxy.clone(),
                text_proxy: self.text_proxy.clone(),
            },
            attempt_timeout: Duration::from_secs(self.attempt_timeout_secs),
            min_html_bytes: self.min_html_bytes,
        }
    }

    pub fn fetcher_config(&self) -> ReqwestFetcherConfig {
        ReqwestFetcherConfig {
            user_agent: self.user_agent.clone(),
            ..ReqwestFetcherConfig::default()
        }
    }
}

/// Result of importing a JSON payload into the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportResult {
    pub summary: ImportSummary,
    /// Elements of the payload that were not usable records
    pub dropped: usize,
}

/// Application context that holds all initialized components
pub struct AppContext {
    /// Bookmark collection
    pub store: BookmarkStore,

    /// Metadata resolution pipeline
    pub pipeline: Arc<MetadataPipeline>,

    /// Superseding slot for interactive previews
    pub preview_slot: ResolutionSlot,

    /// Transport shared by the pipeline and link checks
    fetcher: Arc<dyn ContentFetcher>,

    /// Unified error handler
    pub error_handler: Arc<UnifiedErrorHandler>,

    /// Application configuration
    pub config: Arc<AppConfig>,
}

impl AppContext {
    /// Create a context fetching over HTTP
    pub async fn new(config: AppConfig) -> Result<Self> {
        let fetcher: Arc<dyn ContentFetcher> =
            Arc::new(ReqwestFetcher::with_config(config.fetcher_config()));
        Self::with_fetcher(config, fetcher).await
    }

    /// Create a context with a caller-supplied fetch transport
    pub async fn with_fetcher(config: AppConfig, fetcher: Arc<dyn ContentFetcher>) -> Result<Self> {
        info!("Initializing application context");
        config.check()?;

        let store = match &config.snapshot_path {
            Some(path) => {
                let report = read_snapshot_file(path).await?;
                info!(path = %path.display(), count = report.records.len(), "snapshot loaded");
                BookmarkStore::from_records(report.records)
            }
            None => BookmarkStore::new(),
        };

        let pipeline = Arc::new(MetadataPipeline::with_config(
            Arc::clone(&fetcher),
            config.pipeline_config(),
        ));
        let preview_slot = ResolutionSlot::new(Arc::clone(&pipeline));

        Ok(Self {
            store,
            pipeline,
            preview_slot,
            fetcher,
            error_handler: Arc::new(UnifiedErrorHandler::new()),
            config: Arc::new(config),
        })
    }

    /// Validate, resolve metadata for and save a new bookmark
    ///
    /// `tags` is a free-form string split on commas and whitespace.
    pub async fn add_bookmark(&self, raw_url: &str, tags: &str) -> Result<BookmarkRecord> {
        let result = self.try_add_bookmark(raw_url, tags).await;
        if let Err(e) = &result {
            self.error_handler.handle_error(e, "add_bookmark").await;
        }
        result
    }

    async fn try_add_bookmark(&self, raw_url: &str, tags: &str) -> Result<BookmarkRecord> {
        let url = self.store.prepare_add(raw_url).await?;
        let metadata = self.pipeline.resolve(&url).await;
        let tags = collection_manager::parse_tags(tags);
        self.store.add(&url, &tags, &metadata).await
    }

    /// Resolve metadata for the add form, superseding any earlier preview
    ///
    /// `None` when a later preview request replaced this one.
    pub async fn preview(&self, raw_url: &str) -> Option<MetadataResult> {
        self.preview_slot.submit(raw_url).await.wait().await
    }

    pub async fn record_open(&self, id: &BookmarkId) -> Result<BookmarkRecord> {
        self.store.record_open(id).await
    }

    /// Fetch the bookmark's URL directly and store whether it answered
    pub async fn check_link(&self, id: &BookmarkId) -> Result<BookmarkRecord> {
        let record = self
            .store
            .get(id)
            .await
            .ok_or_else(|| linkshelf_core::CollectionError::NotFound { id: id.clone() })?;

        let timeout = Duration::from_secs(self.config.attempt_timeout_secs);
        let status = match tokio::time::timeout(timeout, self.fetcher.fetch(&record.url)).await {
            Ok(response) if response.is_success() => CheckStatus::Ok,
            Ok(response) => {
                warn!(url = %record.url, status = response.status, "link check failed");
                CheckStatus::Broken
            }
            Err(_) => {
                warn!(url = %record.url, "link check timed out");
                CheckStatus::Broken
            }
        };
        self.store.record_check(id, status).await
    }

    /// Merge duplicate bookmarks, returning how many records were removed
    pub async fn merge_duplicates(&self) -> usize {
        self.store.merge_in_place().await
    }

    /// Import records from JSON text (an array or `{ "bookmarks": [...] }`)
    pub async fn import_json(&self, json: &str) -> Result<ImportResult> {
        let value: serde_json::Value = match serde_json::from_str(json) {
            Ok(value) => value,
            Err(e) => {
                let error = LinkshelfError::from(e);
                self.error_handler.handle_error(&error, "import_json").await;
                return Err(error);
            }
        };
        let report = import_batch(&value);
        let summary = self.store.import(report.records).await;
        Ok(ImportResult {
            summary,
            dropped: report.dropped,
        })
    }

    /// Export the collection as pretty-printed JSON
    pub async fn export_json(&self) -> Result<String> {
        let value = export_batch(&self.store.snapshot().await);
        Ok(serde_json::to_string_pretty(&value).map_err(SystemError::from)?)
    }

    /// Image to display for a record
    pub fn display_image<'a>(&'a self, record: &'a BookmarkRecord) -> &'a str {
        record.display_image(&self.config.placeholder_image)
    }

    /// Write the collection to the snapshot file, if one is configured
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.config.snapshot_path else {
            return Ok(());
        };
        let result = write_snapshot_file(path, &self.store.snapshot().await).await;
        if let Err(e) = &result {
            self.error_handler.handle_error(e, "save").await;
        }
        result
    }

    /// Get application statistics
    pub async fn get_stats(&self) -> AppStatistics {
        let records = self.store.snapshot().await;
        AppStatistics {
            total_bookmarks: records.len(),
            favorites: records.iter().filter(|r| r.favorite).count(),
            archived: records.iter().filter(|r| r.archived).count(),
            broken_links: records
                .iter()
                .filter(|r| r.check_status == CheckStatus::Broken)
                .count(),
            duplicate_groups: self.store.duplicate_groups().await.len(),
        }
    }
}

/// Application statistics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AppStatistics {
    pub total_bookmarks: usize,
    pub favorites: usize,
    pub archived: usize,
    pub broken_links: usize,
    pub duplicate_groups: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.render_proxy, "https://api.allorigins.win/raw?url=");
        assert_eq!(config.text_proxy, "https://r.jina.ai/");
        assert_eq!(config.attempt_timeout_secs, 12);
        assert_eq!(config.min_html_bytes, 500);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_config_partial_json() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "log_level": "debug", "min_html_bytes": 800 }"#).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.min_html_bytes, 800);
        assert_eq!(config.attempt_timeout_secs, 12);
        assert_eq!(config.pipeline_config().min_html_bytes, 800);
    }

    #[test]
    fn test_config_check() {
        let config = AppConfig {
            attempt_timeout_secs: 0,
            ..AppConfig::default()
        };
        assert!(config.check().is_err());

        let config = AppConfig {
            text_proxy: "ftp://proxy/".to_string(),
            ..AppConfig::default()
        };
        assert!(config.check().is_err());

        let config = AppConfig {
            log_level: "linkshelf=loud".to_string(),
            ..AppConfig::default()
        };
        assert!(config.check().is_err());
    }

    #[tokio::test]
    async fn test_app_context_creation() {
        let context = AppContext::new(AppConfig::default()).await.unwrap();
        assert!(context.store.is_empty().await);
        assert_eq!(context.get_stats().await.total_bookmarks, 0);
    }
}
