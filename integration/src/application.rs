/// Main application module
///
/// Provides high-level Application API

use crate::{AppConfig, AppContext, LoggerConfig, UnifiedLogger};
use linkshelf_core::errors::{Result, SystemError};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Main application
pub struct Application {
    /// Application context
    context: Arc<AppContext>,
}

impl Application {
    /// Initialize logging and create the application context
    pub async fn new(config: AppConfig) -> Result<Self> {
        // a host process may already own the global subscriber
        if let Err(e) = UnifiedLogger::init(&LoggerConfig::from_app_config(&config)) {
            tracing::debug!("logger not installed: {}", e);
        }

        info!("Starting Linkshelf");
        let context = Arc::new(AppContext::new(config).await?);
        info!(
            bookmarks = context.store.len().await,
            "Application initialized successfully"
        );

        Ok(Self { context })
    }

    /// Create an application from a JSON config file
    pub async fn from_config_file(path: &Path) -> Result<Self> {
        let config = AppConfig::load(path).map_err(|e| SystemError::Configuration {
            details: format!("{:#}", e),
        })?;
        Self::new(config).await
    }

    /// Save the collection and stop
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down application");
        self.context.preview_slot.cancel().await;
        self.context.save().await?;
        info!("Application shutdown complete");
        Ok(())
    }

    /// Get application context
    pub fn context(&self) -> &Arc<AppContext> {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_application_lifecycle() {
        let app = Application::new(AppConfig::default()).await.unwrap();
        assert!(app.context().store.is_empty().await);
        assert!(app.shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let result = Application::from_config_file(Path::new("/nonexistent/linkshelf.json")).await;
        assert!(matches!(
            result,
            Err(linkshelf_core::LinkshelfError::System {
                source: SystemError::Configuration { .. }
            })
        ));
    }
}
