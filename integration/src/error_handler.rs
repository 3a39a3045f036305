/// Unified error handler for centralized error management

use linkshelf_core::errors::{CollectionError, LinkshelfError, SystemError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical error requiring immediate attention
    Critical,
    /// Error that affects functionality
    Error,
    /// Warning about potential issues
    Warning,
    /// Rejected user input
    Info,
}

/// Error entry for tracking
#[derive(Debug, Clone)]
pub struct ErrorEntry {
    pub error: String,
    pub severity: ErrorSeverity,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub context: String,
}

/// Unified error handler
pub struct UnifiedErrorHandler {
    /// Recent errors for reporting
    recent_errors: Arc<RwLock<Vec<ErrorEntry>>>,
    /// Maximum number of errors to keep
    max_errors: usize,
}

impl UnifiedErrorHandler {
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Create a handler keeping at most `max_errors` entries
    pub fn with_capacity(max_errors: usize) -> Self {
        Self {
            recent_errors: Arc::new(RwLock::new(Vec::new())),
            max_errors,
        }
    }

    /// Log an error at its severity and record it
    pub async fn handle_error(&self, error: &LinkshelfError, context: &str) {
        let severity = Self::classify_error(error);

        match severity {
            ErrorSeverity::Critical => error!("CRITICAL ERROR in {}: {}", context, error),
            ErrorSeverity::Error => error!("ERROR in {}: {}", context, error),
            ErrorSeverity::Warning => warn!("WARNING in {}: {}", context, error),
            ErrorSeverity::Info => info!("Rejected in {}: {}", context, error),
        }

        let entry = ErrorEntry {
            error: error.to_string(),
            severity,
            timestamp: chrono::Utc::now(),
            context: context.to_string(),
        };

        self.add_error_entry(entry).await;
    }

    /// Classify error severity
    pub fn classify_error(error: &LinkshelfError) -> ErrorSeverity {
        match error {
            LinkshelfError::Collection { source } => match source {
                CollectionError::Validation { .. } | CollectionError::Duplicate { .. } => {
                    ErrorSeverity::Info
                }
                CollectionError::NotFound { .. } => ErrorSeverity::Warning,
            },
            LinkshelfError::System { source } => match source {
                SystemError::Configuration { .. } => ErrorSeverity::Critical,
                SystemError::IO { .. } | SystemError::Serialization { .. } => ErrorSeverity::Error,
            },
        }
    }

    async fn add_error_entry(&self, entry: ErrorEntry) {
        let mut errors = self.recent_errors.write().await;
        errors.push(entry);

        if errors.len() > self.max_errors {
            let excess = errors.len() - self.max_errors;
            errors.drain(0..excess);
        }
    }

    /// Get recent errors
    pub async fn get_recent_errors(&self) -> Vec<ErrorEntry> {
        self.recent_errors.read().await.clone()
    }

    /// Get error statistics
    pub async fn get_error_stats(&self) -> ErrorStatistics {
        let errors = self.recent_errors.read().await;

        let mut stats = ErrorStatistics {
            total: errors.len(),
            ..ErrorStatistics::default()
        };

        for error in errors.iter() {
            match error.severity {
                ErrorSeverity::Critical => stats.critical += 1,
                ErrorSeverity::Error => stats.errors += 1,
                ErrorSeverity::Warning => stats.warnings += 1,
                ErrorSeverity::Info => stats.info += 1,
            }
        }

        stats
    }

    /// Clear error history
    pub async fn clear_errors(&self) {
        self.recent_errors.write().await.clear();
    }
}

impl Default for UnifiedErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Error statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorStatistics {
    pub total: usize,
    pub critical: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}
