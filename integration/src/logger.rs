/// Process-wide tracing setup driven by `AppConfig`

use crate::AppConfig;
use linkshelf_core::errors::SystemError;
use std::io::IsTerminal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `metadata_resolver=debug,info`
    pub directive: String,

    /// Colorize output; off when stderr is not a terminal
    pub ansi: bool,
}

impl LoggerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            directive: config.log_level.clone(),
            ansi: std::io::stderr().is_terminal(),
        }
    }

    /// Parse the configured directive, ignoring the environment
    pub fn directive_filter(&self) -> Result<EnvFilter, SystemError> {
        EnvFilter::try_new(&self.directive).map_err(|e| SystemError::Configuration {
            details: format!("invalid log level {:?}: {}", self.directive, e),
        })
    }

    /// `RUST_LOG` when set, else the configured directive
    pub fn filter(&self) -> Result<EnvFilter, SystemError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => self.directive_filter(),
        }
    }
}

/// Unified logger
pub struct UnifiedLogger;

impl UnifiedLogger {
    /// Install the global subscriber writing to stderr
    ///
    /// Fails when the directive does not parse or a subscriber is already set.
    pub fn init(config: &LoggerConfig) -> Result<(), SystemError> {
        let filter = config.filter()?;

        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(config.ansi);

        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .try_init()
            .map_err(|e| SystemError::Configuration {
                details: format!("logger already installed: {}", e),
            })?;

        tracing::info!(directive = %config.directive, "logging initialized");
        Ok(())
    }
}
