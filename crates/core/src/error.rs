//! Error types shared across Lumen crates

use std::path::PathBuf;

/// Standard result type for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors surfaced while configuring logging
///
/// Emission itself never fails; only startup does.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Cannot prepare log directory {}: {source}", path.display())]
    LogDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install log subscriber: {message}")]
    SubscriberInstall { message: String },

    #[error("Configuration source error: {0}")]
    Source(#[from] config::ConfigError),
}

impl CoreError {
    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a log directory error
    pub fn log_directory(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LogDirectory {
            path: path.into(),
            source,
        }
    }

    /// Create a subscriber installation error
    pub fn subscriber_install(message: impl Into<String>) -> Self {
        Self::SubscriberInstall {
            message: message.into(),
        }
    }
}
