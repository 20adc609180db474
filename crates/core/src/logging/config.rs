//! Logging configuration
//!
//! Settings are read from `LOG_*` environment variables:
//! - `LOG_LEVEL`: minimum severity (`trace`, `debug`, `info`, `warn`, `error`;
//!   case-insensitive, `warning`, `critical` and `fatal` are also accepted)
//! - `LOG_FORMAT`: `text` or `json`
//! - `LOG_TO_CONSOLE`, `LOG_TO_FILE`: enable output routes
//! - `LOG_FILE_PATH`: directory for `<service>.log`
//! - `LOG_MAX_SIZE_MB`, `LOG_BACKUP_COUNT`: rotation limits
//! - `LOG_SERVICE_NAME`: service identity stamped on every record
//! - `LOG_ANSI`: colour the console level token

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::error::{CoreError, CoreResult};
use crate::logging::format::FormatMode;

/// Process-wide logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum severity
    pub level: String,
    /// Rendering for every route
    pub format: FormatMode,
    /// Write records to stderr
    pub to_console: bool,
    /// Write records to a rotating file
    pub to_file: bool,
    /// Directory that holds the log files
    pub file_path: PathBuf,
    /// Rotate once the live file would exceed this many megabytes
    pub max_size_mb: u64,
    /// Rotated files to keep
    pub backup_count: usize,
    /// Service identity, also the log file name
    pub service_name: String,
    /// Colour the console level token
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: FormatMode::Text,
            to_console: true,
            to_file: true,
            file_path: PathBuf::from("./logs"),
            max_size_mb: 10,
            backup_count: 5,
            service_name: "lumen_service".to_string(),
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a `LOG_*` variable cannot be parsed
    pub fn from_env() -> CoreResult<Self> {
        Self::from_env_source(None)
    }

    /// Load configuration from an explicit variable map instead of the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a `LOG_*` variable cannot be parsed
    pub fn from_env_source(source: Option<HashMap<String, String>>) -> CoreResult<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("LOG")
                    .try_parsing(true)
                    .source(source),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings for values that cannot be applied
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown level or an empty service name
    pub fn validate(&self) -> CoreResult<()> {
        self.level_filter()?;
        if self.service_name.trim().is_empty() {
            return Err(CoreError::invalid_config("service_name must not be empty"));
        }
        Ok(())
    }

    /// Parsed minimum severity
    ///
    /// # Errors
    ///
    /// Returns an error if `level` is not a known severity
    pub fn level_filter(&self) -> CoreResult<LevelFilter> {
        let level = self.level.trim().to_ascii_lowercase();
        let level = match level.as_str() {
            "warning" => "warn",
            "critical" | "fatal" => "error",
            other => other,
        };
        LevelFilter::from_str(level)
            .map_err(|_| CoreError::invalid_config(format!("unknown log level '{}'", self.level)))
    }

    /// Rotation threshold in bytes
    pub const fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }

    /// Full path of the live log file
    pub fn log_file(&self) -> PathBuf {
        self.file_path.join(format!("{}.log", self.service_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, FormatMode::Text);
        assert!(config.to_console);
        assert!(config.to_file);
        assert_eq!(config.max_size_bytes(), 10 * 1024 * 1024);
        assert_eq!(config.backup_count, 5);
        assert_eq!(config.log_file(), PathBuf::from("./logs/lumen_service.log"));
    }

    #[test]
    fn test_from_empty_env_uses_defaults() {
        let config = LoggingConfig::from_env_source(env(&[])).unwrap();
        assert_eq!(config.service_name, "lumen_service");
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_from_env_overrides() {
        let config = LoggingConfig::from_env_source(env(&[
            ("LOG_LEVEL", "DEBUG"),
            ("LOG_FORMAT", "json"),
            ("LOG_TO_FILE", "false"),
            ("LOG_FILE_PATH", "/var/log/lumen"),
            ("LOG_MAX_SIZE_MB", "3"),
            ("LOG_BACKUP_COUNT", "2"),
            ("LOG_SERVICE_NAME", "auth"),
        ]))
        .unwrap();

        assert_eq!(config.level_filter().unwrap(), LevelFilter::DEBUG);
        assert_eq!(config.format, FormatMode::Json);
        assert!(!config.to_file);
        assert_eq!(config.file_path, PathBuf::from("/var/log/lumen"));
        assert_eq!(config.max_size_bytes(), 3 * 1024 * 1024);
        assert_eq!(config.backup_count, 2);
        assert_eq!(config.log_file(), PathBuf::from("/var/log/lumen/auth.log"));
    }

    #[test]
    fn test_invalid_level_rejected() {
        let result = LoggingConfig::from_env_source(env(&[("LOG_LEVEL", "loud")]));
        assert!(matches!(result, Err(CoreError::InvalidConfig { .. })));
    }

    #[test]
    fn test_empty_service_name_rejected() {
        let config = LoggingConfig {
            service_name: "  ".to_string(),
            ..LoggingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_long_level_names_accepted() {
        for (name, expected) in [
            ("WARNING", LevelFilter::WARN),
            ("warning", LevelFilter::WARN),
            ("CRITICAL", LevelFilter::ERROR),
            ("fatal", LevelFilter::ERROR),
            ("Error", LevelFilter::ERROR),
        ] {
            let config = LoggingConfig::from_env_source(env(&[("LOG_LEVEL", name)])).unwrap();
            assert_eq!(config.level_filter().unwrap(), expected, "{name}");
        }
    }
}
