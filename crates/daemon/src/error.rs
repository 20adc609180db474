use thiserror::Error;

/// Daemon error types
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] lumen_core::CoreError),

    #[error("HTTP setup error: {0}")]
    HttpSetup(#[from] lumen_http::HttpError),

    #[error("HTTP server error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DaemonError>;
