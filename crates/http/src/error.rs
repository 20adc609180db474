//! HTTP error types

use thiserror::Error;

/// Errors raised while building the HTTP tracing layer
#[derive(Error, Debug)]
pub enum HttpError {
    /// Configured header name is not a valid HTTP header name
    #[error("Invalid header name '{0}'")]
    InvalidHeaderName(String),
}

/// Result type alias using HttpError
pub type Result<T> = std::result::Result<T, HttpError>;
