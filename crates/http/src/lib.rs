//! Lumen HTTP request tracing
//!
//! Provides the correlation middleware that binds a per-request correlation
//! ID for the logging pipeline and echoes it back on responses.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

pub use config::{CORRELATION_ID_HEADER, HttpTracingConfig, RESPONSE_TIME_HEADER};
pub use error::{HttpError, Result};
pub use middleware::{CorrelationIdExt, CorrelationLayer};
