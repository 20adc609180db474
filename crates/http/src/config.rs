//! Request tracing configuration

use http::HeaderName;
use serde::{Deserialize, Serialize};

use crate::error::{HttpError, Result};

/// Default inbound/outbound correlation header
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";
/// Default elapsed-time response header
pub const RESPONSE_TIME_HEADER: &str = "X-Response-Time-ms";

/// Settings for the correlation middleware
///
/// Deserialised as the `correlation` section of the daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpTracingConfig {
    /// Header carrying the correlation ID in both directions
    pub header_name: String,
    /// Attach the elapsed-time header to responses
    pub emit_response_time: bool,
    /// Header carrying elapsed milliseconds
    pub response_time_header: String,
}

impl Default for HttpTracingConfig {
    fn default() -> Self {
        Self {
            header_name: CORRELATION_ID_HEADER.to_string(),
            emit_response_time: true,
            response_time_header: RESPONSE_TIME_HEADER.to_string(),
        }
    }
}

impl HttpTracingConfig {
    pub(crate) fn header(&self) -> Result<HeaderName> {
        parse_header(&self.header_name)
    }

    pub(crate) fn response_time(&self) -> Result<HeaderName> {
        parse_header(&self.response_time_header)
    }
}

fn parse_header(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| HttpError::InvalidHeaderName(name.to_string()))
}
