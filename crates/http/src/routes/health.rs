//! Health and ping handlers

use axum::response::Json;
use lumen_core::logging::correlation;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Ping response echoing the request's correlation ID
#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub msg: String,
    pub cid: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Ping endpoint; `cid` is whatever correlation ID the request is bound to
pub async fn ping() -> Json<PingResponse> {
    tracing::debug!("ping");
    Json(PingResponse {
        msg: "pong".to_string(),
        cid: correlation::get().map(|id| id.to_string()),
    })
}
