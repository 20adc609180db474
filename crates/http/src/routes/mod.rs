//! Route definitions

use axum::Router;
use axum::routing::get;

pub mod health;

/// Router with `/health` and `/ping`
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ping", get(health::ping))
}
