//! HTTP server for the Lumen daemon

use crate::config::DaemonConfig;
use crate::{DaemonError, Result};

use axum::Router;
use lumen_http::{CorrelationLayer, routes};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

/// HTTP server serving the demo routes behind the correlation middleware
pub struct HttpServer {
    config: DaemonConfig,
    correlation: CorrelationLayer,
}

impl HttpServer {
    /// Create a new HTTP server
    ///
    /// # Errors
    ///
    /// Returns an error if the correlation header settings are invalid
    pub fn new(config: DaemonConfig) -> Result<Self> {
        let correlation = CorrelationLayer::from_config(&config.correlation)?;
        Ok(Self {
            config,
            correlation,
        })
    }

    /// Create the Axum application with routes
    ///
    /// The correlation layer wraps the timeout so timed-out requests still
    /// carry the correlation header.
    pub fn create_app(&self) -> Router {
        routes::router().layer(
            ServiceBuilder::new()
                .layer(self.correlation.clone())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    self.config.http.timeout_secs,
                ))),
        )
    }

    /// Serve until Ctrl+C
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound or the server fails
    pub async fn start(&self) -> Result<()> {
        let addr = self.config.http.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| DaemonError::Http(format!("Failed to bind to {addr}: {e}")))?;

        info!("HTTP server listening on {}", addr);

        axum::serve(
            listener,
            self.create_app()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Received shutdown signal");
        })
        .await
        .map_err(|e| DaemonError::Http(format!("HTTP server error: {e}")))?;

        Ok(())
    }
}
