//! Correlation ID middleware for request tracing
//!
//! For every request the layer resolves a correlation ID (reusing a
//! non-empty inbound header, otherwise generating one), binds it to a fresh
//! task-local slot for the lifetime of the request, times the inner service
//! and stamps the ID and elapsed time onto the response. The slot is
//! released on every exit path: success, inner error, panic or
//! cancellation.

use std::any::Any;
use std::fmt;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::extract::ConnectInfo;
use futures::FutureExt;
use futures::future::BoxFuture;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response};
use lumen_core::logging::correlation::{self, CorrelationId, CorrelationScope};
use tower::{Layer, Service};

use crate::config::HttpTracingConfig;
use crate::error::Result;

#[derive(Debug)]
struct Settings {
    header_name: HeaderName,
    response_time_header: Option<HeaderName>,
}

/// Tower layer that applies [`CorrelationService`]
#[derive(Debug, Clone)]
pub struct CorrelationLayer {
    settings: Arc<Settings>,
}

impl CorrelationLayer {
    /// Layer using `X-Correlation-ID` and `X-Response-Time-ms`
    pub fn new() -> Self {
        Self {
            settings: Arc::new(Settings {
                header_name: HeaderName::from_static("x-correlation-id"),
                response_time_header: Some(HeaderName::from_static("x-response-time-ms")),
            }),
        }
    }

    /// Layer built from explicit settings
    ///
    /// # Errors
    ///
    /// Returns an error if either configured header name is invalid
    pub fn from_config(config: &HttpTracingConfig) -> Result<Self> {
        let response_time_header = if config.emit_response_time {
            Some(config.response_time()?)
        } else {
            None
        };
        Ok(Self {
            settings: Arc::new(Settings {
                header_name: config.header()?,
                response_time_header,
            }),
        })
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.settings.header_name
    }
}

impl Default for CorrelationLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for CorrelationLayer {
    type Service = CorrelationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationService {
            inner,
            settings: Arc::clone(&self.settings),
        }
    }
}

/// Service produced by [`CorrelationLayer`]
#[derive(Debug, Clone)]
pub struct CorrelationService<S> {
    inner: S,
    settings: Arc<Settings>,
}

/// Reuse a non-empty inbound correlation header or generate a new ID
///
/// Values that are not visible ASCII are treated like a missing header.
pub fn extract_correlation_id(headers: &HeaderMap, header_name: &HeaderName) -> CorrelationId {
    headers
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .and_then(CorrelationId::from_header)
        .unwrap_or_default()
}

fn client_addr<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

struct RequestInfo {
    id: CorrelationId,
    method: Method,
    path: String,
    client: String,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CorrelationService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        // The clone may not be ready; keep the instance poll_ready was called on.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let settings = Arc::clone(&self.settings);

        let id = extract_correlation_id(request.headers(), &settings.header_name);
        request.extensions_mut().insert(id.clone());
        let info = RequestInfo {
            id,
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            client: client_addr(&request),
        };

        Box::pin(correlation::scope(trace_request(inner, request, info, settings)))
    }
}

async fn trace_request<S, ReqBody, ResBody>(
    mut inner: S,
    request: Request<ReqBody>,
    info: RequestInfo,
    settings: Arc<Settings>,
) -> std::result::Result<Response<ResBody>, S::Error>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Error: fmt::Display,
{
    let RequestInfo {
        id,
        method,
        path,
        client,
    } = info;

    let bound = CorrelationScope::new(id.clone());
    tracing::info!(
        method = %method,
        path = %path,
        client = %client,
        "{method} {path} started (cid={id}, client={client})"
    );
    let start = Instant::now();

    let outcome = AssertUnwindSafe(inner.call(request)).catch_unwind().await;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let result = match outcome {
        Ok(Ok(response)) => {
            let status = response.status().as_u16();
            tracing::info!(
                method = %method,
                path = %path,
                status,
                elapsed_ms,
                "{method} {path} completed ({status}, {elapsed_ms:.2} ms, cid={id})"
            );
            Ok(response)
        }
        Ok(Err(err)) => {
            tracing::error!(
                method = %method,
                path = %path,
                elapsed_ms,
                error = %err,
                "Exception during {method} {path} (cid={id}): {err}"
            );
            Err(err)
        }
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            tracing::error!(
                method = %method,
                path = %path,
                elapsed_ms,
                error = reason,
                "Exception during {method} {path} (cid={id}): panic: {reason}"
            );
            drop(bound);
            std::panic::resume_unwind(panic);
        }
    };
    drop(bound);

    result.map(|mut response| {
        let headers = response.headers_mut();
        match HeaderValue::from_str(id.as_str()) {
            Ok(value) => {
                headers.insert(settings.header_name.clone(), value);
            }
            Err(e) => tracing::warn!("Failed to set correlation header: {}", e),
        }
        if let Some(name) = &settings.response_time_header {
            if let Ok(value) = HeaderValue::from_str(&format!("{elapsed_ms:.2}")) {
                headers.insert(name.clone(), value);
            }
        }
        response
    })
}

/// Extension trait for extracting correlation ID from request
pub trait CorrelationIdExt {
    /// Get the correlation ID from request extensions
    fn correlation_id(&self) -> Option<&CorrelationId>;
}

impl<B> CorrelationIdExt for Request<B> {
    fn correlation_id(&self) -> Option<&CorrelationId> {
        self.extensions().get::<CorrelationId>()
    }
}

impl CorrelationIdExt for http::request::Parts {
    fn correlation_id(&self) -> Option<&CorrelationId> {
        self.extensions.get::<CorrelationId>()
    }
}
