//! Integration tests for correlation ID propagation through the middleware

use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::routing::get;
use futures::FutureExt;
use http::{Request, Response, StatusCode};
use lumen_core::logging::correlation;
use lumen_http::routes::health::PingResponse;
use lumen_http::{CorrelationIdExt, CorrelationLayer, HttpTracingConfig, routes};
use tower::{Layer, ServiceExt, service_fn};

fn create_test_app() -> Router {
    routes::router()
        .route(
            "/context",
            get(|| async { correlation::get().map(|id| id.to_string()).unwrap_or_default() }),
        )
        .route(
            "/fail",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "handler failed") }),
        )
        .layer(CorrelationLayer::new())
}

fn ping_request(cid: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/ping");
    if let Some(cid) = cid {
        builder = builder.header("X-Correlation-ID", cid);
    }
    builder.body(Body::empty()).unwrap()
}

fn header(response: &Response<Body>, name: &str) -> String {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("{name} header should be present"))
        .to_str()
        .unwrap()
        .to_string()
}

fn is_decimal(value: &str) -> bool {
    let mut parts = value.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let frac = parts.next();
    !whole.is_empty()
        && whole.chars().all(|c| c.is_ascii_digit())
        && frac.is_none_or(|f| !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()))
}

async fn body_json(response: Response<Body>) -> PingResponse {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_generates_correlation_id_when_absent() {
    let app = create_test_app();

    let first = app.clone().oneshot(ping_request(None)).await.unwrap();
    let second = app.oneshot(ping_request(None)).await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    let first_id = header(&first, "X-Correlation-ID");
    let second_id = header(&second, "X-Correlation-ID");
    assert!(!first_id.is_empty());
    assert_ne!(first_id, second_id);

    // Handler observed the same ID through the bound context
    let body = body_json(first).await;
    assert_eq!(body.msg, "pong");
    assert_eq!(body.cid.as_deref(), Some(first_id.as_str()));
}

#[tokio::test]
async fn test_reuses_inbound_header() {
    let response = create_test_app()
        .oneshot(ping_request(Some("test-cid-1234")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "X-Correlation-ID"), "test-cid-1234");
    let elapsed = header(&response, "X-Response-Time-ms");
    assert!(is_decimal(&elapsed), "unexpected response time {elapsed}");
}

#[tokio::test]
async fn test_empty_inbound_header_is_treated_as_absent() {
    let response = create_test_app()
        .oneshot(ping_request(Some("")))
        .await
        .unwrap();

    let id = header(&response, "X-Correlation-ID");
    assert!(!id.is_empty());
}

#[tokio::test]
async fn test_handler_sees_bound_context() {
    let response = create_test_app()
        .oneshot(
            Request::builder()
                .uri("/context")
                .header("x-correlation-id", "ctx-99")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ctx-99");
}

#[tokio::test]
async fn test_headers_present_on_error_status() {
    let response = create_test_app()
        .oneshot(
            Request::builder()
                .uri("/fail")
                .header("x-correlation-id", "cid-500")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header(&response, "X-Correlation-ID"), "cid-500");
    assert!(is_decimal(&header(&response, "X-Response-Time-ms")));
}

#[tokio::test]
async fn test_caller_context_restored_after_request() {
    correlation::scope(async {
        correlation::set(Some("outer".into()));

        let app = create_test_app();
        let response = app
            .clone()
            .oneshot(ping_request(Some("leak-check")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.cid.as_deref(), Some("leak-check"));
        assert_eq!(correlation::get().unwrap().as_str(), "outer");

        // A request without a header must not inherit the caller's ID either
        let response = app.oneshot(ping_request(None)).await.unwrap();
        let generated = header(&response, "X-Correlation-ID");
        assert_ne!(generated, "outer");
        assert_ne!(generated, "leak-check");
        assert_eq!(body_json(response).await.cid.as_deref(), Some(generated.as_str()));
        assert_eq!(correlation::get().unwrap().as_str(), "outer");
    })
    .await;
}

#[tokio::test]
async fn test_custom_header_and_no_response_time() {
    let config = HttpTracingConfig {
        header_name: "X-Request-ID".to_string(),
        emit_response_time: false,
        ..HttpTracingConfig::default()
    };
    let app = routes::router::<()>().layer(CorrelationLayer::from_config(&config).unwrap());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ping")
                .header("X-Request-ID", "custom-1")
                .header("X-Correlation-ID", "ignored")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(header(&response, "X-Request-ID"), "custom-1");
    assert!(response.headers().get("X-Correlation-ID").is_none());
    assert!(response.headers().get("X-Response-Time-ms").is_none());
}

#[tokio::test]
async fn test_inner_error_propagates_unchanged() {
    let service = CorrelationLayer::new().layer(service_fn(|request: Request<Body>| async move {
        assert!(request.correlation_id().is_some());
        assert_eq!(
            correlation::get().map(|id| id.to_string()),
            request.correlation_id().map(ToString::to_string)
        );
        Err::<Response<Body>, _>("downstream exploded".to_string())
    }));

    correlation::scope(async move {
        correlation::set(Some("outer".into()));
        let result = service.oneshot(ping_request(Some("err-cid"))).await;
        assert_eq!(result.unwrap_err(), "downstream exploded");
        assert_eq!(correlation::get().unwrap().as_str(), "outer");
    })
    .await;
}

#[tokio::test]
async fn test_panic_propagates_and_context_is_released() {
    let service = CorrelationLayer::new().layer(service_fn(|_request: Request<Body>| async move {
        if correlation::get().is_some() {
            panic!("handler fault");
        }
        Ok::<_, Infallible>(Response::new(Body::empty()))
    }));

    let join = tokio::spawn(service.oneshot(ping_request(Some("panic-cid"))))
        .await
        .unwrap_err();
    assert!(join.is_panic());
    let payload = join.into_panic();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"handler fault"));

    let fresh = tokio::spawn(async { correlation::get() }).await.unwrap();
    assert!(fresh.is_none());
}

#[tokio::test]
async fn test_panic_restores_caller_context() {
    let service = CorrelationLayer::new().layer(service_fn(|_request: Request<Body>| async move {
        if correlation::get().is_some_and(|id| id.as_str() == "panic-cid") {
            panic!("handler fault");
        }
        Ok::<_, Infallible>(Response::new(Body::empty()))
    }));

    let after = correlation::scope(async move {
        correlation::set(Some("outer".into()));
        let outcome = AssertUnwindSafe(service.oneshot(ping_request(Some("panic-cid"))))
            .catch_unwind()
            .await;
        assert!(outcome.is_err());
        correlation::get()
    })
    .await;
    assert_eq!(after.unwrap().as_str(), "outer");
}

#[tokio::test]
async fn test_cancelled_request_releases_context() {
    let service = CorrelationLayer::new().layer(service_fn(|_request: Request<Body>| async move {
        assert_eq!(correlation::get().unwrap().as_str(), "slow-cid");
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok::<_, Infallible>(Response::new(Body::empty()))
    }));

    correlation::scope(async move {
        correlation::set(Some("outer".into()));

        let mut pending = Box::pin(service.oneshot(ping_request(Some("slow-cid"))));
        // Poll until the handler is parked inside its sleep, then drop it
        let polled = futures::poll!(pending.as_mut());
        assert!(polled.is_pending());
        drop(pending);

        assert_eq!(correlation::get().unwrap().as_str(), "outer");
    })
    .await;

    let next = correlation::scope(async { correlation::get() }).await;
    assert!(next.is_none());
}
