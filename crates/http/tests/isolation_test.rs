//! Concurrent requests never see each other's correlation ID in their logs
//!
//! All requests run as tasks on one current-thread runtime so they interleave
//! on a single worker, the case a thread-local slot would get wrong.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::HeaderMap;
use axum::routing::get;
use http::Request;
use lumen_core::LoggingConfig;
use lumen_core::logging::FormatMode;
use lumen_core::logging::init::build_subscriber_with_writer;
use lumen_http::CorrelationLayer;
use serde_json::Value;
use tower::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct Buffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Buffer {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

async fn work(headers: HeaderMap) -> String {
    let expected = headers
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    for step in 0..3_u64 {
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(step)).await;
        tracing::info!(expected = %expected, step, "working");
    }
    expected
}

#[tokio::test]
async fn test_concurrent_requests_keep_their_own_ids() {
    let buffer = Buffer::default();
    let config = LoggingConfig {
        level: "info".to_string(),
        format: FormatMode::Json,
        to_file: false,
        ..LoggingConfig::default()
    };
    let (subscriber, _) = build_subscriber_with_writer(&config, buffer.clone()).unwrap();
    let _default = tracing::subscriber::set_default(subscriber);

    let app = Router::new()
        .route("/work", get(work))
        .layer(CorrelationLayer::new());

    let handles: Vec<_> = (0..24)
        .map(|i| {
            let request = Request::builder()
                .uri("/work")
                .header("x-correlation-id", format!("req-{i}"))
                .body(Body::empty())
                .unwrap();
            tokio::spawn(app.clone().oneshot(request))
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let response = handle.await.unwrap().unwrap();
        assert_eq!(response.headers()["x-correlation-id"], format!("req-{i}").as_str());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, format!("req-{i}").as_bytes());
    }

    let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    let mut per_request: HashMap<String, usize> = HashMap::new();
    let mut completed: HashMap<String, usize> = HashMap::new();
    for line in output.lines() {
        let record: Value = serde_json::from_str(line).unwrap();
        let cid = record["correlation_id"].as_str().unwrap().to_string();
        let message = record["message"].as_str().unwrap();

        if let Some(expected) = record["fields"]["expected"].as_str() {
            assert_eq!(cid, expected, "line attributed to the wrong request: {line}");
            *per_request.entry(cid).or_default() += 1;
        } else if message.contains("started") || message.contains("completed") {
            assert!(
                message.contains(&format!("cid={cid}")),
                "lifecycle line carries a foreign id: {line}"
            );
            assert_eq!(record["fields"]["method"], "GET");
            assert_eq!(record["fields"]["path"], "/work");
            if message.contains("completed") {
                assert_eq!(record["fields"]["status"], 200);
                assert!(record["fields"]["elapsed_ms"].is_f64());
                *completed.entry(cid).or_default() += 1;
            } else {
                assert_eq!(record["fields"]["client"], "unknown");
            }
        }
    }

    assert_eq!(per_request.len(), 24);
    assert!(per_request.values().all(|&count| count == 3));
    assert_eq!(completed.len(), 24);
    assert!(completed.values().all(|&count| count == 1));
}
