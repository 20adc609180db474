//! Lumen demo daemon: a minimal service instrumented with correlation logging

pub mod config;
pub mod error;
pub mod http;

pub use config::{DaemonConfig, HttpConfig};
pub use error::{DaemonError, Result};
pub use http::HttpServer;
