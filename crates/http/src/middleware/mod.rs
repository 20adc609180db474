//! Middleware components for HTTP request processing

pub mod correlation;

pub use correlation::{
    CorrelationIdExt, CorrelationLayer, CorrelationService, extract_correlation_id,
};
