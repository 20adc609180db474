//! Correlation-aware logging for Lumen services
//!
//! A request binds its correlation ID into an execution-scoped slot; every
//! record emitted while it is bound is enriched with that ID plus service
//! and host identity before any output route renders it.

pub mod config;
pub mod correlation;
pub mod enrich;
pub mod file_rotation;
pub mod format;
pub mod init;
pub mod prelude;

// Re-export commonly used types
pub use config::LoggingConfig;
pub use correlation::{CorrelationId, CorrelationScope};
pub use enrich::{Enricher, LogRecord};
pub use format::{EnrichedFormat, FormatMode};
pub use init::{ConfigureOutcome, configure, configure_from_env};
