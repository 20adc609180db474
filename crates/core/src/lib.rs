//! Lumen core: correlation context and enriched logging

pub mod error;
pub mod logging;

pub use error::{CoreError, CoreResult};
pub use logging::{
    ConfigureOutcome, CorrelationId, CorrelationScope, LoggingConfig, configure,
    configure_from_env,
};
