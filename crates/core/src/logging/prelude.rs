//! Prelude for common logging functionality

pub use crate::logging::correlation::{
    self, ABSENT, CorrelationId, CorrelationScope, inherit, scope,
};
pub use crate::logging::init::{ConfigureOutcome, configure};

// Re-export common tracing macros and types
pub use tracing::{Instrument, debug, error, info, instrument, trace, warn};
