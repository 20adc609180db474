//! Record enrichment
//!
//! Turns a raw `tracing` event into a [`LogRecord`] stamped with the
//! service identity, host, capture time and the correlation ID bound to the
//! emitting task. Every output route renders records produced here.

use std::fmt;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level};

use crate::logging::correlation::{self, ABSENT};

/// A single enriched log emission
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: String,
    #[serde(serialize_with = "serialize_level")]
    pub level: Level,
    pub service: Arc<str>,
    pub hostname: Arc<str>,
    pub module: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub message: String,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
}

fn serialize_level<S: serde::Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(level.as_str())
}

/// Static metadata stamped onto every record
#[derive(Debug, Clone)]
pub struct Enricher {
    service_name: Arc<str>,
    hostname: Arc<str>,
}

impl Enricher {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self::with_hostname(service_name, resolve_hostname())
    }

    pub fn with_hostname(service_name: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            service_name: Arc::from(service_name.into()),
            hostname: Arc::from(hostname.into()),
        }
    }

    /// Build the enriched record for `event`
    ///
    /// Never fails: anything that cannot be resolved degrades to [`ABSENT`].
    pub fn enrich(&self, event: &Event<'_>) -> LogRecord {
        let metadata = event.metadata();
        let mut visitor = FieldCollector::default();
        event.record(&mut visitor);

        LogRecord {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            level: *metadata.level(),
            service: Arc::clone(&self.service_name),
            hostname: Arc::clone(&self.hostname),
            module: metadata.target().to_string(),
            file: metadata.file().map(str::to_string),
            line: metadata.line(),
            message: visitor.message,
            correlation_id: correlation::get()
                .map_or_else(|| ABSENT.to_string(), |id| id.to_string()),
            fields: visitor.fields,
        }
    }
}

/// Best-effort host identity, resolved once per enricher
fn resolve_hostname() -> String {
    hostname_or_absent(&gethostname::gethostname().to_string_lossy())
}

fn hostname_or_absent(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        ABSENT.to_string()
    } else {
        name.to_string()
    }
}

/// Splits an event into its message and remaining structured fields
#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: Map<String, Value>,
}

impl FieldCollector {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{value:?}")));
    }
}
