//! Line formats shared by every output route

use std::fmt;

use nu_ansi_term::{Color, Style};
use serde::{Deserialize, Serialize};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

use crate::logging::enrich::{Enricher, LogRecord};

/// How records are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatMode {
    /// Human-readable single line
    #[default]
    #[serde(alias = "human")]
    Text,
    /// One JSON object per line
    #[serde(alias = "structured")]
    Json,
}

/// Event formatter that enriches and renders each record
///
/// Console and file routes each get their own instance built from the same
/// [`Enricher`], so both observe identical fields. In text mode the level
/// token is coloured whenever the fmt layer was built `.with_ansi(true)`.
#[derive(Debug, Clone)]
pub struct EnrichedFormat {
    enricher: Enricher,
    mode: FormatMode,
}

impl EnrichedFormat {
    pub const fn new(enricher: Enricher, mode: FormatMode) -> Self {
        Self { enricher, mode }
    }
}

impl<S, N> FormatEvent<S, N> for EnrichedFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let record = self.enricher.enrich(event);
        match self.mode {
            FormatMode::Text => {
                let ansi = writer.has_ansi_escapes();
                write_text(&mut writer, &record, ansi)
            }
            FormatMode::Json => {
                let line = serde_json::to_string(&record).map_err(|_| fmt::Error)?;
                writeln!(writer, "{line}")
            }
        }
    }
}

fn level_style(level: Level) -> Style {
    match level {
        Level::TRACE => Color::Purple.normal(),
        Level::DEBUG => Color::Blue.normal(),
        Level::INFO => Color::Green.normal(),
        Level::WARN => Color::Yellow.normal(),
        Level::ERROR => Color::Red.bold(),
    }
}

fn write_text(writer: &mut Writer<'_>, record: &LogRecord, ansi: bool) -> fmt::Result {
    write!(writer, "[{}] [{}] ", record.timestamp, record.service)?;
    if ansi {
        write!(writer, "[{}] ", level_style(record.level).paint(record.level.as_str()))?;
    } else {
        write!(writer, "[{}] ", record.level)?;
    }
    write!(writer, "{}", record.module)?;
    if let Some(line) = record.line {
        write!(writer, ":{line}")?;
    }
    write!(writer, " - {}", record.message)?;
    for (key, value) in &record.fields {
        match value {
            serde_json::Value::String(s) => write!(writer, " {key}={s}")?,
            other => write!(writer, " {key}={other}")?,
        }
    }
    writeln!(writer, " (correlation_id={})", record.correlation_id)
}
