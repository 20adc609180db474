//! Logging configurator
//!
//! Builds the subscriber (filter plus one enriched route per destination)
//! and installs it process-wide at most once.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock, PoisonError};

use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

use crate::error::{CoreError, CoreResult};
use crate::logging::config::LoggingConfig;
use crate::logging::enrich::Enricher;
use crate::logging::file_rotation::SizeBasedAppender;
use crate::logging::format::{EnrichedFormat, FormatMode};

/// Third-party targets capped at `warn` when the configured level is more verbose
pub const NOISY_TARGETS: &[&str] = &[
    "hyper",
    "hyper_util",
    "h2",
    "tower",
    "tower_http",
    "reqwest",
    "rustls",
    "axum::rejection",
];

/// Result of a [`configure`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureOutcome {
    /// This call installed the process-wide subscriber
    Installed,
    /// An earlier call already did; nothing changed
    AlreadyConfigured,
}

/// Output route attached to the subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Console,
    File(PathBuf),
}

/// Description of the installed logging pipeline
#[derive(Debug, Clone)]
pub struct ActiveLogging {
    pub service_name: String,
    pub level: LevelFilter,
    pub format: FormatMode,
    pub routes: Vec<Route>,
}

static ACTIVE: OnceLock<ActiveLogging> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// The pipeline installed by [`configure`], if any
pub fn active() -> Option<&'static ActiveLogging> {
    ACTIVE.get()
}

/// Level filter with the noisy-target caps applied
///
/// # Errors
///
/// Returns an error if the configured level is unknown
pub fn build_filter(config: &LoggingConfig) -> CoreResult<EnvFilter> {
    let level = config.level_filter()?;
    let mut filter = EnvFilter::default().add_directive(level.into());
    if level > LevelFilter::WARN {
        for target in NOISY_TARGETS {
            let directive = Directive::from_str(&format!("{target}=warn"))
                .map_err(|e| CoreError::invalid_config(e.to_string()))?;
            filter = filter.add_directive(directive);
        }
    }
    Ok(filter)
}

/// Build the subscriber with console output on stderr
///
/// # Errors
///
/// Returns an error if the settings are invalid or the log directory cannot be created
pub fn build_subscriber(
    config: &LoggingConfig,
) -> CoreResult<(
    impl Subscriber + for<'a> LookupSpan<'a> + Send + Sync + 'static,
    ActiveLogging,
)> {
    build_subscriber_with_writer(config, std::io::stderr)
}

/// Build the subscriber, sending the console route to `console`
///
/// # Errors
///
/// Returns an error if the settings are invalid or the log directory cannot be created
pub fn build_subscriber_with_writer<W>(
    config: &LoggingConfig,
    console: W,
) -> CoreResult<(
    impl Subscriber + for<'a> LookupSpan<'a> + Send + Sync + 'static,
    ActiveLogging,
)>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    config.validate()?;
    let filter = build_filter(config)?;
    let enricher = Enricher::new(config.service_name.clone());
    let mut routes = Vec::new();

    let console_layer = config.to_console.then(|| {
        routes.push(Route::Console);
        tracing_subscriber::fmt::layer()
            .with_ansi(config.ansi && config.format == FormatMode::Text)
            .event_format(EnrichedFormat::new(enricher.clone(), config.format))
            .with_writer(console)
    });

    let file_layer = if config.to_file {
        let appender = SizeBasedAppender::new(
            &config.file_path,
            config.service_name.clone(),
            config.max_size_bytes(),
            config.backup_count,
        )
        .map_err(|e| CoreError::log_directory(&config.file_path, e))?;
        routes.push(Route::File(appender.path()));
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .event_format(EnrichedFormat::new(enricher, config.format))
                .with_writer(Mutex::new(appender)),
        )
    } else {
        None
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer);

    let active = ActiveLogging {
        service_name: config.service_name.clone(),
        level: config.level_filter()?,
        format: config.format,
        routes,
    };
    Ok((subscriber, active))
}

/// Install the logging pipeline for this process
///
/// Only the first successful call has any effect; later calls return
/// [`ConfigureOutcome::AlreadyConfigured`] without attaching further routes,
/// so repeated initialisation never duplicates log lines.
///
/// # Errors
///
/// Returns an error if the settings are invalid, the log directory cannot be
/// created, or another global subscriber is already installed
pub fn configure(config: &LoggingConfig) -> CoreResult<ConfigureOutcome> {
    let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if ACTIVE.get().is_some() {
        return Ok(ConfigureOutcome::AlreadyConfigured);
    }

    let (subscriber, active) = build_subscriber(config)?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| CoreError::subscriber_install(e.to_string()))?;
    let active = ACTIVE.get_or_init(|| active);

    tracing::info!(service = %active.service_name, "Lumen logging initialized");
    for route in &active.routes {
        if let Route::File(path) = route {
            tracing::debug!("Log file: {}", path.display());
        }
    }
    tracing::debug!("Log format: {:?}", active.format);

    Ok(ConfigureOutcome::Installed)
}

/// Configure from `LOG_*` environment variables
///
/// # Errors
///
/// Returns an error if the environment cannot be parsed or [`configure`] fails
pub fn configure_from_env() -> CoreResult<ConfigureOutcome> {
    configure(&LoggingConfig::from_env()?)
}
