use anyhow::Result;
use clap::Parser;
use lumen_core::{ConfigureOutcome, LoggingConfig};
use lumen_daemon::{DaemonConfig, HttpServer};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

/// Lumen daemon - correlation-aware demo service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Override the bind address
    #[arg(short = 'b', long = "bind")]
    bind: Option<SocketAddr>,

    /// Log to the console only, ignoring LOG_TO_FILE
    #[arg(long)]
    no_file_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let mut logging = LoggingConfig::from_env()?;
    if cli.no_file_log {
        logging.to_file = false;
    }
    if lumen_core::configure(&logging)? == ConfigureOutcome::AlreadyConfigured {
        tracing::debug!("Logging was already configured");
    }

    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            DaemonConfig::from_file(path)?
        }
        None => DaemonConfig::from_env()?,
    };
    if let Some(bind) = cli.bind {
        config.http.bind_addr = bind;
    }

    HttpServer::new(config)?.start().await?;
    Ok(())
}
