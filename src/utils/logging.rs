//! Logging setup

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::config::LoggingConfig;

/// Setup console logging with the specified level; `RUST_LOG` takes precedence
pub fn setup_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .with(filter)
        .try_init()
        .ok();

    Ok(())
}

/// Console logging plus an appended plain-text copy in `file_path`
pub fn setup_logging_with_file(level: &str, file_path: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)
        .with_context(|| format!("Failed to open log file {}", file_path))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(filter)
        .try_init()
        .ok();

    Ok(())
}

/// Initialise logging from the `[logging]` section
pub fn init_from_config(config: &LoggingConfig) -> Result<()> {
    match &config.file {
        Some(path) => setup_logging_with_file(&config.level, path),
        None => setup_logging(&config.level),
    }
}
