//! Process logging setup
//!
//! Installs a `tracing-subscriber` console layer filtered by
//! `logging.level`. Nothing is installed when `logging.enable` is false.

pub mod error;

pub use error::LoggerError;

use std::io::IsTerminal;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Level used when `logging.level` is not a valid filter directive
const FALLBACK_LEVEL: &str = "info";

/// Build the filter for a level string such as `INFO` or `sso=debug,info`
///
/// Level names are case-insensitive. An unparsable directive falls back to
/// `info` rather than failing startup.
pub fn build_filter(level: &str) -> EnvFilter {
    let directive = level.trim().to_lowercase();
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(FALLBACK_LEVEL))
}

/// Initialize the logger with the given configuration
///
/// Returns `Ok(false)` when logging is disabled and no subscriber was
/// installed.
pub fn init_logger(config: &LoggingConfig) -> Result<bool, LoggerError> {
    if !config.enable {
        return Ok(false);
    }

    let use_ansi = std::io::stderr().is_terminal();
    tracing_subscriber::registry()
        .with(build_filter(&config.level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(use_ansi)
                .with_target(true)
                .with_level(true),
        )
        .try_init()
        .map_err(|e| LoggerError::init(e.to_string()))?;

    Ok(true)
}
