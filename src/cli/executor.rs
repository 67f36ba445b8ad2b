//! Command executor for dispatching CLI commands

use anyhow::Context;

use super::parser::{Cli, Commands};
use crate::config::{ConfigLoader, Configuration, LoadError, LoggingConfig, Validate};
use crate::logger::init_logger;

/// Execute the parsed CLI command
///
/// The logger is installed before the load that is reported on, so loader
/// events reach stderr for both commands. Loading or validation failures are
/// returned as errors so `main` exits non-zero.
pub fn execute_command(cli: &Cli) -> anyhow::Result<()> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::new().with_file(path),
        None => ConfigLoader::new(),
    };

    init_logger(&bootstrap_logging(loader.load())).context("Logger initialization failed")?;
    let config = loader.load().context("Configuration load failed")?;

    match cli.effective_command() {
        Commands::Check => {
            let summary = check(&config)?;
            tracing::info!(port = config.server.port, "configuration is valid");
            println!("{}", summary);
        }
        Commands::Print => print!("{}", render(&config)?),
    }
    Ok(())
}

/// Logging settings from a first, unlogged load
///
/// A failed load falls back to the defaults it carries, so the failure
/// itself is still logged by the second load.
fn bootstrap_logging(loaded: Result<Configuration, LoadError>) -> LoggingConfig {
    match loaded {
        Ok(config) => config.logging,
        Err(e) => e.partial.logging,
    }
}

/// Validate `config` and summarise it on one line
pub fn check(config: &Configuration) -> anyhow::Result<String> {
    config.validate().context("Configuration is invalid")?;

    Ok(format!(
        "✓ Configuration is valid (listen {}, provider {}, cluster {}, statsd {})",
        config.server.listen_address(),
        config.provider.slug,
        config.upstream.cluster,
        config.metrics.statsd.address(),
    ))
}

/// Render `config` as TOML with secrets redacted
pub fn render(config: &Configuration) -> anyhow::Result<String> {
    toml::to_string(&config.redacted()).context("Failed to render configuration")
}
