//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::loader::CONFIG_FILE_ENV;

/// Load and check SSO proxy configuration
#[derive(Parser, Debug)]
#[command(name = "sso-proxy-config")]
#[command(version)]
#[command(about = "Load and check SSO proxy configuration")]
#[command(long_about = "
Loads the SSO proxy configuration from built-in defaults, an optional TOML
file and environment variables (SESSION_COOKIE_NAME, SERVER_PORT, ...), then
validates it section by section.

EXAMPLES:
    # Validate the configuration from the current environment
    sso-proxy-config check

    # Layer a TOML file under the environment
    sso-proxy-config --config /etc/sso/proxy.toml check

    # Show the effective configuration with secrets redacted
    sso-proxy-config print
")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// TOML file layered beneath environment variables. A missing file fails
    /// the load.
    #[arg(short, long, value_name = "FILE", env = CONFIG_FILE_ENV)]
    pub config: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Load and validate the configuration (default)
    ///
    /// Exits non-zero with the first section-level error if the
    /// configuration is not usable.
    Check,
    /// Print the effective configuration as TOML, secrets redacted
    ///
    /// Does not validate; use `check` for that.
    Print,
}

impl Cli {
    /// The command to run, `check` when none was given
    pub fn effective_command(&self) -> Commands {
        self.command.unwrap_or(Commands::Check)
    }
}
