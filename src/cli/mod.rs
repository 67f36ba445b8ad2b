//! CLI module for the configuration tool
//!
//! - Argument parsing with clap
//! - Command execution (`check`, `print`)

pub mod executor;
pub mod parser;

// Re-export public types for convenience
pub use executor::execute_command;
pub use parser::{Cli, Commands};
