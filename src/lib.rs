//! SSO proxy configuration
//!
//! Defaults, environment overrides and validation for the SSO-aware reverse
//! proxy. The HTTP listener, session manager and provider client consume the
//! validated [`Configuration`].

pub mod cli;
pub mod config;
pub mod logger;

pub use crate::config::{
    ConfigError, Configuration, LoadError, Validate, default_config, load_config,
};
