//! Configuration management for the SSO proxy
//!
//! Configuration is built once at process start:
//! 1. `Configuration::default()` - production defaults for every section
//! 2. Optional TOML file (`SSO_PROXY_CONFIG_FILE` or `--config`)
//! 3. External key overrides such as `SESSION_COOKIE_NAME` or `SERVER_PORT`
//!
//! Loading never validates. Callers run [`Validate::validate`] and treat
//! an error as fatal.

pub mod duration_format;
pub mod error;
pub mod loader;
pub mod overrides;
pub mod settings;
pub mod validation;

// Re-export public types
pub use error::ConfigError;
pub use loader::{ConfigLoader, LoadError, load_config};
pub use settings::{
    ClientConfig, Configuration, CookieConfig, DefaultConfig, EmailConfig, LoggingConfig,
    MetricsConfig, ProviderConfig, RequestSignerConfig, ServerConfig, SessionConfig,
    StatsdConfig, TTLConfig, TimeoutConfig, UpstreamConfigs, default_config,
};
pub use validation::Validate;
