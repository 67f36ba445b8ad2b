//! Configuration settings structures for the SSO proxy
//!
//! This module defines every configuration section together with its
//! production defaults. `Configuration::default()` is the baseline that
//! environment overrides are merged onto; it intentionally leaves secrets,
//! provider URLs, client credentials and the upstream cluster empty, so the
//! bare defaults never pass validation.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::duration_format;

/// Placeholder written over secret values by [`Configuration::redacted`]
pub const REDACTED: &str = "<redacted>";

// ============================================================================
// Default value functions
// ============================================================================

fn default_port() -> u16 {
    4180
}

fn default_server_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_provider_type() -> String {
    "sso".to_string()
}

fn default_provider_slug() -> String {
    "google".to_string()
}

fn default_cookie_name() -> String {
    "_sso_proxy".to_string()
}

fn default_cookie_expire() -> Duration {
    Duration::from_secs(168 * 60 * 60)
}

fn default_true() -> bool {
    true
}

fn default_ttl_lifetime() -> Duration {
    Duration::from_secs(720 * 60 * 60)
}

fn default_ttl_valid() -> Duration {
    Duration::from_secs(60)
}

fn default_ttl_grace_period() -> Duration {
    Duration::from_secs(3 * 60 * 60)
}

fn default_upstream_scheme() -> String {
    "https".to_string()
}

fn default_upstream_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_upstream_reset_deadline() -> Duration {
    Duration::from_secs(60)
}

fn default_statsd_host() -> String {
    "localhost".to_string()
}

fn default_statsd_port() -> u16 {
    8125
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn redact(value: &mut String) {
    if !value.is_empty() {
        *value = REDACTED.to_string();
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP listener timeouts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Response write timeout
    #[serde(default = "default_server_timeout", with = "duration_format")]
    pub write: Duration,

    /// Request read timeout
    #[serde(default = "default_server_timeout", with = "duration_format")]
    pub read: Duration,

    /// Graceful shutdown budget
    #[serde(default = "default_server_timeout", with = "duration_format")]
    pub shutdown: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            write: default_server_timeout(),
            read: default_server_timeout(),
            shutdown: default_server_timeout(),
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Listener timeouts
    #[serde(default)]
    pub timeout: TimeoutConfig,
}

impl ServerConfig {
    /// Address the proxy listens on, all interfaces
    pub fn listen_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            timeout: TimeoutConfig::default(),
        }
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Identity provider descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider implementation, e.g. `sso`
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// Provider slug, e.g. `google`
    #[serde(default = "default_provider_slug")]
    pub slug: String,

    /// OAuth scope requested from the provider
    #[serde(default)]
    pub scope: String,

    /// Provider URL as seen by browsers
    #[serde(default)]
    pub url_external: String,

    /// Provider URL as seen by the proxy itself
    #[serde(default)]
    pub url_internal: String,

    /// Skip the provider reachability check at startup
    #[serde(default)]
    pub skip_auth_preflight: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            slug: default_provider_slug(),
            scope: String::new(),
            url_external: String::new(),
            url_internal: String::new(),
            skip_auth_preflight: false,
        }
    }
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Session cookie configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieConfig {
    /// Cookie name
    #[serde(default = "default_cookie_name")]
    pub name: String,

    /// Base64-encoded signing/encryption key; must decode to 32 or 64 bytes
    #[serde(default)]
    pub secret: String,

    /// Cookie lifetime
    #[serde(default = "default_cookie_expire", with = "duration_format")]
    pub expire: Duration,

    /// Cookie domain; empty means host-only
    #[serde(default)]
    pub domain: String,

    /// Set the `Secure` attribute
    #[serde(default = "default_true")]
    pub secure: bool,

    /// Set the `HttpOnly` attribute
    #[serde(default = "default_true")]
    pub httponly: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            secret: String::new(),
            expire: default_cookie_expire(),
            domain: String::new(),
            secure: default_true(),
            httponly: default_true(),
        }
    }
}

/// Session lifetime windows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TTLConfig {
    /// Maximum session lifetime before re-authentication
    #[serde(default = "default_ttl_lifetime", with = "duration_format")]
    pub lifetime: Duration,

    /// How long a session is trusted before revalidation with the provider
    #[serde(default = "default_ttl_valid", with = "duration_format")]
    pub valid: Duration,

    /// How long a session stays usable while the provider is unreachable
    #[serde(default = "default_ttl_grace_period", with = "duration_format")]
    pub grace_period: Duration,
}

impl Default for TTLConfig {
    fn default() -> Self {
        Self {
            lifetime: default_ttl_lifetime(),
            valid: default_ttl_valid(),
            grace_period: default_ttl_grace_period(),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// Cookie settings
    #[serde(default)]
    pub cookie: CookieConfig,

    /// Lifetime windows
    #[serde(default)]
    pub ttl: TTLConfig,
}

// ============================================================================
// Client Configuration
// ============================================================================

/// OAuth client credentials registered with the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    /// OAuth client id
    #[serde(default)]
    pub id: String,

    /// OAuth client secret
    #[serde(default)]
    pub secret: String,
}

// ============================================================================
// Upstream Configuration
// ============================================================================

/// Email-based access rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EmailConfig {
    /// Allowed email domains
    #[serde(default)]
    pub domains: Vec<String>,

    /// Allowed email addresses
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// Template applied to upstreams that do not override these values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultConfig {
    /// Email access rules
    #[serde(default)]
    pub email: EmailConfig,

    /// Allowed provider groups
    #[serde(default)]
    pub groups: Vec<String>,

    /// Provider slug override
    #[serde(default)]
    pub provider_slug: String,

    /// Upstream request timeout
    #[serde(default = "default_upstream_timeout", with = "duration_format")]
    pub timeout: Duration,

    /// TCP reset deadline for upstream connections
    #[serde(default = "default_upstream_reset_deadline", with = "duration_format")]
    pub reset_deadline: Duration,
}

impl Default for DefaultConfig {
    fn default() -> Self {
        Self {
            email: EmailConfig::default(),
            groups: Vec::new(),
            provider_slug: String::new(),
            timeout: default_upstream_timeout(),
            reset_deadline: default_upstream_reset_deadline(),
        }
    }
}

/// Upstream definitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfigs {
    /// Defaults for every upstream
    #[serde(default)]
    pub default: DefaultConfig,

    /// Optional path to the upstream definitions file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configs_file: Option<PathBuf>,

    /// Cluster identifier used when templating upstream hosts
    #[serde(default)]
    pub cluster: String,

    /// Scheme used when an upstream does not specify one
    #[serde(default = "default_upstream_scheme")]
    pub scheme: String,
}

impl Default for UpstreamConfigs {
    fn default() -> Self {
        Self {
            default: DefaultConfig::default(),
            configs_file: None,
            cluster: String::new(),
            scheme: default_upstream_scheme(),
        }
    }
}

// ============================================================================
// Metrics Configuration
// ============================================================================

/// StatsD sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsdConfig {
    /// StatsD host
    #[serde(default = "default_statsd_host")]
    pub host: String,

    /// StatsD port
    #[serde(default = "default_statsd_port")]
    pub port: u16,
}

impl StatsdConfig {
    /// `host:port` of the sink
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for StatsdConfig {
    fn default() -> Self {
        Self {
            host: default_statsd_host(),
            port: default_statsd_port(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MetricsConfig {
    /// StatsD sink
    #[serde(default)]
    pub statsd: StatsdConfig,
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Process logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is installed at all
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Level or filter directive, e.g. `INFO` or `sso_proxy=debug`
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable: default_true(),
            level: default_log_level(),
        }
    }
}

// ============================================================================
// Request Signer Configuration
// ============================================================================

/// Key used to sign requests forwarded upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RequestSignerConfig {
    /// Signing key material
    #[serde(default)]
    pub key: String,
}

// ============================================================================
// Main Configuration Structure
// ============================================================================

/// Complete proxy configuration
///
/// Built once at startup by the loader and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Configuration {
    /// HTTP listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Identity provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// OAuth client credentials
    #[serde(default)]
    pub client: ClientConfig,

    /// Session cookie and lifetimes
    #[serde(default)]
    pub session: SessionConfig,

    /// Upstream definitions
    #[serde(default)]
    pub upstream: UpstreamConfigs,

    /// Metrics sink
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Process logging
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Upstream request signing
    #[serde(default, rename = "requestsigner")]
    pub request_signer: RequestSignerConfig,
}

impl Configuration {
    /// Copy of this configuration with every secret replaced by a placeholder
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        redact(&mut copy.session.cookie.secret);
        redact(&mut copy.client.secret);
        redact(&mut copy.request_signer.key);
        copy
    }
}

/// Production defaults for every section
pub fn default_config() -> Configuration {
    Configuration::default()
}
