//! Configuration validation logic
//!
//! Every section implements [`Validate`]. Parents validate their children in
//! a fixed order and wrap the first failure with the child's label, so the
//! operator sees one actionable message such as
//! `invalid server config: no server.port configured`.
//!
//! Some sections have no enforced invariants yet (TTL windows, logging level,
//! email lists, request-signer key, upstream default timeouts). They still
//! implement [`Validate`] as explicit no-ops so tightening one is a local
//! change.

use std::fs::File;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use url::Url;

use crate::config::error::ConfigError;
use crate::config::settings::{
    ClientConfig, Configuration, CookieConfig, DefaultConfig, EmailConfig, LoggingConfig,
    MetricsConfig, ProviderConfig, RequestSignerConfig, ServerConfig, SessionConfig,
    StatsdConfig, TTLConfig, TimeoutConfig, UpstreamConfigs,
};

/// Accepted decoded cookie secret sizes, in bytes
const VALID_SECRET_LENGTHS: &[usize] = &[32, 64];

/// A configuration section that can check its own invariants
pub trait Validate {
    /// Returns the first violated invariant, if any
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Validate `children` in order, wrapping the first failure with its label
fn validate_children(children: &[(&'static str, &dyn Validate)]) -> Result<(), ConfigError> {
    for &(label, child) in children {
        child.validate().map_err(|e| e.in_section(label))?;
    }
    Ok(())
}

fn require(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::invalid(field, value));
    }
    Ok(())
}

fn require_absolute_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    require(field, value)?;
    let url = Url::parse(value).map_err(|source| ConfigError::UrlParse { field, source })?;
    if url.scheme().is_empty() || url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::UrlIncomplete { field });
    }
    Ok(url)
}

/// Returns true when the character is a valid HTTP token character.
const fn is_tchar(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '!' | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '.'
                | '^'
                | '_'
                | '`'
                | '|'
                | '~'
        )
}

/// Render the trial `Set-Cookie` pair for `name`, or `None` if the name
/// cannot appear in a cookie header.
fn trial_cookie(name: &str) -> Option<String> {
    if name.is_empty() || !name.chars().all(is_tchar) {
        return None;
    }
    Some(format!("{name}="))
}

/// Stops at the first failing section; later sections are not checked.
impl Validate for Configuration {
    fn validate(&self) -> Result<(), ConfigError> {
        let sections: [(&'static str, &dyn Validate); 8] = [
            ("server", &self.server),
            ("provider", &self.provider),
            ("session", &self.session),
            ("client", &self.client),
            ("upstream", &self.upstream),
            ("metrics", &self.metrics),
            ("logging", &self.logging),
            ("requestsigner", &self.request_signer),
        ];
        validate_children(&sections)
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::missing("server.port"));
        }
        self.timeout
            .validate()
            .map_err(|e| e.in_section("server.timeout"))
    }
}

impl Validate for TimeoutConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

impl Validate for ProviderConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require("provider.type", &self.provider_type)?;
        require("provider.slug", &self.slug)?;
        require_absolute_url("provider.url_external", &self.url_external)?;
        require_absolute_url("provider.url_internal", &self.url_internal)?;
        Ok(())
    }
}

impl Validate for SessionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let sections: [(&'static str, &dyn Validate); 2] =
            [("session.cookie", &self.cookie), ("session.ttl", &self.ttl)];
        validate_children(&sections)
    }
}

impl CookieConfig {
    /// Decode the cookie secret into raw key bytes
    ///
    /// Fails exactly as validation would: empty, not base64, or not 32/64
    /// bytes once decoded.
    pub fn decode_secret(&self) -> Result<Vec<u8>, ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::missing("cookie.secret"));
        }
        let decoded = STANDARD
            .decode(&self.secret)
            .map_err(ConfigError::SecretEncoding)?;
        if !VALID_SECRET_LENGTHS.contains(&decoded.len()) {
            return Err(ConfigError::SecretLength(decoded.len()));
        }
        Ok(decoded)
    }
}

impl Validate for CookieConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.decode_secret()?;
        if trial_cookie(&self.name).is_none() {
            return Err(ConfigError::invalid("cookie.name", self.name.as_str()));
        }
        Ok(())
    }
}

// TODO: bound lifetime/valid/grace_period once the session manager documents
// the relationships it relies on (valid <= lifetime, grace_period > 0).
impl Validate for TTLConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

impl Validate for ClientConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.id.is_empty() {
            return Err(ConfigError::missing("client.id"));
        }
        if self.secret.is_empty() {
            return Err(ConfigError::missing("client.secret"));
        }
        Ok(())
    }
}

impl Validate for UpstreamConfigs {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = self.configs_file.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            // Existence only; the file is parsed by the upstream router.
            File::open(path).map_err(|source| ConfigError::File {
                field: "upstream.configs_file",
                path: path.clone(),
                source,
            })?;
        }
        if self.cluster.is_empty() {
            return Err(ConfigError::missing("upstream.cluster"));
        }
        self.default
            .validate()
            .map_err(|e| e.in_section("upstream.default"))
    }
}

impl Validate for DefaultConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.email
            .validate()
            .map_err(|e| e.in_section("upstream.default.email"))
    }
}

impl Validate for EmailConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

impl Validate for MetricsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.statsd
            .validate()
            .map_err(|e| e.in_section("metrics.statsd"))
    }
}

impl Validate for StatsdConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::missing("statsd.host"));
        }
        if self.port == 0 {
            return Err(ConfigError::missing("statsd.port"));
        }
        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

impl Validate for RequestSignerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}
