//! External key bindings
//!
//! Maps flat `SECTION_FIELD` keys (conventionally environment variables) onto
//! dotted configuration paths. The mapping is a static table rather than a
//! naming rule: several keys do not split cleanly on `_`
//! (`SESSION_TTL_GRACEPERIOD`, `UPSTREAM_DEFAULT_TCP_RESET_DEADLINE`,
//! `UPSTREAM_CONFIGS_FILE`), and a table keeps the recognised set explicit.

use std::collections::BTreeMap;

use config::Value;

use crate::config::duration_format::parse_duration;
use crate::config::error::ConfigError;

/// How a raw string value is turned into a configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Passed through as-is; numbers and booleans are parsed on deserialize
    Text,
    /// Humantime duration literal such as `60s` or `3h`
    Duration,
    /// Comma-separated list, items trimmed, empty items dropped
    List,
}

/// One external key and where it lands in the configuration tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvBinding {
    /// External key, e.g. `SERVER_TIMEOUT_READ`
    pub key: &'static str,
    /// Dotted configuration path, e.g. `server.timeout.read`
    pub path: &'static str,
    /// Coercion applied to the raw value
    pub coercion: Coercion,
}

const fn bind(key: &'static str, path: &'static str, coercion: Coercion) -> EnvBinding {
    EnvBinding {
        key,
        path,
        coercion,
    }
}

/// Every recognised external key
pub const ENV_BINDINGS: &[EnvBinding] = &[
    // session
    bind("SESSION_COOKIE_NAME", "session.cookie.name", Coercion::Text),
    bind("SESSION_COOKIE_SECRET", "session.cookie.secret", Coercion::Text),
    bind("SESSION_COOKIE_EXPIRE", "session.cookie.expire", Coercion::Duration),
    bind("SESSION_COOKIE_DOMAIN", "session.cookie.domain", Coercion::Text),
    bind("SESSION_COOKIE_SECURE", "session.cookie.secure", Coercion::Text),
    bind("SESSION_COOKIE_HTTPONLY", "session.cookie.httponly", Coercion::Text),
    bind("SESSION_TTL_LIFETIME", "session.ttl.lifetime", Coercion::Duration),
    bind("SESSION_TTL_VALID", "session.ttl.valid", Coercion::Duration),
    bind("SESSION_TTL_GRACEPERIOD", "session.ttl.grace_period", Coercion::Duration),
    // request signer
    bind("REQUESTSIGNER_KEY", "requestsigner.key", Coercion::Text),
    // client
    bind("CLIENT_ID", "client.id", Coercion::Text),
    bind("CLIENT_SECRET", "client.secret", Coercion::Text),
    // server
    bind("SERVER_PORT", "server.port", Coercion::Text),
    bind("SERVER_TIMEOUT_SHUTDOWN", "server.timeout.shutdown", Coercion::Duration),
    bind("SERVER_TIMEOUT_READ", "server.timeout.read", Coercion::Duration),
    bind("SERVER_TIMEOUT_WRITE", "server.timeout.write", Coercion::Duration),
    // metrics
    bind("METRICS_STATSD_HOST", "metrics.statsd.host", Coercion::Text),
    bind("METRICS_STATSD_PORT", "metrics.statsd.port", Coercion::Text),
    // logging
    bind("LOGGING_ENABLE", "logging.enable", Coercion::Text),
    bind("LOGGING_LEVEL", "logging.level", Coercion::Text),
    // upstream
    bind("UPSTREAM_DEFAULT_EMAIL_DOMAINS", "upstream.default.email.domains", Coercion::List),
    bind("UPSTREAM_DEFAULT_EMAIL_ADDRESSES", "upstream.default.email.addresses", Coercion::List),
    bind("UPSTREAM_DEFAULT_EMAIL_GROUPS", "upstream.default.groups", Coercion::List),
    bind("UPSTREAM_DEFAULT_TIMEOUT", "upstream.default.timeout", Coercion::Duration),
    bind("UPSTREAM_DEFAULT_TCP_RESET_DEADLINE", "upstream.default.reset_deadline", Coercion::Duration),
    bind("UPSTREAM_DEFAULT_PROVIDER_SLUG", "upstream.default.provider_slug", Coercion::Text),
    bind("UPSTREAM_CONFIGS_FILE", "upstream.configs_file", Coercion::Text),
    bind("UPSTREAM_SCHEME", "upstream.scheme", Coercion::Text),
    bind("UPSTREAM_CLUSTER", "upstream.cluster", Coercion::Text),
    // provider
    bind("PROVIDER_TYPE", "provider.type", Coercion::Text),
    bind("PROVIDER_URL_EXTERNAL", "provider.url_external", Coercion::Text),
    bind("PROVIDER_URL_INTERNAL", "provider.url_internal", Coercion::Text),
    bind("PROVIDER_SLUG", "provider.slug", Coercion::Text),
    bind("PROVIDER_SCOPE", "provider.scope", Coercion::Text),
    bind("PROVIDER_SKIP_AUTH_PREFLIGHT", "provider.skip_auth_preflight", Coercion::Text),
];

/// A coerced value ready to be applied at `path`
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    /// External key the value came from
    pub key: &'static str,
    /// Dotted configuration path
    pub path: &'static str,
    /// Coerced value
    pub value: OverrideValue,
}

/// Coerced override payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideValue {
    Text(String),
    List(Vec<String>),
}

impl From<OverrideValue> for Value {
    fn from(value: OverrideValue) -> Self {
        match value {
            OverrideValue::Text(s) => Value::from(s),
            OverrideValue::List(items) => Value::from(items),
        }
    }
}

impl Coercion {
    /// Coerce `raw`, naming `key` in any error
    pub fn apply(self, key: &str, raw: &str) -> Result<OverrideValue, ConfigError> {
        match self {
            Coercion::Text => Ok(OverrideValue::Text(raw.to_string())),
            Coercion::Duration => {
                parse_duration(raw).map_err(|message| ConfigError::decode(key, message))?;
                Ok(OverrideValue::Text(raw.trim().to_string()))
            }
            Coercion::List => Ok(OverrideValue::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
        }
    }
}

/// Look up the binding for an external key
pub fn binding_for(key: &str) -> Option<&'static EnvBinding> {
    ENV_BINDINGS.iter().find(|binding| binding.key == key)
}

/// Coerce every recognised key in `source`
///
/// The result is ordered by the binding table, so it depends only on the
/// key/value contents of `source` and not on its iteration order. Unknown
/// keys are ignored. A recognised key set to an empty string is applied like
/// any other value, so it fails coercion or overrides the default with `""`.
/// When a key appears more than once the last occurrence wins.
pub fn collect_overrides<I, K, V>(source: I) -> Result<Vec<Override>, ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut recognised: BTreeMap<&'static str, String> = BTreeMap::new();
    for (key, value) in source {
        if let Some(binding) = binding_for(key.as_ref()) {
            recognised.insert(binding.key, value.as_ref().to_string());
        }
    }

    let mut overrides = Vec::with_capacity(recognised.len());
    for binding in ENV_BINDINGS {
        let Some(raw) = recognised.get(binding.key) else {
            continue;
        };
        overrides.push(Override {
            key: binding.key,
            path: binding.path,
            value: binding.coercion.apply(binding.key, raw)?,
        });
    }
    Ok(overrides)
}
