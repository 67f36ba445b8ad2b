//! Configuration loader for the SSO proxy
//!
//! This module provides the `ConfigLoader` struct that merges external
//! key/value overrides onto the production defaults.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use thiserror::Error;

use crate::config::error::ConfigError;
use crate::config::overrides::{binding_for, collect_overrides};
use crate::config::settings::{Configuration, default_config};

/// Environment variable naming an optional TOML configuration file
pub const CONFIG_FILE_ENV: &str = "SSO_PROXY_CONFIG_FILE";

/// A failed load, carrying the configuration as it stood before any
/// override was applied
#[derive(Debug, Error)]
#[error("failed to load configuration: {source}")]
pub struct LoadError {
    /// The defaults, untouched by the failing overrides
    pub partial: Box<Configuration>,
    #[source]
    pub source: ConfigError,
}

impl LoadError {
    fn new(source: ConfigError) -> Self {
        Self {
            partial: Box::new(default_config()),
            source,
        }
    }
}

/// Configuration loader that handles layered configuration loading
///
/// Sources, lowest priority first:
/// 1. Built-in defaults (`Configuration::default()`)
/// 2. Optional TOML file (`with_file` or `SSO_PROXY_CONFIG_FILE`)
/// 3. External key/value overrides (`SESSION_COOKIE_NAME`, `SERVER_PORT`, ...)
///
/// The loader does not validate; call
/// [`Validate::validate`](crate::config::Validate::validate) on the result.
#[derive(Debug, Default, Clone)]
pub struct ConfigLoader {
    /// Specific configuration file path
    config_file: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader with no file layer
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a TOML file layer beneath the key/value overrides
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// The configured file layer, if any
    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// Load configuration from the live process environment
    ///
    /// `SSO_PROXY_CONFIG_FILE` selects the file layer unless `with_file`
    /// already did.
    pub fn load(&self) -> Result<Configuration, LoadError> {
        let vars = utf8_vars(std::env::vars_os()).map_err(Self::failed)?;
        let loader = match (&self.config_file, std::env::var(CONFIG_FILE_ENV)) {
            (None, Ok(path)) if !path.is_empty() => self.clone().with_file(path),
            _ => self.clone(),
        };
        loader.load_from(vars)
    }

    /// Load configuration from an explicit key/value source
    pub fn load_from<I, K, V>(&self, source: I) -> Result<Configuration, LoadError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.build(source).map_err(Self::failed)
    }

    fn failed(error: ConfigError) -> LoadError {
        tracing::error!(error = %error, "configuration load failed");
        LoadError::new(error)
    }

    fn build<I, K, V>(&self, source: I) -> Result<Configuration, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let overrides = collect_overrides(source)?;

        let mut builder = Config::builder();
        if let Some(path) = &self.config_file {
            builder = Self::add_file_source(builder, path)?;
        }
        for entry in overrides {
            tracing::debug!(key = entry.key, path = entry.path, "applying configuration override");
            builder = builder.set_override(entry.path, entry.value)?;
        }

        let configuration: Configuration = builder.build()?.try_deserialize()?;
        tracing::info!(
            file = ?self.config_file,
            port = configuration.server.port,
            "configuration loaded"
        );
        Ok(configuration)
    }

    /// Add a required TOML file source to the config builder
    fn add_file_source(
        builder: ConfigBuilder<DefaultState>,
        path: &Path,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let Some(name) = path.to_str() else {
            return Err(ConfigError::invalid("config file", path.display().to_string()));
        };
        Ok(builder.add_source(File::new(name, FileFormat::Toml).required(true)))
    }
}

/// Convert OS key/value pairs to UTF-8
///
/// Pairs whose key is not UTF-8, or is not a recognised key, are skipped. A
/// recognised key whose value is not UTF-8 is an error.
fn utf8_vars<I>(vars: I) -> Result<Vec<(String, String)>, ConfigError>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut pairs = Vec::new();
    for (key, value) in vars {
        let Ok(key) = key.into_string() else {
            continue;
        };
        if binding_for(&key).is_none() {
            continue;
        }
        match value.into_string() {
            Ok(value) => pairs.push((key, value)),
            Err(_) => return Err(ConfigError::decode(key, "value is not valid UTF-8")),
        }
    }
    Ok(pairs)
}

/// Load configuration from defaults and the process environment
pub fn load_config() -> Result<Configuration, LoadError> {
    ConfigLoader::new().load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use std::time::Duration;

    use proptest::prelude::*;
    use tempfile::TempDir;

    use crate::config::overrides::ENV_BINDINGS;
    use crate::config::validation::Validate;

    // Global mutex to ensure tests run sequentially to avoid env var conflicts
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    const NO_OVERRIDES: [(&str, &str); 0] = [];

    /// Helper to safely set environment variables for a test
    struct EnvGuard {
        vars_to_restore: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self {
                vars_to_restore: Vec::new(),
            }
        }

        fn set(&mut self, key: &str, value: &str) {
            let original = std::env::var(key).ok();
            self.vars_to_restore.push((key.to_string(), original));
            unsafe {
                std::env::set_var(key, value);
            }
        }

        fn remove(&mut self, key: &str) {
            let original = std::env::var(key).ok();
            self.vars_to_restore.push((key.to_string(), original));
            unsafe {
                std::env::remove_var(key);
            }
        }

        /// Clear every recognised key plus the file selector
        fn clear_bound(&mut self) {
            self.remove(CONFIG_FILE_ENV);
            for binding in ENV_BINDINGS {
                self.remove(binding.key);
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, original_value) in self.vars_to_restore.iter().rev() {
                unsafe {
                    match original_value {
                        Some(value) => std::env::set_var(key, value),
                        None => std::env::remove_var(key),
                    }
                }
            }
        }
    }

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("Failed to write config file");
        path
    }

    #[test]
    fn test_no_overrides_equals_defaults() {
        let config = ConfigLoader::new().load_from(NO_OVERRIDES).unwrap();
        assert_eq!(config, default_config());
    }

    #[test]
    fn test_single_field_override() {
        let config = ConfigLoader::new()
            .load_from([("SESSION_COOKIE_NAME", "foo_cookie_name")])
            .unwrap();

        let mut expected = default_config();
        expected.session.cookie.name = "foo_cookie_name".to_string();
        assert_eq!(config, expected);
    }

    #[test]
    fn test_duration_overrides() {
        let config = ConfigLoader::new()
            .load_from([("SERVER_TIMEOUT_WRITE", "60s"), ("SERVER_TIMEOUT_READ", "60s")])
            .unwrap();
        assert_eq!(config.server.timeout.write, Duration::from_secs(60));
        assert_eq!(config.server.timeout.read, Duration::from_secs(60));
        assert_eq!(config.server.timeout.shutdown, Duration::from_secs(30));
    }

    #[test]
    fn test_provider_slug_override() {
        let config = ConfigLoader::new()
            .load_from([("PROVIDER_SLUG", "foo-slug")])
            .unwrap();
        assert_eq!(config.provider.slug, "foo-slug");
    }

    #[test]
    fn test_unknown_keys_leave_defaults() {
        let config = ConfigLoader::new()
            .load_from([("NOT_A_KNOWN_KEY", "value"), ("SERVER_COLOR", "red")])
            .unwrap();
        assert_eq!(config, default_config());
    }

    #[test]
    fn test_typed_overrides() {
        let config = ConfigLoader::new()
            .load_from([
                ("SERVER_PORT", "8080"),
                ("METRICS_STATSD_PORT", "9125"),
                ("LOGGING_ENABLE", "false"),
                ("SESSION_COOKIE_HTTPONLY", "false"),
                ("PROVIDER_SKIP_AUTH_PREFLIGHT", "true"),
                ("SESSION_TTL_GRACEPERIOD", "90m"),
                ("UPSTREAM_DEFAULT_TCP_RESET_DEADLINE", "2m"),
                ("UPSTREAM_CONFIGS_FILE", "/etc/sso/upstream_configs.yml"),
            ])
            .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.metrics.statsd.port, 9125);
        assert!(!config.logging.enable);
        assert!(!config.session.cookie.httponly);
        assert!(config.session.cookie.secure);
        assert!(config.provider.skip_auth_preflight);
        assert_eq!(config.session.ttl.grace_period, Duration::from_secs(90 * 60));
        assert_eq!(config.upstream.default.reset_deadline, Duration::from_secs(120));
        assert_eq!(
            config.upstream.configs_file,
            Some(PathBuf::from("/etc/sso/upstream_configs.yml"))
        );
    }

    #[test]
    fn test_list_overrides() {
        let config = ConfigLoader::new()
            .load_from([
                ("UPSTREAM_DEFAULT_EMAIL_DOMAINS", "example.com,corp.example.com"),
                ("UPSTREAM_DEFAULT_EMAIL_GROUPS", "admins"),
            ])
            .unwrap();
        assert_eq!(
            config.upstream.default.email.domains,
            vec!["example.com".to_string(), "corp.example.com".to_string()]
        );
        assert_eq!(config.upstream.default.groups, vec!["admins".to_string()]);
        assert!(config.upstream.default.email.addresses.is_empty());
    }

    #[test]
    fn test_bad_duration_fails_with_defaults_attached() {
        let err = ConfigLoader::new()
            .load_from([("SERVER_PORT", "9000"), ("SESSION_TTL_VALID", "a minute")])
            .unwrap_err();
        assert!(matches!(
            &err.source,
            ConfigError::Decode { key, .. } if key == "SESSION_TTL_VALID"
        ));
        assert_eq!(*err.partial, default_config());
    }

    #[test]
    fn test_empty_duration_fails_load() {
        let err = ConfigLoader::new()
            .load_from([("SERVER_TIMEOUT_READ", "")])
            .unwrap_err();
        assert!(matches!(
            &err.source,
            ConfigError::Decode { key, .. } if key == "SERVER_TIMEOUT_READ"
        ));
        assert!(err.to_string().contains("SERVER_TIMEOUT_READ"));
        assert_eq!(*err.partial, default_config());
    }

    #[test]
    fn test_empty_text_overrides_default() {
        let config = ConfigLoader::new()
            .load_from([("PROVIDER_SLUG", ""), ("UPSTREAM_CONFIGS_FILE", "")])
            .unwrap();
        assert_eq!(config.provider.slug, "");
        assert_eq!(config.upstream.configs_file, Some(PathBuf::new()));

        let err = config.provider.validate().unwrap_err();
        assert_eq!(err.to_string(), r#"invalid provider.slug: """#);
    }

    #[test]
    fn test_bad_port_fails() {
        let err = ConfigLoader::new()
            .load_from([("SERVER_PORT", "not-a-port")])
            .unwrap_err();
        assert!(matches!(err.source, ConfigError::Other(_)));
        assert_eq!(err.partial.server.port, 4180);
    }

    #[test]
    fn test_file_layer_under_overrides() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_file(
            &dir,
            "proxy.toml",
            r#"
[server]
port = 9000

[client]
id = "file-client"

[session.cookie]
name = "_file_cookie"
expire = "12h"
"#,
        );

        let config = ConfigLoader::new()
            .with_file(&path)
            .load_from([("SESSION_COOKIE_NAME", "_env_cookie")])
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.client.id, "file-client");
        assert_eq!(config.session.cookie.name, "_env_cookie");
        assert_eq!(config.session.cookie.expire, Duration::from_secs(12 * 3600));
        assert_eq!(config.server.timeout, default_config().server.timeout);
    }

    #[test]
    fn test_directory_file_layer_is_rejected() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let err = ConfigLoader::new()
            .with_file(dir.path())
            .load_from(NO_OVERRIDES)
            .unwrap_err();
        assert!(matches!(err.source, ConfigError::FileNotFound(_)));
        assert!(err.to_string().contains(&dir.path().display().to_string()));
    }

    #[test]
    fn test_missing_file_layer() {
        let err = ConfigLoader::new()
            .with_file("/no/such/proxy.toml")
            .load_from(NO_OVERRIDES)
            .unwrap_err();
        assert!(matches!(err.source, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_utf8_vars_keeps_only_bound_keys() {
        let pairs = utf8_vars([
            (OsString::from("HOME"), OsString::from("/root")),
            (OsString::from("CLIENT_ID"), OsString::from("proxy")),
        ])
        .unwrap();
        assert_eq!(pairs, vec![("CLIENT_ID".to_string(), "proxy".to_string())]);
    }

    #[cfg(unix)]
    #[test]
    fn test_utf8_vars_rejects_bound_key_with_invalid_value() {
        use std::os::unix::ffi::OsStringExt;

        let invalid = OsString::from_vec(vec![0x66, 0x6f, 0xff]);
        let pairs = utf8_vars([(OsString::from("UNRELATED"), invalid.clone())]).unwrap();
        assert!(pairs.is_empty());

        let err = utf8_vars([(OsString::from("SESSION_COOKIE_SECRET"), invalid)]).unwrap_err();
        assert!(matches!(
            &err,
            ConfigError::Decode { key, .. } if key == "SESSION_COOKIE_SECRET"
        ));
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_fails_on_invalid_utf8_value() {
        use std::os::unix::ffi::OsStrExt;

        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.clear_bound();
        // Removed by clear_bound's restore entry on drop
        unsafe {
            std::env::set_var(
                "SESSION_COOKIE_SECRET",
                std::ffi::OsStr::from_bytes(&[0x61, 0xff]),
            );
        }

        let err = load_config().unwrap_err();
        assert!(matches!(
            &err.source,
            ConfigError::Decode { key, .. } if key == "SESSION_COOKIE_SECRET"
        ));
        assert_eq!(*err.partial, default_config());
    }

    #[test]
    fn test_load_reads_process_environment() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.clear_bound();
        env.set("SESSION_COOKIE_NAME", "foo_cookie_name");
        env.set("SERVER_TIMEOUT_READ", "45s");

        let config = load_config().expect("Should load config");
        assert_eq!(config.session.cookie.name, "foo_cookie_name");
        assert_eq!(config.server.timeout.read, Duration::from_secs(45));
        assert_eq!(config.server.timeout.write, Duration::from_secs(30));
    }

    #[test]
    fn test_load_with_clean_environment_equals_defaults() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.clear_bound();

        assert_eq!(load_config().unwrap(), default_config());
    }

    #[test]
    fn test_load_picks_up_config_file_env() {
        // Declared first so the file outlives the restored environment
        let dir = TempDir::new().expect("Failed to create temp dir");
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.clear_bound();

        let path = write_file(&dir, "proxy.toml", "[upstream]\ncluster = \"from-file\"\n");
        env.set(CONFIG_FILE_ENV, path.to_str().unwrap());

        let config = load_config().unwrap();
        assert_eq!(config.upstream.cluster, "from-file");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_any_valid_port_round_trips(port in 1u16..=u16::MAX) {
            let port_str = port.to_string();
            let config = ConfigLoader::new()
                .load_from([("SERVER_PORT", port_str.as_str())])
                .unwrap();
            prop_assert_eq!(config.server.port, port);
        }

        #[test]
        fn prop_source_order_does_not_matter(
            entries in Just(vec![
                ("SERVER_PORT", "8081"),
                ("SESSION_COOKIE_NAME", "_shuffled"),
                ("SESSION_TTL_VALID", "5m"),
                ("UPSTREAM_DEFAULT_EMAIL_ADDRESSES", "a@example.com,b@example.com"),
                ("PROVIDER_TYPE", "oidc"),
                ("UNRELATED", "ignored"),
            ]).prop_shuffle()
        ) {
            let shuffled = ConfigLoader::new().load_from(entries.clone()).unwrap();
            let mut sorted = entries;
            sorted.sort();
            let ordered = ConfigLoader::new().load_from(sorted).unwrap();
            prop_assert_eq!(shuffled, ordered);
        }
    }
}
