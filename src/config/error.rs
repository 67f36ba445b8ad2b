//! Configuration error types

use std::path::PathBuf;

use thiserror::Error;

/// Configuration error types
///
/// Messages name the dotted field path so an operator can fix the value
/// without reading the source.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field was left empty or zero
    #[error("no {field} configured")]
    Missing {
        /// Dotted path of the field
        field: &'static str,
    },

    /// A required field holds an unusable value
    #[error("invalid {field}: {value:?}")]
    InvalidValue {
        /// Dotted path of the field
        field: &'static str,
        /// The offending value, possibly empty
        value: String,
    },

    /// A URL field failed to parse
    #[error("invalid {field} configured: {source}")]
    UrlParse {
        /// Dotted path of the field
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    /// A URL field parsed but is missing its scheme or host
    #[error("{field} must include scheme and host")]
    UrlIncomplete {
        /// Dotted path of the field
        field: &'static str,
    },

    /// The cookie secret is not valid base64
    #[error(
        "invalid cookie.secret configured; expected base64-encoded bytes, as from `openssl rand 32 -base64`: {0}"
    )]
    SecretEncoding(#[source] base64::DecodeError),

    /// The cookie secret decoded to an unsupported key size
    #[error("invalid value for cookie.secret; must decode to 32 or 64 bytes, but decoded to {0} bytes")]
    SecretLength(usize),

    /// A file referenced by the configuration cannot be opened
    #[error("invalid {field} filepath {}: {source}", .path.display())]
    File {
        /// Dotted path of the field
        field: &'static str,
        /// The path that was probed
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A child section failed validation
    #[error("invalid {section} config: {source}")]
    Section {
        /// Section label, e.g. `server` or `session.cookie`
        section: &'static str,
        #[source]
        source: Box<ConfigError>,
    },

    /// An external key carried a value that could not be coerced
    #[error("invalid value for {key}: {message}")]
    Decode {
        /// The external key, e.g. `SERVER_TIMEOUT_READ`
        key: String,
        /// Why coercion failed
        message: String,
    },

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Generic configuration error from config crate
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

impl ConfigError {
    /// Create a new missing-field error
    pub fn missing(field: &'static str) -> Self {
        ConfigError::Missing { field }
    }

    /// Create a new invalid-value error
    pub fn invalid<S: Into<String>>(field: &'static str, value: S) -> Self {
        ConfigError::InvalidValue {
            field,
            value: value.into(),
        }
    }

    /// Create a new decode error for an external key
    pub fn decode<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        ConfigError::Decode {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Wrap this error with a section label
    pub fn in_section(self, section: &'static str) -> Self {
        ConfigError::Section {
            section,
            source: Box::new(self),
        }
    }

    /// The innermost error beneath any section wrapping
    pub fn root_cause(&self) -> &ConfigError {
        match self {
            ConfigError::Section { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
