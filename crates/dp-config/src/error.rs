//! Configuration errors.

use thiserror::Error;

/// Errors raised while turning a probe argument string into a `ProbeConfig`.
///
/// Every variant names the offending key so the operator can fix the
/// argument string without guessing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown argument `{key}` (known: {known})")]
    UnknownKey { key: String, known: String },

    #[error("argument `{key}` given more than once")]
    DuplicateKey { key: String },

    #[error("malformed argument `{pair}`: expected key=value")]
    MalformedPair { pair: String },

    #[error("missing required argument `{key}`")]
    MissingKey { key: String },

    #[error("argument `{key}` is not an integer: {value}")]
    InvalidInt { key: String, value: String },

    #[error("argument `{key}` is not a boolean: {value}")]
    InvalidBool { key: String, value: String },

    #[error("argument `{key}` is out of range: {value}")]
    OutOfRange { key: String, value: String },
}

impl ConfigError {
    /// The key this error is about, if it names one.
    pub fn key(&self) -> Option<&str> {
        match self {
            ConfigError::UnknownKey { key, .. }
            | ConfigError::DuplicateKey { key }
            | ConfigError::MissingKey { key }
            | ConfigError::InvalidInt { key, .. }
            | ConfigError::InvalidBool { key, .. }
            | ConfigError::OutOfRange { key, .. } => Some(key),
            ConfigError::MalformedPair { .. } => None,
        }
    }
}

impl From<ConfigError> for dp_common::Error {
    fn from(err: ConfigError) -> Self {
        match err.key() {
            Some(key) => dp_common::Error::InvalidArgument {
                key: key.to_string(),
                reason: err.to_string(),
            },
            None => dp_common::Error::Config(err.to_string()),
        }
    }
}

/// Result type alias for configuration parsing.
pub type Result<T> = std::result::Result<T, ConfigError>;
