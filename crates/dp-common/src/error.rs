//! Error types for the diagnostic probe.

use thiserror::Error;

/// Result type alias for diagnostic probe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the diagnostic probe.
///
/// Crate-local errors (`ConfigError`, `DiagnosticError`) convert into this
/// type at the CLI boundary.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid value for `{key}`: {reason}")]
    InvalidArgument { key: String, reason: String },

    // Diagnostic interface errors (20-29)
    #[error("diagnostic command interface unavailable: {0}")]
    DiagnosticUnavailable(String),

    #[error("unknown diagnostic command '{command}'")]
    UnknownCommand { command: String },

    #[error("diagnostic command '{command}' failed: {reason}")]
    DiagnosticQuery { command: String, reason: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Platform errors (70-79)
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidArgument { .. } => 11,
            Error::DiagnosticUnavailable(_) => 20,
            Error::UnknownCommand { .. } => 21,
            Error::DiagnosticQuery { .. } => 22,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
            Error::UnsupportedPlatform(_) => 70,
        }
    }

    /// Whether this error was raised while building a probe configuration.
    pub fn is_config(&self) -> bool {
        (10..20).contains(&self.code())
    }
}
