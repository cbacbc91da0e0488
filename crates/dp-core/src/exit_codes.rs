//! Exit codes for the diagprobe CLI.
//!
//! `run` exits with the wrapped program's own code; these cover the probe's
//! own outcomes.

use dp_common::Error;

/// Exit codes for diagprobe operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Clean = 0,

    /// Probe arguments rejected
    ConfigError = 10,

    /// No diagnostic interface for the target
    DiagnosticUnavailable = 11,

    /// Diagnostic command failed
    CommandFailed = 12,

    /// I/O error
    IoError = 13,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates an error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::Config(_) | Error::InvalidArgument { .. } => ExitCode::ConfigError,
            Error::DiagnosticUnavailable(_) | Error::UnsupportedPlatform(_) => {
                ExitCode::DiagnosticUnavailable
            }
            Error::UnknownCommand { .. } | Error::DiagnosticQuery { .. } => ExitCode::CommandFailed,
            Error::Io(_) => ExitCode::IoError,
            Error::Json(_) => ExitCode::InternalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err = Error::InvalidArgument {
            key: "cmd".into(),
            reason: "missing".into(),
        };
        assert_eq!(ExitCode::from(&err), ExitCode::ConfigError);
        assert_eq!(
            ExitCode::from(&Error::UnsupportedPlatform("macos".into())),
            ExitCode::DiagnosticUnavailable
        );
        assert!(ExitCode::CommandFailed.is_error());
        assert!(!ExitCode::Clean.is_error());
        assert_eq!(i32::from(ExitCode::IoError), 13);
    }
}
