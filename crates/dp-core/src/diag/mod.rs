//! Diagnostic command interface.
//!
//! A host process exposes named, argument-less diagnostic commands that return
//! human-readable text (thread listings, memory maps, limits). The probe talks
//! to that surface through [`DiagnosticInterface`].
//!
//! Availability of the platform interface is detected once per process and
//! never re-checked: [`platform_interface`] returns the same answer for the
//! lifetime of the process.

#[cfg(target_os = "linux")]
pub mod procfs;

#[cfg(target_os = "linux")]
pub use procfs::ProcfsDiagnostics;

use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tracing::debug;

/// Errors from a single diagnostic query.
#[derive(Debug, Error)]
pub enum DiagnosticError {
    #[error("unknown diagnostic command")]
    UnknownCommand { command: String },

    #[error("{source}")]
    Access {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{reason}")]
    Failed { command: String, reason: String },

    #[error("command panicked: {message}")]
    Panicked { command: String, message: String },
}

impl DiagnosticError {
    pub fn command(&self) -> &str {
        match self {
            DiagnosticError::UnknownCommand { command }
            | DiagnosticError::Access { command, .. }
            | DiagnosticError::Failed { command, .. }
            | DiagnosticError::Panicked { command, .. } => command,
        }
    }

    /// Text emitted in place of the snapshot body.
    pub fn render(&self) -> String {
        format!("ERROR: Unable to access '{}' - {}", self.command(), self)
    }
}

impl From<DiagnosticError> for dp_common::Error {
    fn from(err: DiagnosticError) -> Self {
        match err {
            DiagnosticError::UnknownCommand { command } => {
                dp_common::Error::UnknownCommand { command }
            }
            other => dp_common::Error::DiagnosticQuery {
                command: other.command().to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Outcome of one query: command text, or an error carried as a value.
pub type DiagnosticResult = Result<String, DiagnosticError>;

/// Name and one-line description of an available command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandInfo {
    pub name: &'static str,
    pub description: &'static str,
}

/// The host's diagnostic-command surface.
pub trait DiagnosticInterface: Send + Sync {
    /// Run an argument-less command and return its text output.
    fn invoke(&self, command: &str) -> DiagnosticResult;

    /// Commands this interface answers.
    fn commands(&self) -> Vec<CommandInfo>;

    /// Hand `object` to the host's reclamation facility. The host drops it
    /// during a later collection cycle.
    fn retire(&self, object: Box<dyn Any + Send>);

    /// Request a collection cycle.
    fn request_collection(&self);
}

/// Query `command`, turning panics inside the interface into errors.
pub fn query(interface: &dyn DiagnosticInterface, command: &str) -> DiagnosticResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| interface.invoke(command)));
    let result = match outcome {
        Ok(result) => result,
        Err(payload) => Err(DiagnosticError::Panicked {
            command: command.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    };
    match &result {
        Ok(text) => debug!(command, bytes = text.len(), "diagnostic query succeeded"),
        Err(err) => debug!(command, error = %err, "diagnostic query failed"),
    }
    result
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

static PLATFORM: LazyLock<Option<Arc<dyn DiagnosticInterface>>> = LazyLock::new(detect_platform);

/// The current process's diagnostic interface, or `None` if this host lacks
/// one. Detected on first call; the answer never changes afterwards.
pub fn platform_interface() -> Option<Arc<dyn DiagnosticInterface>> {
    (*PLATFORM).clone()
}

#[cfg(target_os = "linux")]
fn detect_platform() -> Option<Arc<dyn DiagnosticInterface>> {
    match ProcfsDiagnostics::for_self() {
        Ok(procfs) => {
            debug!("diagnostic interface available via procfs");
            Some(Arc::new(procfs) as Arc<dyn DiagnosticInterface>)
        }
        Err(err) => {
            debug!(error = %err, "diagnostic interface unavailable");
            None
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn detect_platform() -> Option<Arc<dyn DiagnosticInterface>> {
    debug!("diagnostic interface unavailable on this platform");
    None
}

/// Open the diagnostic interface of another process.
#[cfg(target_os = "linux")]
pub fn interface_for_pid(pid: u32) -> dp_common::Result<Arc<dyn DiagnosticInterface>> {
    ProcfsDiagnostics::for_pid(pid)
        .map(|procfs| Arc::new(procfs) as Arc<dyn DiagnosticInterface>)
        .map_err(|err| {
            dp_common::Error::DiagnosticUnavailable(format!("process {pid}: {err}"))
        })
}

#[cfg(not(target_os = "linux"))]
pub fn interface_for_pid(pid: u32) -> dp_common::Result<Arc<dyn DiagnosticInterface>> {
    Err(dp_common::Error::UnsupportedPlatform(format!(
        "cannot inspect process {pid} without procfs"
    )))
}
