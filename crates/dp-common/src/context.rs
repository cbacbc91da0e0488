//! Call context labels.
//!
//! A `CallContext` names the wrapped operation in emitted snapshots. It is
//! opaque to the probe: only its display form is ever used.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;

/// Human-readable label of an instrumented operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallContext(String);

impl CallContext {
    /// Create a context from an explicit label, e.g. `"app::handler::serve"`.
    pub fn new(label: impl Into<String>) -> Self {
        CallContext(label.into())
    }

    /// Label the call by the source location of the caller.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        CallContext(format!("{}:{}", location.file(), location.line()))
    }

    /// The label as a string slice.
    pub fn label(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CallContext {
    fn from(label: &str) -> Self {
        CallContext::new(label)
    }
}

impl From<String> for CallContext {
    fn from(label: String) -> Self {
        CallContext(label)
    }
}
