//! Diagnostic probe common types and errors.
//!
//! This crate provides foundational types shared by the probe crates:
//! - Call context labels for wrapped operations
//! - The unified error type and its stable codes

pub mod context;
pub mod error;

pub use context::CallContext;
pub use error::{Error, Result};

/// Tag printed at the head of every line the probe emits.
pub const PROBE_TAG: &str = "diagprobe";

/// Action name used in emitted headers.
pub const ACTION_NAME: &str = "diagnostic_command";
