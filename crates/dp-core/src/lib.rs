//! Method-boundary diagnostic probe.
//!
//! Wraps a call with snapshots from the host's diagnostic-command interface:
//! - `diag`: the interface trait, query adapter, and procfs-backed host
//! - `truncate`: line-limit truncation
//! - `gc`: forced collection with completion wait
//! - `sink`: output destinations
//! - `probe`: the `wrap` state machine

pub mod diag;
pub mod exit_codes;
pub mod gc;
pub mod probe;
pub mod sink;
pub mod truncate;

pub use diag::{platform_interface, DiagnosticError, DiagnosticInterface, DiagnosticResult};
pub use dp_common::CallContext;
pub use dp_config::{OutputLimit, Placement, ProbeConfig, ProbeDefaults};
pub use probe::{Boundary, DiagnosticProbe, PassThroughReason};
pub use sink::{MemorySink, OutputSink, StreamSink, TargetStream};
