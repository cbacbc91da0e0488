//! Diagnostic probe configuration.
//!
//! This crate provides:
//! - Parsing of flat `key=value;...` probe argument strings
//! - Placement resolution with degrade-to-disabled on bad input
//! - The immutable `ProbeConfig` record and common prefix options

pub mod args;
pub mod common;
pub mod error;
pub mod placement;
pub mod probe;

pub use args::ArgumentCollection;
pub use common::{CommonOptions, ProbeDefaults};
pub use error::ConfigError;
pub use placement::{Placement, PlacementWarning};
pub use probe::{OutputLimit, ProbeConfig, KNOWN_ARGS};
