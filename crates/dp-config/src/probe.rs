//! Typed probe configuration.

use crate::args::ArgumentCollection;
use crate::common::{CommonOptions, ProbeDefaults, LOG_TIMESTAMP, PREFIX};
use crate::error::{ConfigError, Result};
use crate::placement::{Placement, PlacementWarning};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Diagnostic command to run.
pub const COMMAND: &str = "cmd";
/// Snapshot placement: `before`, `after` or `beforeAndAfter`.
pub const WHERE: &str = "where";
/// Force a collection cycle before each snapshot.
pub const WITH_GC: &str = "with_gc";
/// Cap on emitted lines per snapshot.
pub const LIMIT_OUTPUT_LINES: &str = "limit_output_lines";

/// Every key a probe argument string may contain.
pub const KNOWN_ARGS: &[&str] = &[
    LOG_TIMESTAMP,
    PREFIX,
    COMMAND,
    LIMIT_OUTPUT_LINES,
    WHERE,
    WITH_GC,
];

const DEFAULT_WHERE: &str = "before";

/// How much of a snapshot is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLimit {
    #[default]
    Unlimited,
    Lines(usize),
}

impl OutputLimit {
    /// `-1` and `unlimited` mean no cap; other negatives are rejected.
    fn from_args(args: &ArgumentCollection) -> Result<Self> {
        if args.get(LIMIT_OUTPUT_LINES) == Some("unlimited") {
            return Ok(OutputLimit::Unlimited);
        }
        match args.parse_int(LIMIT_OUTPUT_LINES, -1)? {
            -1 => Ok(OutputLimit::Unlimited),
            n if n >= 0 => usize::try_from(n)
                .map(OutputLimit::Lines)
                .map_err(|_| out_of_range(n)),
            n => Err(out_of_range(n)),
        }
    }
}

fn out_of_range(n: i64) -> ConfigError {
    ConfigError::OutOfRange {
        key: LIMIT_OUTPUT_LINES.to_string(),
        value: n.to_string(),
    }
}

/// Immutable configuration of one diagnostic probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub command: String,
    pub output_limit: OutputLimit,
    pub force_gc: bool,
    pub placement: Placement,
    /// The `where` value exactly as given, kept for the placement warning.
    pub requested_placement: String,
    pub common: CommonOptions,
}

impl ProbeConfig {
    /// Parse a raw argument string such as `cmd=VM.status;where=after`.
    pub fn from_args(raw: &str, defaults: &ProbeDefaults) -> Result<Self> {
        let args = ArgumentCollection::parse(KNOWN_ARGS, raw)?;
        Self::from_collection(&args, defaults)
    }

    pub fn from_collection(args: &ArgumentCollection, defaults: &ProbeDefaults) -> Result<Self> {
        let common = CommonOptions::from_args(args, defaults)?;
        let command = args.require(COMMAND)?.to_string();
        let output_limit = OutputLimit::from_args(args)?;
        let force_gc = args.parse_bool(WITH_GC, false)?;
        let requested_placement = args.get_or_default(WHERE, DEFAULT_WHERE).to_string();
        let placement = Placement::resolve(&requested_placement);

        debug!(
            command = %command,
            placement = %placement,
            force_gc,
            ?output_limit,
            "probe configuration resolved"
        );

        Ok(Self {
            command,
            output_limit,
            force_gc,
            placement,
            requested_placement,
            common,
        })
    }

    /// The warning to emit once at construction, if `where` was unrecognized.
    pub fn placement_warning(&self) -> Option<PlacementWarning> {
        self.placement.is_disabled().then(|| PlacementWarning {
            command: self.command.clone(),
            value: self.requested_placement.clone(),
        })
    }
}
