//! Snapshot placement relative to the wrapped call.

use dp_common::{ACTION_NAME, PROBE_TAG};
use serde::{Deserialize, Serialize};
use std::fmt;

/// When snapshots fire relative to the wrapped call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Before,
    After,
    BeforeAndAfter,
    /// Unrecognized `where` value; the probe only calls through.
    Disabled,
}

impl Placement {
    /// Map a `where` value onto a placement. Anything unrecognized is
    /// `Disabled`.
    pub fn resolve(value: &str) -> Self {
        match value {
            "before" => Placement::Before,
            "after" => Placement::After,
            "beforeAndAfter" => Placement::BeforeAndAfter,
            _ => Placement::Disabled,
        }
    }

    pub fn fires_before(self) -> bool {
        matches!(self, Placement::Before | Placement::BeforeAndAfter)
    }

    pub fn fires_after(self) -> bool {
        matches!(self, Placement::After | Placement::BeforeAndAfter)
    }

    pub fn is_disabled(self) -> bool {
        self == Placement::Disabled
    }

    /// The `where` spelling, or `None` for `Disabled`.
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Placement::Before => Some("before"),
            Placement::After => Some("after"),
            Placement::BeforeAndAfter => Some("beforeAndAfter"),
            Placement::Disabled => None,
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("disabled"))
    }
}

/// Raised once, at probe construction, when `where` was not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementWarning {
    pub command: String,
    pub value: String,
}

impl fmt::Display for PlacementWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PROBE_TAG}: ({ACTION_NAME} / {}) invalid value for `where`: {}. \
             Action is switched off!",
            self.command, self.value
        )
    }
}
