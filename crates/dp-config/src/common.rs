//! Options shared by every probe action: timestamp logging and label prefix.

use crate::args::ArgumentCollection;
use crate::error::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Key enabling a timestamp in front of each emitted block.
pub const LOG_TIMESTAMP: &str = "log_timestamp";

/// Key setting a fixed label in front of each emitted block.
pub const PREFIX: &str = "prefix";

/// Timestamp format used by [`CommonOptions::add_prefix`].
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Process-wide defaults for the common options.
///
/// Per-probe arguments override these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeDefaults {
    pub log_timestamp: bool,
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Resolved common options for one probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonOptions {
    pub log_timestamp: bool,
    #[serde(default)]
    pub prefix: Option<String>,
}

impl CommonOptions {
    pub fn from_args(args: &ArgumentCollection, defaults: &ProbeDefaults) -> Result<Self> {
        let log_timestamp = args.parse_bool(LOG_TIMESTAMP, defaults.log_timestamp)?;
        let prefix = match args.get(PREFIX) {
            Some(value) if !value.is_empty() => Some(value.to_string()),
            Some(_) => None,
            None => defaults.prefix.clone(),
        };
        Ok(Self {
            log_timestamp,
            prefix,
        })
    }

    /// Prepend the configured timestamp and label to `text`.
    pub fn add_prefix(&self, text: &str) -> String {
        self.add_prefix_at(Local::now(), text)
    }

    pub fn add_prefix_at(&self, now: DateTime<Local>, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 32);
        if self.log_timestamp {
            out.push('[');
            out.push_str(&now.format(TIMESTAMP_FORMAT).to_string());
            out.push_str("] ");
        }
        if let Some(prefix) = &self.prefix {
            out.push_str(prefix);
            out.push(' ');
        }
        out.push_str(text);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const KNOWN: &[&str] = &[LOG_TIMESTAMP, PREFIX];

    #[test]
    fn test_defaults_apply_when_keys_absent() {
        let args = ArgumentCollection::parse(KNOWN, "").unwrap();
        let defaults = ProbeDefaults {
            log_timestamp: true,
            prefix: Some("svc-a".to_string()),
        };
        let opts = CommonOptions::from_args(&args, &defaults).unwrap();
        assert!(opts.log_timestamp);
        assert_eq!(opts.prefix.as_deref(), Some("svc-a"));
    }

    #[test]
    fn test_empty_prefix_clears_default() {
        let args = ArgumentCollection::parse(KNOWN, "prefix=;log_timestamp=false").unwrap();
        let defaults = ProbeDefaults {
            log_timestamp: true,
            prefix: Some("svc-a".to_string()),
        };
        let opts = CommonOptions::from_args(&args, &defaults).unwrap();
        assert!(!opts.log_timestamp);
        assert_eq!(opts.prefix, None);
    }

    #[test]
    fn test_add_prefix_plain() {
        let opts = CommonOptions::default();
        assert_eq!(opts.add_prefix("hello"), "hello");
    }

    #[test]
    fn test_add_prefix_with_timestamp_and_label() {
        let opts = CommonOptions {
            log_timestamp: true,
            prefix: Some("[worker]".to_string()),
        };
        let now = Local.with_ymd_and_hms(2026, 1, 15, 14, 30, 22).unwrap();
        assert_eq!(
            opts.add_prefix_at(now, "snapshot"),
            "[2026-01-15 14:30:22.000] [worker] snapshot"
        );
    }
}
