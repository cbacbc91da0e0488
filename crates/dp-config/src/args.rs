//! Flat `key=value` argument collection.
//!
//! Probe arguments arrive as a single string, e.g.
//! `cmd=VM.status;where=beforeAndAfter;limit_output_lines=20`. Pairs are
//! separated by `;`, surrounding whitespace is ignored, and a value may itself
//! contain `=` (only the first one splits).

use crate::error::{ConfigError, Result};
use std::collections::BTreeMap;

/// Separator between `key=value` pairs.
pub const PAIR_SEPARATOR: char = ';';

/// Validated map of recognized arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentCollection {
    values: BTreeMap<String, String>,
}

impl ArgumentCollection {
    /// Parse `raw`, rejecting keys not listed in `known`.
    pub fn parse(known: &[&str], raw: &str) -> Result<Self> {
        let mut values = BTreeMap::new();

        for pair in raw.split(PAIR_SEPARATOR).map(str::trim) {
            if pair.is_empty() {
                continue;
            }

            let (key, value) = pair.split_once('=').ok_or_else(|| ConfigError::MalformedPair {
                pair: pair.to_string(),
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::MalformedPair {
                    pair: pair.to_string(),
                });
            }

            if !known.contains(&key) {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                    known: known.join(", "),
                });
            }

            if values
                .insert(key.to_string(), value.trim().to_string())
                .is_some()
            {
                return Err(ConfigError::DuplicateKey {
                    key: key.to_string(),
                });
            }
        }

        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_or_default<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Fetch a key that must be present and non-empty.
    pub fn require(&self, key: &str) -> Result<&str> {
        match self.get(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ConfigError::MissingKey {
                key: key.to_string(),
            }),
        }
    }

    pub fn parse_int(&self, key: &str, default: i64) -> Result<i64> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidInt {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Accepts `true`/`false`, `yes`/`no`, `on`/`off` and `1`/`0`, any case.
    pub fn parse_bool(&self, key: &str, default: bool) -> Result<bool> {
        let Some(value) = self.get(key) else {
            return Ok(default);
        };
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(ConfigError::InvalidBool {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
