//! Virtual (logical) table definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::topology::Topology;

/// Maps a shard key value onto `[0, modulus)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardFunction {
    /// Integer remainder; numeric strings are accepted
    Mod,
    /// CRC32 of the value's text form, then remainder
    Hash,
}

impl ShardFunction {
    /// Computes the slot for `value`.
    ///
    /// `Ok(None)` means the value can never match a row (SQL NULL).
    pub fn slot(&self, value: &Value, modulus: u32) -> Result<Option<u32>, String> {
        if modulus == 0 {
            return Err("no shards to map onto".to_string());
        }
        match value {
            Value::Null => Ok(None),
            Value::Array(_) | Value::Object(_) => Err(value.to_string()),
            _ => match self {
                ShardFunction::Mod => {
                    let n = integer_of(value).ok_or_else(|| value.to_string())?;
                    Ok(Some(n.rem_euclid(modulus as i64) as u32))
                }
                ShardFunction::Hash => {
                    let text = text_of(value);
                    Ok(Some(crc32fast::hash(text.as_bytes()) % modulus))
                }
            },
        }
    }
}

fn integer_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Shard key column and the function applied to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardKey {
    pub column: String,
    pub function: ShardFunction,
}

impl ShardKey {
    pub fn new(column: impl Into<String>, function: ShardFunction) -> Self {
        Self {
            column: column.into(),
            function,
        }
    }

    /// Case-insensitive column match, as column names are in MySQL
    pub fn matches(&self, column: &str) -> bool {
        self.column.eq_ignore_ascii_case(column)
    }
}

/// A logical table spread over physical shards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualTable {
    name: String,
    topology: Topology,
    shard_key: Option<ShardKey>,
    allow_full_scan: bool,
}

impl VirtualTable {
    /// New table; full scans are allowed until [`VirtualTable::deny_full_scan`]
    pub fn new(name: impl Into<String>, topology: Topology) -> Self {
        Self {
            name: name.into(),
            topology,
            shard_key: None,
            allow_full_scan: true,
        }
    }

    pub fn with_shard_key(mut self, key: ShardKey) -> Self {
        self.shard_key = Some(key);
        self
    }

    pub fn with_full_scan(mut self, allow: bool) -> Self {
        self.allow_full_scan = allow;
        self
    }

    pub fn deny_full_scan(self) -> Self {
        self.with_full_scan(false)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn shard_key(&self) -> Option<&ShardKey> {
        self.shard_key.as_ref()
    }

    /// Whether an unrestricted fan-out over every shard is permitted
    pub fn allow_full_scan(&self) -> bool {
        self.allow_full_scan
    }
}
