//! Sharding rule and resolver errors

use thiserror::Error;

/// Result type for rule construction
pub type RuleResult<T> = Result<T, RuleError>;

/// Errors raised while building a sharding rule from configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// Name pattern is not `literal` or `prefix${000}suffix`
    #[error("invalid name pattern '{0}'")]
    InvalidPattern(String),

    /// Literal pattern used for more than one shard
    #[error("pattern '{pattern}' has no index placeholder but must name {count} shards")]
    PatternTooNarrow { pattern: String, count: u32 },

    /// Uniform topology naming more shards than `u32` indices or the shard cap allow
    #[error("{db_count} databases x {tables_per_db} tables exceeds the limit of {max} shards")]
    TopologyTooLarge {
        db_count: u32,
        tables_per_db: u32,
        max: u32,
    },

    /// Topology with no coordinates
    #[error("topology of '{0}' has no shards")]
    EmptyTopology(String),

    /// Same logical table configured twice
    #[error("table '{0}' is configured more than once")]
    DuplicateTable(String),
}

/// Errors raised by a shard resolver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShardError {
    /// Table has no sharding rule
    #[error("no sharding rule for table '{0}'")]
    UnknownTable(String),

    /// Placeholder points past the bound argument list
    #[error("placeholder ?{index} is out of range ({len} arguments bound)")]
    ParamOutOfRange { index: usize, len: usize },

    /// Shard key compared against a value the shard function cannot map
    #[error("value {value} of shard key '{column}' cannot be mapped to a shard")]
    UnsupportedValue { column: String, value: String },

    /// Failure reported by an external resolver implementation
    #[error("{0}")]
    Backend(String),
}
