//! SELECT statement classification
//!
//! Decides whether a single-source SELECT needs shard computation at all.

use crate::rule::ShardingRule;

use super::ast::SelectStatement;

/// Schemas that are never sharded; matched case-insensitively
const SYSTEM_SCHEMAS: [&str; 2] = ["mysql", "information_schema"];

/// Outcome of classifying a SELECT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectClass {
    /// Subquery, join or multi-source FROM
    Unsupported,
    /// No FROM clause, e.g. `SELECT 1`
    BypassEmpty,
    /// Access to a system catalog schema
    BypassSystemSchema,
    /// Table without a sharding rule
    BypassUnsharded,
    /// Table with a sharding rule
    Sharded,
}

impl SelectClass {
    /// Returns true if the statement needs no shard computation
    pub fn is_bypass(&self) -> bool {
        matches!(
            self,
            SelectClass::BypassEmpty | SelectClass::BypassSystemSchema | SelectClass::BypassUnsharded
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectClass::Unsupported => "unsupported",
            SelectClass::BypassEmpty => "bypass_empty",
            SelectClass::BypassSystemSchema => "bypass_system_schema",
            SelectClass::BypassUnsharded => "bypass_unsharded",
            SelectClass::Sharded => "sharded",
        }
    }
}

/// Returns true if `schema` names a system catalog
pub fn is_system_schema(schema: &str) -> bool {
    SYSTEM_SCHEMAS.iter().any(|s| s.eq_ignore_ascii_case(schema))
}

/// Classifies a SELECT against the sharding rule
pub fn classify(rule: &ShardingRule, stmt: &SelectStatement) -> SelectClass {
    match stmt.from.as_slice() {
        [] => SelectClass::BypassEmpty,
        [source] => {
            let Some(table) = source.table_name() else {
                return SelectClass::Unsupported;
            };
            if table.prefix().is_some_and(is_system_schema) {
                return SelectClass::BypassSystemSchema;
            }
            if rule.has(table.suffix()) {
                SelectClass::Sharded
            } else {
                SelectClass::BypassUnsharded
            }
        }
        _ => SelectClass::Unsupported,
    }
}
