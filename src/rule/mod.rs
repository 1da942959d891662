//! Sharding rule subsystem
//!
//! Owns the read-only sharding configuration the planner consults:
//! which logical tables are sharded, their topology, shard key and
//! full-scan policy. Also provides the default rule-driven resolver.

mod errors;
mod sharder;
mod shards;
mod topology;
mod vtable;

use std::collections::HashMap;

use serde_json::Value;

use crate::planner::{Expr, TableName};

pub use errors::{RuleError, RuleResult, ShardError};
pub use sharder::Sharder;
pub use shards::{ShardAssignment, ShardResolution};
pub use topology::{NamePattern, Topology, MAX_TOPOLOGY_SHARDS};
pub use vtable::{ShardFunction, ShardKey, VirtualTable};

/// Computes the shards a table reference must be read from.
///
/// Implementations are shared by concurrent compilations and must be
/// read-only.
pub trait ShardResolver: Send + Sync {
    fn shard(
        &self,
        table: &TableName,
        filter: Option<&Expr>,
        args: &[Value],
    ) -> Result<ShardResolution, ShardError>;
}

/// Registered sharding rules, keyed by logical table name
#[derive(Debug, Clone, Default)]
pub struct ShardingRule {
    tables: HashMap<String, VirtualTable>,
}

impl ShardingRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a virtual table; names must be unique and topologies non-empty
    pub fn insert(&mut self, vt: VirtualTable) -> RuleResult<()> {
        if vt.topology().is_empty() {
            return Err(RuleError::EmptyTopology(vt.name().to_string()));
        }
        if self.tables.contains_key(vt.name()) {
            return Err(RuleError::DuplicateTable(vt.name().to_string()));
        }
        self.tables.insert(vt.name().to_string(), vt);
        Ok(())
    }

    /// Returns true if `table` has a sharding rule
    pub fn has(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn vtable(&self, table: &str) -> Option<&VirtualTable> {
        self.tables.get(table)
    }

    /// Table names in sorted order
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology() -> Topology {
        Topology::uniform(
            NamePattern::parse("db_${00}").unwrap(),
            NamePattern::parse("t_${00}").unwrap(),
            2,
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut rule = ShardingRule::new();
        rule.insert(VirtualTable::new("student", topology())).unwrap();

        assert!(rule.has("student"));
        assert!(!rule.has("teacher"));
        assert_eq!(rule.vtable("student").unwrap().topology().table_count(), 4);
        assert_eq!(rule.len(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut rule = ShardingRule::new();
        rule.insert(VirtualTable::new("student", topology())).unwrap();
        let err = rule
            .insert(VirtualTable::new("student", topology()))
            .unwrap_err();
        assert_eq!(err, RuleError::DuplicateTable("student".into()));
    }

    #[test]
    fn test_empty_topology_rejected() {
        let mut rule = ShardingRule::new();
        let empty = Topology::new(NamePattern::literal("db"), NamePattern::literal("t"));
        let err = rule.insert(VirtualTable::new("student", empty)).unwrap_err();
        assert_eq!(err, RuleError::EmptyTopology("student".into()));
    }

    #[test]
    fn test_table_names_sorted() {
        let mut rule = ShardingRule::new();
        rule.insert(VirtualTable::new("zeta", topology())).unwrap();
        rule.insert(VirtualTable::new("alpha", topology())).unwrap();
        assert_eq!(rule.table_names(), vec!["alpha", "zeta"]);
    }
}
