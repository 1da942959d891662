//! Gateway configuration file
//!
//! ```json
//! {
//!   "default_db_group": "school",
//!   "tables": [{
//!     "name": "student",
//!     "db_pattern": "school_${0000}",
//!     "table_pattern": "student_${0000}",
//!     "db_count": 2,
//!     "tables_per_db": 4,
//!     "shard_key": { "column": "uid", "function": "mod" },
//!     "allow_full_scan": true
//!   }],
//!   "catalog": [{ "database": "school_0000", "table": "student_0000", "columns": ["uid", "name"] }],
//!   "planner": { "verify_star_layout": false }
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::{MemoryCatalog, TableMetadata};
use crate::planner::PlannerConfig;
use crate::rule::{NamePattern, ShardFunction, ShardKey, ShardingRule, Topology, VirtualTable};

use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Database group for unsharded and table-less statements (required)
    pub default_db_group: String,

    /// Sharded logical tables
    #[serde(default)]
    pub tables: Vec<TableConfig>,

    /// Static column layouts used for `*` expansion
    #[serde(default)]
    pub catalog: Vec<CatalogTableConfig>,

    #[serde(default)]
    pub planner: PlannerConfig,
}

/// One sharded logical table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,
    /// Physical database name pattern, e.g. `school_${0000}`
    pub db_pattern: String,
    /// Physical table name pattern, e.g. `student_${0000}`
    pub table_pattern: String,
    #[serde(default = "default_count")]
    pub db_count: u32,
    #[serde(default = "default_count")]
    pub tables_per_db: u32,
    #[serde(default)]
    pub shard_key: Option<ShardKeyConfig>,
    #[serde(default = "default_allow_full_scan")]
    pub allow_full_scan: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardKeyConfig {
    pub column: String,
    #[serde(default = "default_function")]
    pub function: ShardFunction,
}

/// Column layout of one physical table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogTableConfig {
    pub database: String,
    pub table: String,
    pub columns: Vec<String>,
}

fn default_count() -> u32 {
    1
}
fn default_allow_full_scan() -> bool {
    true
}
fn default_function() -> ShardFunction {
    ShardFunction::Mod
}

impl GatewayConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: GatewayConfig = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> CliResult<()> {
        if self.default_db_group.trim().is_empty() {
            return Err(CliError::config_error("default_db_group must not be empty"));
        }

        let mut names = HashSet::new();
        for (i, table) in self.tables.iter().enumerate() {
            if table.name.trim().is_empty() {
                return Err(CliError::config_error(format!("tables[{}]: name must not be empty", i)));
            }
            if !names.insert(table.name.as_str()) {
                return Err(CliError::config_error(format!(
                    "tables[{}]: table '{}' is configured more than once",
                    i, table.name
                )));
            }
            if table.db_count == 0 || table.tables_per_db == 0 {
                return Err(CliError::config_error(format!(
                    "tables[{}]: db_count and tables_per_db must be > 0",
                    i
                )));
            }
            if let Some(key) = &table.shard_key {
                if key.column.trim().is_empty() {
                    return Err(CliError::config_error(format!(
                        "tables[{}]: shard_key.column must not be empty",
                        i
                    )));
                }
            }
        }

        for (i, entry) in self.catalog.iter().enumerate() {
            if entry.columns.is_empty() {
                return Err(CliError::config_error(format!(
                    "catalog[{}]: {}.{} has no columns",
                    i, entry.database, entry.table
                )));
            }
        }

        Ok(())
    }

    /// Builds the sharding rule from `tables`
    pub fn sharding_rule(&self) -> CliResult<ShardingRule> {
        let mut rule = ShardingRule::new();
        for table in &self.tables {
            let wrap = |e: crate::rule::RuleError| {
                CliError::config_error(format!("table '{}': {}", table.name, e))
            };

            let topology = Topology::uniform(
                NamePattern::parse(&table.db_pattern).map_err(wrap)?,
                NamePattern::parse(&table.table_pattern).map_err(wrap)?,
                table.db_count,
                table.tables_per_db,
            )
            .map_err(wrap)?;

            let mut vt = VirtualTable::new(&table.name, topology).with_full_scan(table.allow_full_scan);
            if let Some(key) = &table.shard_key {
                vt = vt.with_shard_key(ShardKey::new(&key.column, key.function));
            }
            rule.insert(vt).map_err(wrap)?;
        }
        Ok(rule)
    }

    /// Builds the in-memory catalog from `catalog`
    pub fn schema_catalog(&self) -> MemoryCatalog {
        let mut catalog = MemoryCatalog::new();
        for entry in &self.catalog {
            catalog.register(
                &entry.database,
                &entry.table,
                TableMetadata::new(entry.columns.iter().cloned()),
            );
        }
        catalog
    }
}
