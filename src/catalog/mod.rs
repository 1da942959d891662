//! Schema catalog subsystem
//!
//! Supplies ordered column metadata for physical tables, used to expand
//! `SELECT *`. Caching is the catalog's concern; the planner asks every time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::planner::CompileContext;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog lookup failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Physical database is not known to the catalog
    #[error("unknown database '{0}'")]
    UnknownDatabase(String),

    /// Backend failure (connection, timeout, ...)
    #[error("catalog backend failed: {0}")]
    Backend(String),
}

/// Ordered column names of one physical table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableMetadata {
    pub columns: Vec<String>,
}

impl TableMetadata {
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Column metadata source.
///
/// Tables the catalog does not know are simply absent from the returned map.
pub trait SchemaCatalog: Send + Sync {
    fn load(
        &self,
        ctx: &CompileContext,
        database: &str,
        tables: &[String],
    ) -> CatalogResult<HashMap<String, TableMetadata>>;
}

/// In-memory catalog populated from configuration or tests
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    /// (database, table) -> metadata
    tables: HashMap<(String, String), TableMetadata>,
    lookups: AtomicU64,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the layout of a physical table
    pub fn register(
        &mut self,
        database: impl Into<String>,
        table: impl Into<String>,
        metadata: TableMetadata,
    ) {
        self.tables.insert((database.into(), table.into()), metadata);
    }

    pub fn with_table(
        mut self,
        database: impl Into<String>,
        table: impl Into<String>,
        metadata: TableMetadata,
    ) -> Self {
        self.register(database, table, metadata);
        self
    }

    pub fn get(&self, database: &str, table: &str) -> Option<&TableMetadata> {
        self.tables.get(&(database.to_string(), table.to_string()))
    }

    /// Number of `load` calls served so far
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl SchemaCatalog for MemoryCatalog {
    fn load(
        &self,
        _ctx: &CompileContext,
        database: &str,
        tables: &[String],
    ) -> CatalogResult<HashMap<String, TableMetadata>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);

        if !self.tables.keys().any(|(db, _)| db == database) {
            return Err(CatalogError::UnknownDatabase(database.to_string()));
        }

        Ok(tables
            .iter()
            .filter_map(|t| self.get(database, t).map(|m| (t.clone(), m.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_table("school_0000", "student_0000", TableMetadata::new(["uid", "name"]))
            .with_table("school_0000", "student_0001", TableMetadata::new(["uid", "name"]))
    }

    #[test]
    fn test_load_known_tables() {
        let catalog = catalog();
        let ctx = CompileContext::new("school");
        let found = catalog
            .load(&ctx, "school_0000", &["student_0001".to_string()])
            .unwrap();

        assert_eq!(found["student_0001"].columns, vec!["uid", "name"]);
        assert_eq!(catalog.lookups(), 1);
    }

    #[test]
    fn test_missing_table_is_absent() {
        let catalog = catalog();
        let ctx = CompileContext::new("school");
        let found = catalog
            .load(&ctx, "school_0000", &["student_0009".to_string()])
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_unknown_database() {
        let catalog = catalog();
        let ctx = CompileContext::new("school");
        let err = catalog
            .load(&ctx, "school_0007", &["student_0000".to_string()])
            .unwrap_err();
        assert_eq!(err, CatalogError::UnknownDatabase("school_0007".into()));
    }
}
