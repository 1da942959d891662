//! Shard assignment: physical database -> physical tables relevant to a query

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Ordered mapping of database name to ordered physical table names.
///
/// Ordered maps keep plans deterministic: the same statement and arguments
/// always produce the same child order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShardAssignment {
    tables: BTreeMap<String, Vec<String>>,
    /// Every shard of the logical table is included
    full_scan: bool,
}

impl ShardAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a physical table under its database, ignoring duplicates
    pub fn insert(&mut self, database: impl Into<String>, table: impl Into<String>) {
        let tables = self.tables.entry(database.into()).or_default();
        let table = table.into();
        if !tables.contains(&table) {
            tables.push(table);
        }
    }

    pub fn mark_full_scan(&mut self) {
        self.full_scan = true;
    }

    /// No shard matched the predicate
    pub fn is_empty(&self) -> bool {
        !self.full_scan && self.tables.values().all(Vec::is_empty)
    }

    pub fn is_full_scan(&self) -> bool {
        self.full_scan
    }

    /// Number of (database, table) pairs
    pub fn len(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn database_count(&self) -> usize {
        self.tables.values().filter(|t| !t.is_empty()).count()
    }

    /// The only (database, table) pair, if there is exactly one
    pub fn single(&self) -> Option<(&str, &str)> {
        if self.len() != 1 {
            return None;
        }
        self.iter()
            .find_map(|(db, tables)| tables.first().map(|t| (db, t.as_str())))
    }

    /// Iterates (database, tables) in database order, skipping empty entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.tables
            .iter()
            .filter(|(_, tables)| !tables.is_empty())
            .map(|(db, tables)| (db.as_str(), tables.as_slice()))
    }

    pub fn databases(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(db, _)| db)
    }
}

impl fmt::Display for ShardAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (db, tables)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:[{}]", db, tables.join(","))?;
        }
        write!(f, "}}")
    }
}

/// Output of a shard resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardResolution {
    pub assignment: ShardAssignment,
    /// The predicate could not narrow the search
    pub full_scan: bool,
}

impl ShardResolution {
    pub fn narrowed(assignment: ShardAssignment) -> Self {
        Self {
            assignment,
            full_scan: false,
        }
    }

    pub fn full(assignment: ShardAssignment) -> Self {
        Self {
            assignment,
            full_scan: true,
        }
    }
}
