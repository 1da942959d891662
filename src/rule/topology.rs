//! Shard topology: which physical tables live in which physical database
//!
//! Coordinates are (database index, table index). Table indices are global
//! across the logical table, so `student_0005` is the same shard no matter
//! which database holds it.

use std::collections::BTreeMap;

use regex::Regex;

use super::errors::{RuleError, RuleResult};
use super::shards::ShardAssignment;

/// Upper bound on the shards one uniform topology may name
pub const MAX_TOPOLOGY_SHARDS: u32 = 1 << 20;

const PLACEHOLDER_PATTERN: &str = r"^(?P<prefix>[^$]*)\$\{(?P<width>0+)\}(?P<suffix>[^$]*)$";

/// Physical name template such as `student_${0000}` or plain `school`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    prefix: String,
    /// Zero-padding width of the index placeholder; `None` for a literal name
    width: Option<usize>,
    suffix: String,
}

impl NamePattern {
    /// Parses `prefix${0000}suffix`; a string without `${` is a literal name
    pub fn parse(pattern: &str) -> RuleResult<Self> {
        if pattern.is_empty() {
            return Err(RuleError::InvalidPattern(pattern.to_string()));
        }
        if !pattern.contains('$') {
            return Ok(Self::literal(pattern));
        }

        let re = Regex::new(PLACEHOLDER_PATTERN)
            .map_err(|_| RuleError::InvalidPattern(pattern.to_string()))?;
        let caps = re
            .captures(pattern)
            .ok_or_else(|| RuleError::InvalidPattern(pattern.to_string()))?;

        Ok(Self {
            prefix: caps["prefix"].to_string(),
            width: Some(caps["width"].len()),
            suffix: caps["suffix"].to_string(),
        })
    }

    pub fn literal(name: impl Into<String>) -> Self {
        Self {
            prefix: name.into(),
            width: None,
            suffix: String::new(),
        }
    }

    pub fn is_literal(&self) -> bool {
        self.width.is_none()
    }

    /// Renders the physical name for `index`
    pub fn render(&self, index: u32) -> String {
        match self.width {
            Some(width) => format!("{}{:0width$}{}", self.prefix, index, self.suffix, width = width),
            None => self.prefix.clone(),
        }
    }
}

/// Cross product of database and table shard coordinates for one logical table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    db_pattern: NamePattern,
    table_pattern: NamePattern,
    /// database index -> ordered table indices
    layout: BTreeMap<u32, Vec<u32>>,
}

impl Topology {
    /// Creates an empty topology; add shards with [`Topology::with_tables`]
    pub fn new(db_pattern: NamePattern, table_pattern: NamePattern) -> Self {
        Self {
            db_pattern,
            table_pattern,
            layout: BTreeMap::new(),
        }
    }

    /// `db_count` databases, each holding `tables_per_db` consecutive tables
    pub fn uniform(
        db_pattern: NamePattern,
        table_pattern: NamePattern,
        db_count: u32,
        tables_per_db: u32,
    ) -> RuleResult<Self> {
        if db_count > 1 && db_pattern.is_literal() {
            return Err(RuleError::PatternTooNarrow {
                pattern: db_pattern.render(0),
                count: db_count,
            });
        }
        let total = db_count
            .checked_mul(tables_per_db)
            .filter(|total| *total <= MAX_TOPOLOGY_SHARDS)
            .ok_or(RuleError::TopologyTooLarge {
                db_count,
                tables_per_db,
                max: MAX_TOPOLOGY_SHARDS,
            })?;
        if total > 1 && table_pattern.is_literal() {
            return Err(RuleError::PatternTooNarrow {
                pattern: table_pattern.render(0),
                count: total,
            });
        }

        let mut topology = Self::new(db_pattern, table_pattern);
        for db in 0..db_count {
            // db < db_count, so this stays within `total`
            let start = db * tables_per_db;
            topology = topology.with_tables(db, start..start + tables_per_db);
        }
        Ok(topology)
    }

    /// Assigns table indices to a database index
    pub fn with_tables(mut self, db_idx: u32, tables: impl IntoIterator<Item = u32>) -> Self {
        let entry = self.layout.entry(db_idx).or_default();
        entry.extend(tables);
        entry.sort_unstable();
        entry.dedup();
        self
    }

    /// Renders a coordinate to concrete (database, table) names.
    ///
    /// Returns `None` if the coordinate is not part of the topology.
    pub fn render(&self, db_idx: u32, table_idx: u32) -> Option<(String, String)> {
        let tables = self.layout.get(&db_idx)?;
        if tables.binary_search(&table_idx).is_err() {
            return None;
        }
        Some((
            self.db_pattern.render(db_idx),
            self.table_pattern.render(table_idx),
        ))
    }

    /// Visits every coordinate in (database, table) order until `visit` returns false
    pub fn each<F>(&self, mut visit: F)
    where
        F: FnMut(u32, u32) -> bool,
    {
        for (db, tables) in &self.layout {
            for table in tables {
                if !visit(*db, *table) {
                    return;
                }
            }
        }
    }

    /// Database index holding `table_idx`
    pub fn db_of(&self, table_idx: u32) -> Option<u32> {
        self.layout
            .iter()
            .find(|(_, tables)| tables.binary_search(&table_idx).is_ok())
            .map(|(db, _)| *db)
    }

    /// All table indices in ascending order
    pub fn table_indices(&self) -> Vec<u32> {
        let mut all: Vec<u32> = self.layout.values().flatten().copied().collect();
        all.sort_unstable();
        all
    }

    pub fn table_count(&self) -> usize {
        self.layout.values().map(Vec::len).sum()
    }

    pub fn database_count(&self) -> usize {
        self.layout.values().filter(|t| !t.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.table_count() == 0
    }

    /// Every shard of the topology, flagged as a full scan
    pub fn enumerate(&self) -> ShardAssignment {
        let mut shards = ShardAssignment::new();
        self.each(|db, table| {
            if let Some((d, t)) = self.render(db, table) {
                shards.insert(d, t);
            }
            true
        });
        shards.mark_full_scan();
        shards
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student_topology() -> Topology {
        Topology::uniform(
            NamePattern::parse("school_${0000}").unwrap(),
            NamePattern::parse("student_${0000}").unwrap(),
            2,
            4,
        )
        .unwrap()
    }

    #[test]
    fn test_pattern_parse() {
        let p = NamePattern::parse("student_${0000}").unwrap();
        assert_eq!(p.render(7), "student_0007");

        let p = NamePattern::parse("t${00}_bak").unwrap();
        assert_eq!(p.render(3), "t03_bak");

        let p = NamePattern::parse("school").unwrap();
        assert!(p.is_literal());
        assert_eq!(p.render(5), "school");
    }

    #[test]
    fn test_pattern_rejects_garbage() {
        assert!(NamePattern::parse("student_${abc}").is_err());
        assert!(NamePattern::parse("a${0}b${0}").is_err());
        assert!(NamePattern::parse("").is_err());
    }

    #[test]
    fn test_render_and_membership() {
        let topology = student_topology();
        assert_eq!(
            topology.render(0, 0),
            Some(("school_0000".into(), "student_0000".into()))
        );
        assert_eq!(
            topology.render(1, 5),
            Some(("school_0001".into(), "student_0005".into()))
        );
        // table 5 lives in database 1, not 0
        assert_eq!(topology.render(0, 5), None);
        assert_eq!(topology.render(9, 0), None);
    }

    #[test]
    fn test_each_visits_in_order_and_stops() {
        let topology = student_topology();
        let mut seen = Vec::new();
        topology.each(|db, tb| {
            seen.push((db, tb));
            seen.len() < 3
        });
        assert_eq!(seen, vec![(0, 0), (0, 1), (0, 2)]);
    }

    #[test]
    fn test_counts_and_lookup() {
        let topology = student_topology();
        assert_eq!(topology.table_count(), 8);
        assert_eq!(topology.database_count(), 2);
        assert_eq!(topology.db_of(6), Some(1));
        assert_eq!(topology.db_of(8), None);
    }

    #[test]
    fn test_enumerate_is_full_scan() {
        let shards = student_topology().enumerate();
        assert!(shards.is_full_scan());
        assert_eq!(shards.len(), 8);
        assert_eq!(shards.database_count(), 2);
    }

    #[test]
    fn test_literal_pattern_too_narrow() {
        let err = Topology::uniform(
            NamePattern::literal("school"),
            NamePattern::parse("student_${00}").unwrap(),
            2,
            2,
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::PatternTooNarrow { count: 2, .. }));
    }

    #[test]
    fn test_oversized_topology_rejected() {
        let err = Topology::uniform(
            NamePattern::parse("school_${0000}").unwrap(),
            NamePattern::parse("student_${0000}").unwrap(),
            65536,
            65536,
        )
        .unwrap_err();
        assert_eq!(
            err,
            RuleError::TopologyTooLarge {
                db_count: 65536,
                tables_per_db: 65536,
                max: MAX_TOPOLOGY_SHARDS,
            }
        );

        let err = Topology::uniform(
            NamePattern::parse("school_${0000}").unwrap(),
            NamePattern::parse("student_${0000}").unwrap(),
            1024,
            1025,
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::TopologyTooLarge { .. }));
    }
}
