//! Rule-driven shard resolver
//!
//! Narrows a predicate tree to the shards that can hold matching rows:
//! - `key = v` selects one shard
//! - `key IN (v, ...)` selects the union of the values' shards
//! - `AND` intersects, `OR` unions
//! - anything else cannot narrow and selects every shard
//!
//! Contradictions such as `key = 1 AND key = 2` (on different shards) select
//! no shard at all.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::planner::{CompareOp, Expr, TableName};

use super::errors::ShardError;
use super::shards::{ShardAssignment, ShardResolution};
use super::vtable::{ShardKey, VirtualTable};
use super::{ShardResolver, ShardingRule};

/// Candidate table indices for one sub-predicate
#[derive(Debug, Clone, PartialEq, Eq)]
enum Candidates {
    All,
    Some(BTreeSet<u32>),
}

impl Candidates {
    fn intersect(self, other: Candidates) -> Candidates {
        match (self, other) {
            (Candidates::All, c) | (c, Candidates::All) => c,
            (Candidates::Some(a), Candidates::Some(b)) => {
                Candidates::Some(a.intersection(&b).copied().collect())
            }
        }
    }

    fn union(self, other: Candidates) -> Candidates {
        match (self, other) {
            (Candidates::All, _) | (_, Candidates::All) => Candidates::All,
            (Candidates::Some(mut a), Candidates::Some(b)) => {
                a.extend(b);
                Candidates::Some(a)
            }
        }
    }
}

/// Resolves shards from the sharding rule's keys and topologies
pub struct Sharder<'a> {
    rule: &'a ShardingRule,
}

impl<'a> Sharder<'a> {
    pub fn new(rule: &'a ShardingRule) -> Self {
        Self { rule }
    }
}

impl ShardResolver for Sharder<'_> {
    fn shard(
        &self,
        table: &TableName,
        filter: Option<&Expr>,
        args: &[Value],
    ) -> Result<ShardResolution, ShardError> {
        let vt = self
            .rule
            .vtable(table.suffix())
            .ok_or_else(|| ShardError::UnknownTable(table.suffix().to_string()))?;

        let candidates = match (vt.shard_key(), filter) {
            (Some(key), Some(expr)) => Evaluator { vt, key, args }.eval(expr)?,
            _ => Candidates::All,
        };

        let topology = vt.topology();
        match candidates {
            Candidates::All => Ok(ShardResolution::full(topology.enumerate())),
            Candidates::Some(indices) => {
                let mut shards = ShardAssignment::new();
                for idx in indices {
                    let rendered = topology
                        .db_of(idx)
                        .and_then(|db| topology.render(db, idx));
                    if let Some((db, tbl)) = rendered {
                        shards.insert(db, tbl);
                    }
                }
                Ok(ShardResolution::narrowed(shards))
            }
        }
    }
}

struct Evaluator<'e> {
    vt: &'e VirtualTable,
    key: &'e ShardKey,
    args: &'e [Value],
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr) -> Result<Candidates, ShardError> {
        match expr {
            Expr::And { left, right } => Ok(self.eval(left)?.intersect(self.eval(right)?)),
            Expr::Or { left, right } => Ok(self.eval(left)?.union(self.eval(right)?)),
            Expr::Compare {
                op: CompareOp::Eq,
                left,
                right,
            } => {
                if self.is_key(left) {
                    self.point(right)
                } else if self.is_key(right) {
                    self.point(left)
                } else {
                    Ok(Candidates::All)
                }
            }
            Expr::In {
                expr,
                list,
                negated: false,
            } if self.is_key(expr) => {
                let mut acc = Candidates::Some(BTreeSet::new());
                for item in list {
                    acc = acc.union(self.point(item)?);
                }
                Ok(acc)
            }
            _ => Ok(Candidates::All),
        }
    }

    fn is_key(&self, expr: &Expr) -> bool {
        expr.as_column().is_some_and(|c| self.key.matches(&c.name))
    }

    /// Candidates for `key = expr`
    fn point(&self, expr: &Expr) -> Result<Candidates, ShardError> {
        let value = match expr {
            Expr::Literal { value } => value,
            Expr::Param { index } => self.args.get(*index).ok_or(ShardError::ParamOutOfRange {
                index: *index,
                len: self.args.len(),
            })?,
            _ => return Ok(Candidates::All),
        };

        let indices = self.vt.topology().table_indices();
        let slot = self
            .key
            .function
            .slot(value, indices.len() as u32)
            .map_err(|value| ShardError::UnsupportedValue {
                column: self.key.column.clone(),
                value,
            })?;

        let mut set = BTreeSet::new();
        if let Some(slot) = slot {
            set.insert(indices[slot as usize]);
        }
        Ok(Candidates::Some(set))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{NamePattern, ShardFunction, Topology};
    use serde_json::json;

    fn rule() -> ShardingRule {
        let topology = Topology::uniform(
            NamePattern::parse("school_${0000}").unwrap(),
            NamePattern::parse("student_${0000}").unwrap(),
            4,
            2,
        )
        .unwrap();
        let mut rule = ShardingRule::new();
        rule.insert(
            VirtualTable::new("student", topology)
                .with_shard_key(ShardKey::new("uid", ShardFunction::Mod)),
        )
        .unwrap();
        rule
    }

    fn shard(rule: &ShardingRule, filter: Option<Expr>, args: &[Value]) -> ShardResolution {
        Sharder::new(rule)
            .shard(&TableName::new("student"), filter.as_ref(), args)
            .unwrap()
    }

    #[test]
    fn test_equality_literal() {
        let rule = rule();
        let res = shard(&rule, Some(Expr::eq(Expr::col("uid"), Expr::lit(json!(13)))), &[]);

        assert!(!res.full_scan);
        assert_eq!(res.assignment.single(), Some(("school_0002", "student_0005")));
    }

    #[test]
    fn test_equality_param_reversed() {
        let rule = rule();
        let res = shard(
            &rule,
            Some(Expr::eq(Expr::param(0), Expr::col("uid"))),
            &[json!(2)],
        );
        assert_eq!(res.assignment.single(), Some(("school_0001", "student_0002")));
    }

    #[test]
    fn test_no_filter_is_full_scan() {
        let rule = rule();
        let res = shard(&rule, None, &[]);

        assert!(res.full_scan);
        assert!(res.assignment.is_full_scan());
        assert_eq!(res.assignment.len(), 8);
    }

    #[test]
    fn test_non_key_predicate_is_full_scan() {
        let rule = rule();
        let res = shard(&rule, Some(Expr::gt(Expr::col("uid"), Expr::lit(json!(3)))), &[]);
        assert!(res.full_scan);
    }

    #[test]
    fn test_in_list_spans_databases() {
        let rule = rule();
        let filter = Expr::in_list(
            Expr::col("uid"),
            vec![Expr::lit(json!(0)), Expr::lit(json!(2)), Expr::lit(json!(4))],
        );
        let res = shard(&rule, Some(filter), &[]);

        assert!(!res.full_scan);
        assert_eq!(res.assignment.database_count(), 3);
    }

    #[test]
    fn test_contradiction_is_empty() {
        let rule = rule();
        let filter = Expr::and(
            Expr::eq(Expr::col("uid"), Expr::lit(json!(1))),
            Expr::eq(Expr::col("uid"), Expr::lit(json!(2))),
        );
        let res = shard(&rule, Some(filter), &[]);

        assert!(!res.full_scan);
        assert!(res.assignment.is_empty());
    }

    #[test]
    fn test_or_with_unnarrowed_side_is_full_scan() {
        let rule = rule();
        let filter = Expr::or(
            Expr::eq(Expr::col("uid"), Expr::lit(json!(1))),
            Expr::eq(Expr::col("name"), Expr::lit(json!("bob"))),
        );
        assert!(shard(&rule, Some(filter), &[]).full_scan);
    }

    #[test]
    fn test_and_with_unnarrowed_side_keeps_key() {
        let rule = rule();
        let filter = Expr::and(
            Expr::eq(Expr::col("name"), Expr::lit(json!("bob"))),
            Expr::eq(Expr::col("uid"), Expr::lit(json!(1))),
        );
        let res = shard(&rule, Some(filter), &[]);
        assert_eq!(res.assignment.len(), 1);
    }

    #[test]
    fn test_param_out_of_range() {
        let rule = rule();
        let err = Sharder::new(&rule)
            .shard(
                &TableName::new("student"),
                Some(&Expr::eq(Expr::col("uid"), Expr::param(3))),
                &[json!(1)],
            )
            .unwrap_err();
        assert_eq!(err, ShardError::ParamOutOfRange { index: 3, len: 1 });
    }

    #[test]
    fn test_unknown_table() {
        let rule = rule();
        let err = Sharder::new(&rule)
            .shard(&TableName::new("teacher"), None, &[])
            .unwrap_err();
        assert_eq!(err, ShardError::UnknownTable("teacher".into()));
    }
}
