//! `SELECT *` expansion and the uniform-layout guard
//!
//! A compilation expands `*` once, from one representative shard, and every
//! other shard of the same compilation is assumed to share that layout.
//! `SchemaGuard` turns the assumption into a check.

use std::collections::HashSet;

use crate::catalog::SchemaCatalog;
use crate::observability::{log_event, Event};

use super::ast::{SelectElement, SelectStatement};
use super::context::CompileContext;
use super::errors::{PlannerError, PlannerResult};
use super::plan::PlanNode;

/// Returns true if the select list is a lone `*` or `t.*`
pub fn needs_expansion(stmt: &SelectStatement) -> bool {
    matches!(stmt.select.as_slice(), [SelectElement::All { .. }])
}

/// Replaces a lone `*` with the ordered columns of `database.table`.
///
/// Returns whether the select list was replaced. A missing or empty catalog
/// entry is fatal.
pub fn expand_star(
    ctx: &CompileContext,
    catalog: &dyn SchemaCatalog,
    stmt: &mut SelectStatement,
    database: &str,
    table: &str,
) -> PlannerResult<bool> {
    if !needs_expansion(stmt) {
        return Ok(false);
    }

    let table = if table.is_empty() {
        stmt.first_table().map(|t| t.suffix().to_string()).unwrap_or_default()
    } else {
        table.to_string()
    };

    let mut found = catalog
        .load(ctx, database, std::slice::from_ref(&table))
        .map_err(|e| PlannerError::catalog_failed(database, &table, e))?;

    let metadata = match found.remove(&table) {
        Some(m) if !m.is_empty() => m,
        _ => return Err(PlannerError::metadata_unavailable(database, &table)),
    };

    let count = metadata.columns.len().to_string();
    stmt.select = metadata
        .columns
        .into_iter()
        .map(SelectElement::column)
        .collect();

    let compile_id = ctx.compile_id().to_string();
    log_event(
        Event::StarExpanded,
        &[
            ("columns", &count),
            ("compile_id", &compile_id),
            ("database", database),
            ("table", &table),
        ],
    );
    Ok(true)
}

/// Verifies that every physical table read by a plan has the column layout
/// its star-expanded select list was built from.
pub struct SchemaGuard<'a> {
    catalog: &'a dyn SchemaCatalog,
}

impl<'a> SchemaGuard<'a> {
    pub fn new(catalog: &'a dyn SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Checks every star-expanded Scan in `plan`. Plans without expansion
    /// pass without catalog lookups.
    pub fn verify(&self, ctx: &CompileContext, plan: &PlanNode) -> PlannerResult<()> {
        let mut checked: HashSet<(&str, &str)> = HashSet::new();

        for scan in plan.scans() {
            if !scan.star_expanded {
                continue;
            }
            let expected = expanded_columns(&scan.stmt);

            let pending: Vec<String> = scan
                .tables
                .iter()
                .filter(|t| !checked.contains(&(scan.database.as_str(), t.as_str())))
                .cloned()
                .collect();
            if pending.is_empty() {
                continue;
            }

            let found = self
                .catalog
                .load(ctx, &scan.database, &pending)
                .map_err(|e| PlannerError::catalog_failed(&scan.database, &pending[0], e))?;

            for table in &pending {
                let actual: Vec<&str> = match found.get(table) {
                    Some(m) => m.columns.iter().map(String::as_str).collect(),
                    None => {
                        return Err(drift(ctx, &scan.database, table, "table has no metadata"));
                    }
                };
                if actual != expected {
                    let reason = format!(
                        "expected [{}], found [{}]",
                        expected.join(", "),
                        actual.join(", ")
                    );
                    return Err(drift(ctx, &scan.database, table, reason));
                }
            }

            for table in &scan.tables {
                checked.insert((scan.database.as_str(), table.as_str()));
            }
        }

        Ok(())
    }
}

fn expanded_columns(stmt: &SelectStatement) -> Vec<&str> {
    stmt.select
        .iter()
        .filter_map(|e| match e {
            SelectElement::Column { column, .. } => Some(column.name.as_str()),
            _ => None,
        })
        .collect()
}

fn drift(ctx: &CompileContext, database: &str, table: &str, reason: impl Into<String>) -> PlannerError {
    let err = PlannerError::schema_drift(database, table, reason);
    let compile_id = ctx.compile_id().to_string();
    log_event(
        Event::SchemaDriftDetected,
        &[
            ("compile_id", &compile_id),
            ("database", database),
            ("message", err.message()),
            ("table", table),
        ],
    );
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MemoryCatalog, TableMetadata};
    use crate::planner::ast::TableName;
    use crate::planner::plan::ScanPlan;
    use crate::planner::PlannerErrorCode;
    use std::sync::Arc;

    fn star() -> SelectStatement {
        SelectStatement::new(vec![SelectElement::star()]).from_table(TableName::new("student"))
    }

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_table("school_0", "student_0", TableMetadata::new(["uid", "name", "age"]))
            .with_table("school_0", "student_1", TableMetadata::new(["uid", "name", "age"]))
            .with_table("school_1", "student_2", TableMetadata::new(["uid", "name"]))
            .with_table("school_1", "student_3", TableMetadata::new(Vec::<String>::new()))
    }

    #[test]
    fn test_expand_star() {
        let catalog = catalog();
        let ctx = CompileContext::new("school");
        let mut stmt = star();

        let expanded = expand_star(&ctx, &catalog, &mut stmt, "school_0", "student_0").unwrap();

        assert!(expanded);
        assert_eq!(
            stmt.select,
            vec![
                SelectElement::column("uid"),
                SelectElement::column("name"),
                SelectElement::column("age"),
            ]
        );
        assert_eq!(catalog.lookups(), 1);
    }

    #[test]
    fn test_explicit_columns_untouched() {
        let catalog = catalog();
        let ctx = CompileContext::new("school");
        let mut stmt = SelectStatement::new(vec![SelectElement::column("uid")]);

        let expanded = expand_star(&ctx, &catalog, &mut stmt, "school_0", "student_0").unwrap();

        assert!(!expanded);
        assert_eq!(catalog.lookups(), 0);
    }

    #[test]
    fn test_missing_metadata() {
        let catalog = catalog();
        let ctx = CompileContext::new("school");

        let err = expand_star(&ctx, &catalog, &mut star(), "school_0", "student_9").unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::MetadataUnavailable);
        assert_eq!(
            err.message(),
            "can not get metadata for db:school_0 and table:student_9"
        );

        let err = expand_star(&ctx, &catalog, &mut star(), "school_1", "student_3").unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::MetadataUnavailable);
    }

    #[test]
    fn test_catalog_failure_wrapped() {
        let catalog = catalog();
        let ctx = CompileContext::new("school");
        let err = expand_star(&ctx, &catalog, &mut star(), "nowhere", "student_0").unwrap_err();

        assert_eq!(err.code(), PlannerErrorCode::MetadataUnavailable);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_empty_table_falls_back_to_from() {
        let catalog = MemoryCatalog::new()
            .with_table("school", "student", TableMetadata::new(["uid"]));
        let ctx = CompileContext::new("school");
        let mut stmt = star();

        expand_star(&ctx, &catalog, &mut stmt, "school", "").unwrap();
        assert_eq!(stmt.select, vec![SelectElement::column("uid")]);
    }

    fn expanded_plan(database: &str, tables: &[&str]) -> PlanNode {
        let stmt = SelectStatement::new(vec![
            SelectElement::column("uid"),
            SelectElement::column("name"),
            SelectElement::column("age"),
        ]);
        PlanNode::Scan(
            ScanPlan::new(
                database,
                tables.iter().map(|t| t.to_string()).collect(),
                Arc::new(stmt),
                Arc::new(Vec::new()),
            )
            .with_star_expanded(true),
        )
    }

    #[test]
    fn test_guard_accepts_uniform_layout() {
        let catalog = catalog();
        let ctx = CompileContext::new("school");
        let plan = PlanNode::union(vec![expanded_plan("school_0", &["student_0", "student_1"])]);

        SchemaGuard::new(&catalog).verify(&ctx, &plan).unwrap();
    }

    #[test]
    fn test_guard_detects_drift() {
        let catalog = catalog();
        let ctx = CompileContext::new("school");
        let plan = PlanNode::union(vec![
            expanded_plan("school_0", &["student_0"]),
            expanded_plan("school_1", &["student_2"]),
        ]);

        let err = SchemaGuard::new(&catalog).verify(&ctx, &plan).unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::SchemaDrift);
        assert_eq!(err.table(), Some("student_2"));
    }

    #[test]
    fn test_guard_skips_unexpanded_scans() {
        let catalog = catalog();
        let ctx = CompileContext::new("school");
        let plan = PlanNode::Scan(ScanPlan::new(
            "school_1",
            vec!["student_2".into()],
            Arc::new(star()),
            Arc::new(Vec::new()),
        ));

        SchemaGuard::new(&catalog).verify(&ctx, &plan).unwrap();
        assert_eq!(catalog.lookups(), 0);
    }
}
