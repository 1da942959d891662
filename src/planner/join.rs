//! Two-way join compilation
//!
//! Both sides must live in one physical database. A side without a sharding
//! rule has no database affinity beyond its schema qualifier; a sharded side
//! is pinned to the single database its shards resolve to.

use std::sync::Arc;

use serde_json::Value;

use super::ast::{SelectStatement, TableSource};
use super::context::CompileContext;
use super::errors::{PlannerError, PlannerResult};
use super::limit::LimitWindow;
use super::plan::{JoinPlan, JoinTable, PlanNode};
use super::registry::OptimizeState;
use super::select::deny_full_scan;

/// Resolved join side
#[derive(Debug)]
struct Side {
    database: Option<String>,
    table: JoinTable,
}

/// Compiles the single join of `stmt` into a Join leaf
pub(super) fn compile_join(
    ctx: &CompileContext,
    state: &OptimizeState<'_>,
    stmt: SelectStatement,
    args: Vec<Value>,
    window: LimitWindow,
) -> PlannerResult<PlanNode> {
    let join = stmt
        .join()
        .ok_or_else(|| PlannerError::unsupported(ctx.sql()))?;

    let left = resolve_side(ctx, state, &join.left, &args)?;
    let right = resolve_side(ctx, state, &join.right, &args)?;

    let database = match (left.database, right.database) {
        (Some(l), Some(r)) if l != r => {
            return Err(PlannerError::cross_database_join(format!(
                "join of '{}' and '{}' spans databases {} and {}",
                left.table.alias, right.table.alias, l, r
            )));
        }
        (l, r) => l.or(r),
    };

    let join_type = join.join_type;
    let on = join.on.clone();
    state.metrics.increment_join();

    Ok(PlanNode::Join(JoinPlan {
        database,
        left: left.table,
        right: right.table,
        join_type,
        on,
        stmt: Arc::new(stmt),
        args: Arc::new(args),
        window,
    }))
}

fn resolve_side(
    ctx: &CompileContext,
    state: &OptimizeState<'_>,
    source: &TableSource,
    args: &[Value],
) -> PlannerResult<Side> {
    let table = source.table_name().ok_or_else(|| {
        PlannerError::unsupported_shape("join sides must be tables, not subqueries or joins")
    })?;
    let alias = source.alias().unwrap_or(table.suffix()).to_string();

    let Some(vt) = state.rule.vtable(table.suffix()) else {
        return Ok(Side {
            database: table.prefix().map(str::to_string),
            table: JoinTable {
                tables: vec![table.suffix().to_string()],
                alias,
            },
        });
    };

    let resolution = state
        .resolver
        .shard(table, None, args)
        .map_err(|e| PlannerError::resolution_failed(table.suffix(), e))?;

    if resolution.full_scan && !vt.allow_full_scan() {
        return Err(deny_full_scan(ctx, state, vt));
    }

    let mut shards = resolution.assignment;
    if shards.is_full_scan() {
        shards = vt.topology().enumerate();
    }

    if shards.is_empty() {
        let (db, tb) = vt
            .topology()
            .render(0, 0)
            .ok_or_else(|| PlannerError::topology_unavailable(table.suffix()))?;
        return Ok(Side {
            database: Some(db),
            table: JoinTable {
                tables: vec![tb],
                alias,
            },
        });
    }

    if shards.database_count() > 1 {
        return Err(PlannerError::cross_database_join(format!(
            "joins across more than one database are unsupported: '{}' spans {} databases",
            table.suffix(),
            shards.database_count()
        )));
    }

    let (db, tables) = shards
        .iter()
        .next()
        .map(|(db, tables)| (db.to_string(), tables.to_vec()))
        .ok_or_else(|| PlannerError::topology_unavailable(table.suffix()))?;

    Ok(Side {
        database: Some(db),
        table: JoinTable { tables, alias },
    })
}
