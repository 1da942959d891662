//! Single-table SELECT compilation
//!
//! Decision order:
//! 1. Rewrite LIMIT/OFFSET on a private copy of the statement
//! 2. Joins go to the join compiler
//! 3. Classify; bypass statements become one Scan on the caller's db group
//! 4. Sharded statements: resolve shards, then one Scan, or a fan-out tree
//!    `Union -> [Limit] -> [Order] -> Group | Aggregate`

use std::sync::Arc;

use serde_json::Value;

use crate::observability::{log_event, Event};
use crate::rule::{ShardAssignment, VirtualTable};

use super::aggregate::load_aggregates;
use super::ast::{SelectStatement, TableName};
use super::classify::{classify, SelectClass};
use super::context::CompileContext;
use super::errors::{PlannerError, PlannerResult};
use super::join::compile_join;
use super::limit::{rewrite_limit, LimitWindow};
use super::plan::{PlanNode, ScanPlan, SortKey};
use super::registry::OptimizeState;
use super::star::{expand_star, needs_expansion};

/// Compiles a SELECT into a plan tree.
///
/// `stmt` and `args` are left untouched; all rewrites happen on copies that
/// the returned plan owns.
pub fn compile_select(
    ctx: &CompileContext,
    state: &OptimizeState<'_>,
    stmt: &SelectStatement,
    args: &[Value],
) -> PlannerResult<PlanNode> {
    let mut stmt = stmt.clone();
    let mut args = args.to_vec();
    let window = rewrite_limit(&mut stmt, &mut args)?;

    if stmt.has_join() {
        return compile_join(ctx, state, stmt, args, window);
    }

    let class = classify(state.rule, &stmt);
    let compile_id = ctx.compile_id().to_string();
    log_event(
        Event::StatementClassified,
        &[("class", class.as_str()), ("compile_id", &compile_id)],
    );
    if class.is_bypass() {
        state.metrics.increment_bypass();
    }

    match class {
        SelectClass::Unsupported => Err(PlannerError::unsupported(ctx.sql())),
        SelectClass::BypassEmpty | SelectClass::BypassSystemSchema => {
            Ok(scan(ctx.db_group(), Vec::new(), stmt, args, false))
        }
        SelectClass::BypassUnsharded => {
            let table = raw_table(ctx, &stmt)?.suffix().to_string();
            let expanded = expand(ctx, state, &mut stmt, ctx.db_group(), &table)?;
            Ok(scan(ctx.db_group(), vec![table], stmt, args, expanded))
        }
        SelectClass::Sharded => compile_sharded(ctx, state, stmt, args, window),
    }
}

fn compile_sharded(
    ctx: &CompileContext,
    state: &OptimizeState<'_>,
    mut stmt: SelectStatement,
    args: Vec<Value>,
    window: LimitWindow,
) -> PlannerResult<PlanNode> {
    let table = raw_table(ctx, &stmt)?.clone();
    let vt = state
        .rule
        .vtable(table.suffix())
        .ok_or_else(|| PlannerError::topology_unavailable(table.suffix()))?;

    let resolution = state
        .resolver
        .shard(&table, stmt.filter.as_ref(), &args)
        .map_err(|e| PlannerError::resolution_failed(table.suffix(), e))?;

    let compile_id = ctx.compile_id().to_string();
    let shards_text = resolution.assignment.to_string();
    let full_scan_text = resolution.full_scan.to_string();
    log_event(
        Event::ShardsComputed,
        &[
            ("compile_id", &compile_id),
            ("full_scan", &full_scan_text),
            ("shards", &shards_text),
            ("table", table.suffix()),
        ],
    );

    if resolution.full_scan && !vt.allow_full_scan() {
        return Err(deny_full_scan(ctx, state, vt));
    }

    let mut shards = resolution.assignment;

    // A predicate that matches nothing still needs a syntactically valid
    // target; coordinate (0, 0) always exists.
    if shards.is_empty() {
        let (db, tb) = vt
            .topology()
            .render(0, 0)
            .ok_or_else(|| PlannerError::topology_unavailable(table.suffix()))?;
        return single(ctx, state, stmt, args, db, tb);
    }

    if let Some((db, tb)) = shards.single() {
        let (db, tb) = (db.to_string(), tb.to_string());
        return single(ctx, state, stmt, args, db, tb);
    }

    if shards.is_full_scan() {
        shards = vt.topology().enumerate();
    }

    let (first_db, first_table) = first_target(&shards)
        .ok_or_else(|| PlannerError::topology_unavailable(table.suffix()))?;
    let expanded = expand(ctx, state, &mut stmt, &first_db, &first_table)?;

    state.metrics.increment_scatter();
    Ok(fan_out(&shards, stmt, args, window, expanded))
}

/// Builds `Union -> [Limit] -> [Order] -> Group | Aggregate` over one Scan per
/// database of `shards`. All scans share one statement and argument list.
fn fan_out(
    shards: &ShardAssignment,
    stmt: SelectStatement,
    args: Vec<Value>,
    window: LimitWindow,
    expanded: bool,
) -> PlanNode {
    let stmt = Arc::new(stmt);
    let args = Arc::new(args);

    let scans = shards
        .iter()
        .map(|(db, tables)| {
            PlanNode::Scan(
                ScanPlan::new(db, tables.to_vec(), Arc::clone(&stmt), Arc::clone(&args))
                    .with_star_expanded(expanded),
            )
        })
        .collect();

    let mut root = PlanNode::union(scans);

    if stmt.limit.is_some() {
        root = PlanNode::limit(root, window);
    }

    let order_keys = SortKey::from_order_by(&stmt.order_by);
    if !order_keys.is_empty() {
        root = PlanNode::order(root, order_keys.clone());
    }

    let aggregates = load_aggregates(&stmt.select);
    if stmt.group_by.is_empty() {
        PlanNode::aggregate(root, aggregates)
    } else {
        let group_by = stmt.group_by.iter().map(|c| c.name.clone()).collect();
        PlanNode::group(root, aggregates, group_by, order_keys)
    }
}

fn single(
    ctx: &CompileContext,
    state: &OptimizeState<'_>,
    mut stmt: SelectStatement,
    args: Vec<Value>,
    database: String,
    table: String,
) -> PlannerResult<PlanNode> {
    let expanded = expand(ctx, state, &mut stmt, &database, &table)?;
    state.metrics.increment_single_shard();
    Ok(scan(database, vec![table], stmt, args, expanded))
}

fn scan(
    database: impl Into<String>,
    tables: Vec<String>,
    stmt: SelectStatement,
    args: Vec<Value>,
    expanded: bool,
) -> PlanNode {
    PlanNode::Scan(
        ScanPlan::new(database, tables, Arc::new(stmt), Arc::new(args))
            .with_star_expanded(expanded),
    )
}

fn expand(
    ctx: &CompileContext,
    state: &OptimizeState<'_>,
    stmt: &mut SelectStatement,
    database: &str,
    table: &str,
) -> PlannerResult<bool> {
    if needs_expansion(stmt) {
        state.metrics.increment_catalog_lookups();
    }
    expand_star(ctx, state.catalog, stmt, database, table)
}

fn first_target(shards: &ShardAssignment) -> Option<(String, String)> {
    shards
        .iter()
        .find_map(|(db, tables)| tables.first().map(|t| (db.to_string(), t.clone())))
}

fn raw_table<'s>(ctx: &CompileContext, stmt: &'s SelectStatement) -> PlannerResult<&'s TableName> {
    stmt.first_table()
        .ok_or_else(|| PlannerError::unsupported(ctx.sql()))
}

pub(super) fn deny_full_scan(
    ctx: &CompileContext,
    state: &OptimizeState<'_>,
    vt: &VirtualTable,
) -> PlannerError {
    state.metrics.increment_full_scans_denied();
    let compile_id = ctx.compile_id().to_string();
    log_event(
        Event::FullScanDenied,
        &[("compile_id", &compile_id), ("table", vt.name())],
    );
    PlannerError::full_scan_denied(vt.name())
}
