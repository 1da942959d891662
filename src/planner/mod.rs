//! Query planner subsystem for shardgate
//!
//! Turns a parsed statement and its bound arguments into a plan tree that
//! names the physical shards to read and how their results are recombined.
//!
//! # Design Principles
//!
//! - Deterministic: same statement, arguments and rule give the same plan
//! - Non-mutating: the caller's statement and arguments are never touched
//! - Explicit: statements the planner cannot route safely are rejected
//!
//! # SELECT routing (strict order)
//!
//! 1. No FROM, system schema or unsharded table: one Scan on the db group
//! 2. Join: one Join leaf confined to a single database
//! 3. Sharded table: one Scan per matched database under merge nodes

mod aggregate;
mod ast;
mod classify;
mod context;
mod errors;
mod explain;
mod join;
mod limit;
mod plan;
mod planner;
mod registry;
mod select;
mod star;

pub use aggregate::{load_aggregates, AggregateFunction, AggregateItem, Combiner, MergeStrategy};
pub use ast::{
    ColumnRef, CompareOp, Expr, FunctionCall, JoinNode, JoinType, LimitClause, LimitValue,
    OrderByItem, SelectElement, SelectStatement, Source, Statement, StatementKind, TableName,
    TableSource,
};
pub use classify::{classify, is_system_schema, SelectClass};
pub use context::CompileContext;
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult, Severity};
pub use explain::ExplainPlan;
pub use limit::{rewrite_limit, LimitWindow};
pub use plan::{JoinPlan, JoinTable, PlanNode, ScanPlan, SortKey};
pub use planner::{Planner, PlannerConfig};
pub use registry::{OptimizeState, OptimizerRegistry, SelectOptimizer, StatementOptimizer};
pub use select::compile_select;
pub use star::{expand_star, SchemaGuard};
