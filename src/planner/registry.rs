//! Statement-kind dispatch
//!
//! The registry is built once at composition time and handed to the
//! planner by reference. Statement kinds without an optimizer are rejected.

use std::collections::HashMap;

use serde_json::Value;

use crate::catalog::SchemaCatalog;
use crate::observability::PlannerMetrics;
use crate::rule::{ShardResolver, ShardingRule};

use super::ast::{Statement, StatementKind};
use super::context::CompileContext;
use super::errors::{PlannerError, PlannerResult};
use super::plan::PlanNode;
use super::select::compile_select;

/// Read-only collaborators of one compilation
pub struct OptimizeState<'a> {
    pub rule: &'a ShardingRule,
    pub resolver: &'a dyn ShardResolver,
    pub catalog: &'a dyn SchemaCatalog,
    pub metrics: &'a PlannerMetrics,
}

/// Compiles one statement kind into a plan tree
pub trait StatementOptimizer: Send + Sync {
    fn optimize(
        &self,
        ctx: &CompileContext,
        state: &OptimizeState<'_>,
        stmt: &Statement,
        args: &[Value],
    ) -> PlannerResult<PlanNode>;
}

/// SELECT optimizer
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectOptimizer;

impl StatementOptimizer for SelectOptimizer {
    fn optimize(
        &self,
        ctx: &CompileContext,
        state: &OptimizeState<'_>,
        stmt: &Statement,
        args: &[Value],
    ) -> PlannerResult<PlanNode> {
        let select = stmt
            .as_select()
            .ok_or_else(|| PlannerError::unsupported(ctx.sql()))?;
        compile_select(ctx, state, select, args)
    }
}

/// Mapping from statement kind to optimizer
#[derive(Default)]
pub struct OptimizerRegistry {
    optimizers: HashMap<StatementKind, Box<dyn StatementOptimizer>>,
}

impl OptimizerRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in optimizer
    pub fn with_defaults() -> Self {
        Self::new().with(StatementKind::Select, SelectOptimizer)
    }

    /// Registers (or replaces) the optimizer for `kind`
    pub fn register(&mut self, kind: StatementKind, optimizer: impl StatementOptimizer + 'static) {
        self.optimizers.insert(kind, Box::new(optimizer));
    }

    pub fn with(mut self, kind: StatementKind, optimizer: impl StatementOptimizer + 'static) -> Self {
        self.register(kind, optimizer);
        self
    }

    pub fn get(&self, kind: StatementKind) -> Option<&dyn StatementOptimizer> {
        self.optimizers.get(&kind).map(Box::as_ref)
    }

    pub fn supports(&self, kind: StatementKind) -> bool {
        self.optimizers.contains_key(&kind)
    }
}
