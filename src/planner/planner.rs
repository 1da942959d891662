//! Query planner entry point
//!
//! Wires the optimizer registry to the sharding rule, resolver and catalog,
//! and records every compilation in logs and metrics.
//!
//! Compilation is synchronous and never mutates its inputs, so one planner
//! may serve concurrent callers and one parsed statement may be compiled
//! again with different arguments.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::SchemaCatalog;
use crate::observability::{log_event, Event, MetricsSnapshot, PlannerMetrics};
use crate::rule::{ShardResolver, ShardingRule};

use super::ast::Statement;
use super::context::CompileContext;
use super::errors::{PlannerError, PlannerResult};
use super::plan::PlanNode;
use super::registry::{OptimizeState, OptimizerRegistry};
use super::star::SchemaGuard;

/// Planner behaviour switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Re-read the layout of every scanned table after `*` expansion and
    /// fail on drift
    #[serde(default)]
    pub verify_star_layout: bool,
}

/// Compiles statements into plan trees
pub struct Planner<'a> {
    rule: &'a ShardingRule,
    resolver: &'a dyn ShardResolver,
    catalog: &'a dyn SchemaCatalog,
    registry: &'a OptimizerRegistry,
    config: PlannerConfig,
    metrics: PlannerMetrics,
}

impl<'a> Planner<'a> {
    /// Creates a new planner
    pub fn new(
        rule: &'a ShardingRule,
        resolver: &'a dyn ShardResolver,
        catalog: &'a dyn SchemaCatalog,
        registry: &'a OptimizerRegistry,
    ) -> Self {
        Self {
            rule,
            resolver,
            catalog,
            registry,
            config: PlannerConfig::default(),
            metrics: PlannerMetrics::new(),
        }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> PlannerConfig {
        self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Plans a statement, returning the root plan node or an error.
    ///
    /// No partial plan is returned on failure.
    pub fn plan(
        &self,
        ctx: &CompileContext,
        stmt: &Statement,
        args: &[Value],
    ) -> PlannerResult<PlanNode> {
        let compile_id = ctx.compile_id().to_string();
        log_event(
            Event::QueryReceived,
            &[
                ("compile_id", &compile_id),
                ("db_group", ctx.db_group()),
                ("kind", stmt.kind().as_str()),
                ("sql", ctx.sql()),
            ],
        );

        match self.compile(ctx, stmt, args) {
            Ok(plan) => {
                self.metrics.increment_compiled();
                let scans = plan.scans().len().to_string();
                log_event(
                    Event::PlanCompiled,
                    &[
                        ("compile_id", &compile_id),
                        ("root", plan.kind()),
                        ("scans", &scans),
                    ],
                );
                Ok(plan)
            }
            Err(err) => {
                self.metrics.increment_rejected();
                log_event(
                    Event::QueryRejected,
                    &[
                        ("code", err.code().code()),
                        ("compile_id", &compile_id),
                        ("message", err.message()),
                    ],
                );
                Err(err)
            }
        }
    }

    fn compile(
        &self,
        ctx: &CompileContext,
        stmt: &Statement,
        args: &[Value],
    ) -> PlannerResult<PlanNode> {
        let optimizer = self
            .registry
            .get(stmt.kind())
            .ok_or_else(|| PlannerError::unsupported(ctx.sql()))?;

        let state = OptimizeState {
            rule: self.rule,
            resolver: self.resolver,
            catalog: self.catalog,
            metrics: &self.metrics,
        };
        let plan = optimizer.optimize(ctx, &state, stmt, args)?;

        if self.config.verify_star_layout {
            SchemaGuard::new(self.catalog).verify(ctx, &plan)?;
        }
        Ok(plan)
    }
}
