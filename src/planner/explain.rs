//! Explain output for plan trees
//!
//! Produces deterministic, human-readable explain output.

use std::fmt;

use super::ast::LimitValue;
use super::errors::PlannerError;
use super::plan::{PlanNode, SortKey};

/// Explain plan output
#[derive(Debug, Clone)]
pub struct ExplainPlan {
    /// Whether planning succeeded
    pub accepted: bool,
    /// One line per plan node, indented by depth
    pub lines: Vec<String>,
    /// Number of Scan leaves
    pub scans: usize,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a compiled plan tree
    pub fn from_plan(plan: &PlanNode) -> Self {
        let mut lines = Vec::new();
        describe(plan, 0, &mut lines);
        Self {
            accepted: true,
            lines,
            scans: plan.scans().len(),
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a planning error
    pub fn from_error(err: &PlannerError) -> Self {
        Self {
            accepted: false,
            lines: Vec::new(),
            scans: 0,
            rejection_reason: Some(err.message().to_string()),
            rejection_code: Some(err.code().code().to_string()),
        }
    }
}

fn describe(node: &PlanNode, depth: usize, out: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    let line = match node {
        PlanNode::Scan(scan) => {
            let limit = match scan.stmt.limit {
                Some(clause) => format!(" limit={}", limit_text(clause.limit)),
                None => String::new(),
            };
            format!(
                "Scan db={} tables=[{}]{}{}",
                scan.database,
                scan.tables.join(", "),
                limit,
                if scan.star_expanded { " star_expanded" } else { "" }
            )
        }
        PlanNode::Union { inputs } => format!("Union inputs={}", inputs.len()),
        PlanNode::Limit { offset, limit, .. } => format!("Limit offset={} limit={}", offset, limit),
        PlanNode::Order { keys, .. } => format!("Order by={}", keys_text(keys)),
        PlanNode::Group {
            aggregates,
            group_by,
            order_by,
            ..
        } => {
            let mut line = format!(
                "Group by=[{}] aggregates=[{}]",
                group_by.join(", "),
                aggregates.iter().map(|a| a.label()).collect::<Vec<_>>().join(", ")
            );
            if !order_by.is_empty() {
                line.push_str(&format!(" order={}", keys_text(order_by)));
            }
            line
        }
        PlanNode::Aggregate { aggregates, .. } => {
            if aggregates.is_empty() {
                "Aggregate passthrough".to_string()
            } else {
                format!(
                    "Aggregate [{}]",
                    aggregates.iter().map(|a| a.label()).collect::<Vec<_>>().join(", ")
                )
            }
        }
        PlanNode::Join(join) => format!(
            "Join {:?} db={} left={}[{}] right={}[{}]",
            join.join_type,
            join.database.as_deref().unwrap_or("-"),
            join.left.alias,
            join.left.tables.join(", "),
            join.right.alias,
            join.right.tables.join(", ")
        ),
    };
    out.push(format!("{}{}", indent, line));

    for child in node.children() {
        describe(child, depth + 1, out);
    }
}

fn keys_text(keys: &[SortKey]) -> String {
    let parts: Vec<String> = keys
        .iter()
        .map(|k| format!("{} {}", k.column, if k.desc { "DESC" } else { "ASC" }))
        .collect();
    format!("[{}]", parts.join(", "))
}

fn limit_text(value: LimitValue) -> String {
    match value {
        LimitValue::Literal(v) => v.to_string(),
        LimitValue::Param(i) => format!("?{}", i),
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            writeln!(f, "Scans: {}", self.scans)?;
            writeln!(f, "Plan:")?;
            for line in &self.lines {
                writeln!(f, "  {}", line)?;
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}
