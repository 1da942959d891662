//! Plan tree handed to the execution engine
//!
//! A closed set of node variants. Leaves (Scan, Join) carry the rewritten
//! statement and bound arguments they dispatch to physical shards; the other
//! nodes operate on the merged stream of their children.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::aggregate::{AggregateItem, Combiner};
use super::ast::{Expr, JoinType, OrderByItem, SelectStatement};
use super::limit::LimitWindow;

/// Query against one physical database, covering one or more of its tables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanPlan {
    pub database: String,
    /// Physical tables; empty when the statement is forwarded verbatim
    pub tables: Vec<String>,
    /// Rewritten statement, shared by every scan of one compilation
    pub stmt: Arc<SelectStatement>,
    pub args: Arc<Vec<Value>>,
    /// The select list was produced by `*` expansion
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub star_expanded: bool,
}

impl ScanPlan {
    pub fn new(
        database: impl Into<String>,
        tables: Vec<String>,
        stmt: Arc<SelectStatement>,
        args: Arc<Vec<Value>>,
    ) -> Self {
        Self {
            database: database.into(),
            tables,
            stmt,
            args,
            star_expanded: false,
        }
    }

    pub fn with_star_expanded(mut self, expanded: bool) -> Self {
        self.star_expanded = expanded;
        self
    }
}

/// Merge-sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    /// Unqualified column name
    pub column: String,
    pub desc: bool,
}

impl SortKey {
    pub fn from_order_by(items: &[OrderByItem]) -> Vec<SortKey> {
        items
            .iter()
            .map(|item| SortKey {
                column: item.column.name.clone(),
                desc: item.desc,
            })
            .collect()
    }
}

/// One side of a join
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinTable {
    pub tables: Vec<String>,
    pub alias: String,
}

/// Two-way join confined to a single physical database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinPlan {
    /// Common database; `None` when neither side carries a database affinity
    pub database: Option<String>,
    pub left: JoinTable,
    pub right: JoinTable,
    pub join_type: JoinType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<Expr>,
    pub stmt: Arc<SelectStatement>,
    pub args: Arc<Vec<Value>>,
    /// Requested offset and over-fetch limit for slicing joined rows
    pub window: LimitWindow,
}

/// Plan tree node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum PlanNode {
    Scan(ScanPlan),
    /// Unordered concatenation of child streams
    Union { inputs: Vec<PlanNode> },
    /// Skips `offset` rows of the merged stream and keeps `limit - offset`
    Limit {
        input: Box<PlanNode>,
        offset: u64,
        limit: u64,
    },
    /// Merge-sort of child streams
    Order {
        input: Box<PlanNode>,
        keys: Vec<SortKey>,
    },
    Group {
        input: Box<PlanNode>,
        aggregates: Vec<AggregateItem>,
        group_by: Vec<String>,
        order_by: Vec<SortKey>,
    },
    /// Default merge adapter reducing shard streams into one
    Aggregate {
        input: Box<PlanNode>,
        combiner: Combiner,
        aggregates: Vec<AggregateItem>,
    },
    Join(JoinPlan),
}

impl PlanNode {
    pub fn union(inputs: Vec<PlanNode>) -> Self {
        PlanNode::Union { inputs }
    }

    pub fn limit(input: PlanNode, window: LimitWindow) -> Self {
        PlanNode::Limit {
            input: Box::new(input),
            offset: window.offset,
            limit: window.limit,
        }
    }

    pub fn order(input: PlanNode, keys: Vec<SortKey>) -> Self {
        PlanNode::Order {
            input: Box::new(input),
            keys,
        }
    }

    pub fn group(
        input: PlanNode,
        aggregates: Vec<AggregateItem>,
        group_by: Vec<String>,
        order_by: Vec<SortKey>,
    ) -> Self {
        PlanNode::Group {
            input: Box::new(input),
            aggregates,
            group_by,
            order_by,
        }
    }

    pub fn aggregate(input: PlanNode, aggregates: Vec<AggregateItem>) -> Self {
        PlanNode::Aggregate {
            input: Box::new(input),
            combiner: Combiner::from_aggregates(&aggregates),
            aggregates,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PlanNode::Scan(_) => "Scan",
            PlanNode::Union { .. } => "Union",
            PlanNode::Limit { .. } => "Limit",
            PlanNode::Order { .. } => "Order",
            PlanNode::Group { .. } => "Group",
            PlanNode::Aggregate { .. } => "Aggregate",
            PlanNode::Join(_) => "Join",
        }
    }

    /// Direct children, in execution order
    pub fn children(&self) -> Vec<&PlanNode> {
        match self {
            PlanNode::Scan(_) | PlanNode::Join(_) => Vec::new(),
            PlanNode::Union { inputs } => inputs.iter().collect(),
            PlanNode::Limit { input, .. }
            | PlanNode::Order { input, .. }
            | PlanNode::Group { input, .. }
            | PlanNode::Aggregate { input, .. } => vec![input.as_ref()],
        }
    }

    /// Every Scan leaf, depth first
    pub fn scans(&self) -> Vec<&ScanPlan> {
        let mut out = Vec::new();
        self.collect_scans(&mut out);
        out
    }

    fn collect_scans<'a>(&'a self, out: &mut Vec<&'a ScanPlan>) {
        if let PlanNode::Scan(scan) = self {
            out.push(scan);
        }
        for child in self.children() {
            child.collect_scans(out);
        }
    }

    pub fn as_scan(&self) -> Option<&ScanPlan> {
        match self {
            PlanNode::Scan(scan) => Some(scan),
            _ => None,
        }
    }

    pub fn as_join(&self) -> Option<&JoinPlan> {
        match self {
            PlanNode::Join(join) => Some(join),
            _ => None,
        }
    }

    /// Node kinds from the root down the first-child spine, e.g.
    /// `["Group", "Order", "Limit", "Union", "Scan"]`
    pub fn spine(&self) -> Vec<&'static str> {
        let mut kinds = vec![self.kind()];
        let mut node = self;
        while let Some(child) = node.children().first().copied() {
            kinds.push(child.kind());
            node = child;
        }
        kinds
    }
}
