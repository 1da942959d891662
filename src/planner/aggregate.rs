//! Aggregate projections and the merge-time result combiner
//!
//! Shards return partial aggregates. The combiner tells the execution engine
//! how to fold the partials of each aggregate column into the final value.

use serde::Serialize;

use super::ast::{Expr, SelectElement};

/// Aggregate functions the merge layer knows how to combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateFunction {
    Count,
    Sum,
    Max,
    Min,
    Avg,
}

impl AggregateFunction {
    /// Parses a function name, case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(AggregateFunction::Count),
            "sum" => Some(AggregateFunction::Sum),
            "max" => Some(AggregateFunction::Max),
            "min" => Some(AggregateFunction::Min),
            "avg" => Some(AggregateFunction::Avg),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Avg => "AVG",
        }
    }

    /// How partial results of this function are folded across shards
    pub fn merge_strategy(&self) -> MergeStrategy {
        match self {
            AggregateFunction::Count | AggregateFunction::Sum => MergeStrategy::Sum,
            AggregateFunction::Max => MergeStrategy::Max,
            AggregateFunction::Min => MergeStrategy::Min,
            AggregateFunction::Avg => MergeStrategy::Average,
        }
    }
}

/// Aggregate projection found in a select list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateItem {
    pub function: AggregateFunction,
    /// Argument column; `None` for `COUNT(*)` and non-column arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
    pub distinct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Index of the projection in the select list
    pub position: usize,
}

impl AggregateItem {
    /// Output column label, e.g. `COUNT(uid)` when no alias is given
    pub fn label(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        let arg = self.argument.as_deref().unwrap_or("*");
        if self.distinct {
            format!("{}(DISTINCT {})", self.function.as_str(), arg)
        } else {
            format!("{}({})", self.function.as_str(), arg)
        }
    }
}

/// Extracts the aggregate projections of a select list, in select-list order
pub fn load_aggregates(select: &[SelectElement]) -> Vec<AggregateItem> {
    select
        .iter()
        .enumerate()
        .filter_map(|(position, element)| match element {
            SelectElement::Function { func, alias } => {
                let function = AggregateFunction::parse(&func.name)?;
                let argument = match func.args.as_slice() {
                    [Expr::Column(col)] => Some(col.name.clone()),
                    _ => None,
                };
                Some(AggregateItem {
                    function,
                    argument,
                    distinct: func.distinct,
                    alias: alias.clone(),
                    position,
                })
            }
            _ => None,
        })
        .collect()
}

/// Fold applied to one output column across shard streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    Sum,
    Max,
    Min,
    /// Weighted by the per-shard row counts
    Average,
}

/// Per-column merge rules for the Aggregate node.
///
/// An empty combiner concatenates shard streams unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Combiner {
    /// (select-list position, strategy), ordered by position
    strategies: Vec<(usize, MergeStrategy)>,
}

impl Combiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_aggregates(items: &[AggregateItem]) -> Self {
        let mut strategies: Vec<(usize, MergeStrategy)> = items
            .iter()
            .map(|item| (item.position, item.function.merge_strategy()))
            .collect();
        strategies.sort_by_key(|(position, _)| *position);
        Self { strategies }
    }

    /// Strategy for the column at `position`, if it is an aggregate
    pub fn strategy(&self, position: usize) -> Option<MergeStrategy> {
        self.strategies
            .binary_search_by_key(&position, |(p, _)| *p)
            .ok()
            .map(|i| self.strategies[i].1)
    }

    /// Returns true if no column needs folding
    pub fn is_passthrough(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::ast::{Expr, FunctionCall};

    fn select_list() -> Vec<SelectElement> {
        let mut distinct = FunctionCall::new("count", vec![Expr::col("uid")]);
        distinct.distinct = true;
        vec![
            SelectElement::column("gender"),
            SelectElement::function(FunctionCall::new("COUNT", vec![Expr::Wildcard]), Some("n")),
            SelectElement::function(FunctionCall::new("max", vec![Expr::col("score")]), None),
            SelectElement::function(FunctionCall::new("concat", vec![Expr::col("name")]), None),
            SelectElement::function(distinct, None),
        ]
    }

    #[test]
    fn test_load_aggregates() {
        let aggs = load_aggregates(&select_list());
        assert_eq!(aggs.len(), 3);

        assert_eq!(aggs[0].function, AggregateFunction::Count);
        assert_eq!(aggs[0].argument, None);
        assert_eq!(aggs[0].position, 1);
        assert_eq!(aggs[0].label(), "n");

        assert_eq!(aggs[1].function, AggregateFunction::Max);
        assert_eq!(aggs[1].argument.as_deref(), Some("score"));
        assert_eq!(aggs[1].label(), "MAX(score)");

        assert!(aggs[2].distinct);
        assert_eq!(aggs[2].position, 4);
        assert_eq!(aggs[2].label(), "COUNT(DISTINCT uid)");
    }

    #[test]
    fn test_no_aggregates() {
        let aggs = load_aggregates(&[SelectElement::star(), SelectElement::column("uid")]);
        assert!(aggs.is_empty());
        assert!(Combiner::from_aggregates(&aggs).is_passthrough());
    }

    #[test]
    fn test_combiner_strategies() {
        let combiner = Combiner::from_aggregates(&load_aggregates(&select_list()));

        assert!(!combiner.is_passthrough());
        assert_eq!(combiner.strategy(0), None);
        assert_eq!(combiner.strategy(1), Some(MergeStrategy::Sum));
        assert_eq!(combiner.strategy(2), Some(MergeStrategy::Max));
        assert_eq!(combiner.strategy(4), Some(MergeStrategy::Sum));
    }

    #[test]
    fn test_avg_merges_weighted() {
        assert_eq!(AggregateFunction::Avg.merge_strategy(), MergeStrategy::Average);
        assert_eq!(AggregateFunction::parse("AvG"), Some(AggregateFunction::Avg));
        assert_eq!(AggregateFunction::parse("upper"), None);
    }
}
