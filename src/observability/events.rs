//! Observable planner events
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events in shardgate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Gateway configuration loaded
    ConfigLoaded,

    // Planning
    /// Statement handed to the planner
    QueryReceived,
    /// SELECT routed to a bypass or sharded path
    StatementClassified,
    /// Shard resolver produced an assignment
    ShardsComputed,
    /// `SELECT *` replaced by catalog columns
    StarExpanded,
    /// Plan tree produced
    PlanCompiled,
    /// Planning failed
    QueryRejected,
    /// Unrestricted fan-out refused by table policy
    FullScanDenied,
    /// Scanned shards disagree on column layout
    SchemaDriftDetected,
}

impl Event {
    /// Returns the event name as used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::QueryReceived => "QUERY_RECEIVED",
            Event::StatementClassified => "STATEMENT_CLASSIFIED",
            Event::ShardsComputed => "SHARDS_COMPUTED",
            Event::StarExpanded => "STAR_EXPANDED",
            Event::PlanCompiled => "PLAN_COMPILED",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::FullScanDenied => "FULL_SCAN_DENIED",
            Event::SchemaDriftDetected => "SCHEMA_DRIFT_DETECTED",
        }
    }

    /// Returns true if this event reports a failed compilation
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::QueryRejected | Event::FullScanDenied | Event::SchemaDriftDetected
        )
    }

    /// Returns true for per-compilation detail that is only logged at TRACE
    pub fn is_detail(&self) -> bool {
        matches!(
            self,
            Event::QueryReceived
                | Event::StatementClassified
                | Event::ShardsComputed
                | Event::StarExpanded
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::ShardsComputed.as_str(), "SHARDS_COMPUTED");
        assert_eq!(Event::FullScanDenied.to_string(), "FULL_SCAN_DENIED");
    }

    #[test]
    fn test_failure_events() {
        assert!(Event::QueryRejected.is_failure());
        assert!(Event::SchemaDriftDetected.is_failure());
        assert!(!Event::PlanCompiled.is_failure());
    }

    #[test]
    fn test_detail_events() {
        assert!(Event::ShardsComputed.is_detail());
        assert!(Event::StatementClassified.is_detail());
        assert!(!Event::PlanCompiled.is_detail());
    }
}
