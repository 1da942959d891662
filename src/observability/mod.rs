//! Observability subsystem for shardgate
//!
//! - Structured logging (JSON lines on stderr)
//! - Planner counters
//! - Typed lifecycle events
//!
//! Observability is read-only: nothing here changes planning outcomes.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, PlannerMetrics};

/// Log a planner event.
///
/// Failures go out at WARN, per-compilation detail at TRACE, everything else
/// at INFO.
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Warn
    } else if event.is_detail() {
        Severity::Trace
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        // This just verifies no panic
        log_event(Event::PlanCompiled, &[]);
        log_event(Event::QueryRejected, &[("code", "SHARD_UNSUPPORTED_STATEMENT")]);
    }
}
