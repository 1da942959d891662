//! Planner error types
//!
//! Error codes:
//! - SHARD_UNSUPPORTED_STATEMENT (REJECT)
//! - SHARD_FULL_SCAN_DENIED (REJECT)
//! - SHARD_CROSS_DATABASE_JOIN (REJECT)
//! - SHARD_INVALID_LIMIT (REJECT)
//! - SHARD_RESOLUTION_FAILED (ERROR)
//! - SHARD_METADATA_UNAVAILABLE (ERROR)
//! - SHARD_TOPOLOGY_UNAVAILABLE (ERROR)
//! - SHARD_SCHEMA_DRIFT (ERROR)
//!
//! Every error is terminal for the compilation that raised it. No partial
//! plan is ever returned alongside one.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The statement itself is at fault; surfaced to the client as is
    Reject,
    /// A collaborator or configuration is at fault
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Planner-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// Statement shape the planner does not handle (subquery, multi-source FROM, writes)
    UnsupportedStatement,
    /// Unrestricted fan-out refused by table policy
    FullScanDenied,
    /// Join sides resolve to different physical databases
    CrossDatabaseJoin,
    /// LIMIT/OFFSET operand cannot be resolved to an integer
    InvalidLimit,
    /// Shard resolver failed
    ResolutionFailed,
    /// Column metadata missing for a resolved table
    MetadataUnavailable,
    /// Topology cannot render a required coordinate
    TopologyUnavailable,
    /// Scanned shards disagree on column layout
    SchemaDrift,
}

impl PlannerErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::UnsupportedStatement => "SHARD_UNSUPPORTED_STATEMENT",
            PlannerErrorCode::FullScanDenied => "SHARD_FULL_SCAN_DENIED",
            PlannerErrorCode::CrossDatabaseJoin => "SHARD_CROSS_DATABASE_JOIN",
            PlannerErrorCode::InvalidLimit => "SHARD_INVALID_LIMIT",
            PlannerErrorCode::ResolutionFailed => "SHARD_RESOLUTION_FAILED",
            PlannerErrorCode::MetadataUnavailable => "SHARD_METADATA_UNAVAILABLE",
            PlannerErrorCode::TopologyUnavailable => "SHARD_TOPOLOGY_UNAVAILABLE",
            PlannerErrorCode::SchemaDrift => "SHARD_SCHEMA_DRIFT",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            PlannerErrorCode::UnsupportedStatement
            | PlannerErrorCode::FullScanDenied
            | PlannerErrorCode::CrossDatabaseJoin
            | PlannerErrorCode::InvalidLimit => Severity::Reject,
            _ => Severity::Error,
        }
    }

    /// Returns true if recompiling after a catalog refresh may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlannerErrorCode::MetadataUnavailable | PlannerErrorCode::SchemaDrift
        )
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error type with full context
#[derive(Debug, Clone)]
pub struct PlannerError {
    code: PlannerErrorCode,
    message: String,
    /// Logical or physical table the error is about, if any
    table: Option<String>,
    source: Option<Arc<dyn Error + Send + Sync>>,
}

impl PlannerError {
    fn new(code: PlannerErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            table: None,
            source: None,
        }
    }

    fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Create an unsupported statement error carrying the query text
    pub fn unsupported(sql: &str) -> Self {
        Self::new(
            PlannerErrorCode::UnsupportedStatement,
            format!("unsupported sql: {}", sql),
        )
    }

    /// Create an unsupported statement error with a specific reason
    pub fn unsupported_shape(reason: impl Into<String>) -> Self {
        Self::new(PlannerErrorCode::UnsupportedStatement, reason)
    }

    /// Create a full scan denied error
    pub fn full_scan_denied(table: impl Into<String>) -> Self {
        let t = table.into();
        Self::new(
            PlannerErrorCode::FullScanDenied,
            format!("full scan of '{}' is not allowed", t),
        )
        .with_table(t)
    }

    /// Create a join spanning more than one database error
    pub fn cross_database_join(reason: impl Into<String>) -> Self {
        Self::new(PlannerErrorCode::CrossDatabaseJoin, reason)
    }

    /// Create an invalid limit error
    pub fn invalid_limit(reason: impl Into<String>) -> Self {
        Self::new(PlannerErrorCode::InvalidLimit, reason)
    }

    /// Create a shard resolution error wrapping the resolver's failure
    pub fn resolution_failed(
        table: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        let t = table.into();
        let mut err = Self::new(
            PlannerErrorCode::ResolutionFailed,
            format!("calculate shards of '{}' failed: {}", t, source),
        )
        .with_table(t);
        err.source = Some(Arc::new(source));
        err
    }

    /// Create a metadata unavailable error
    pub fn metadata_unavailable(database: &str, table: &str) -> Self {
        Self::new(
            PlannerErrorCode::MetadataUnavailable,
            format!("can not get metadata for db:{} and table:{}", database, table),
        )
        .with_table(table)
    }

    /// Create a metadata unavailable error wrapping the catalog's failure
    pub fn catalog_failed(
        database: &str,
        table: &str,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        let mut err = Self::metadata_unavailable(database, table);
        err.message = format!("{}: {}", err.message, source);
        err.source = Some(Arc::new(source));
        err
    }

    /// Create a topology unavailable error
    pub fn topology_unavailable(table: impl Into<String>) -> Self {
        let t = table.into();
        Self::new(
            PlannerErrorCode::TopologyUnavailable,
            format!("cannot compute minimal topology from '{}'", t),
        )
        .with_table(t)
    }

    /// Create a schema drift error
    pub fn schema_drift(database: &str, table: &str, reason: impl Into<String>) -> Self {
        Self::new(
            PlannerErrorCode::SchemaDrift,
            format!(
                "column layout of {}.{} differs from the expanded select list: {}",
                database,
                table,
                reason.into()
            ),
        )
        .with_table(table)
    }

    /// Returns the error code
    pub fn code(&self) -> PlannerErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the table name if applicable
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl Error for PlannerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn Error + 'static))
    }
}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
