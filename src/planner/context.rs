//! Per-compilation ambient context supplied by the caller

use uuid::Uuid;

/// Ambient state of one compilation: the client's current database group,
/// the original query text (for error messages) and a correlation id.
#[derive(Debug, Clone)]
pub struct CompileContext {
    db_group: String,
    sql: String,
    compile_id: Uuid,
}

impl CompileContext {
    pub fn new(db_group: impl Into<String>) -> Self {
        Self {
            db_group: db_group.into(),
            sql: String::new(),
            compile_id: Uuid::new_v4(),
        }
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = sql.into();
        self
    }

    /// Database group used for unsharded and table-less statements
    pub fn db_group(&self) -> &str {
        &self.db_group
    }

    /// Original query text, possibly empty
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn compile_id(&self) -> Uuid {
        self.compile_id
    }
}
