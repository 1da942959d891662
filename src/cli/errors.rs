//! CLI error types
//!
//! Configuration and stdin/stdout failures stop the command. A malformed
//! request line only costs that line: `plan_stream` reports it inline and
//! moves on. Planner rejections never become `CliError`s.

use std::fmt;
use std::io;

/// Stable codes written to the `code` field of error lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Unreadable, malformed or inconsistent gateway configuration
    ConfigError,
    IoError,
    /// Request line that is not a plan request
    InvalidRequest,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "SHARD_CLI_CONFIG_ERROR",
            Self::IoError => "SHARD_CLI_IO_ERROR",
            Self::InvalidRequest => "SHARD_CLI_INVALID_REQUEST",
        }
    }

    /// Whether a request stream must stop on this error
    pub fn aborts_stream(&self) -> bool {
        !matches!(self, Self::InvalidRequest)
    }
}

/// Error raised by a CLI command
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidRequest, msg)
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    /// `SHARD_CLI_*` string for the error line
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

/// Writer failures surface as I/O errors; anything else is a bad payload.
impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Self::io_error(format!("JSON output failed: {}", e))
        } else {
            Self::invalid_request(format!("JSON error: {}", e))
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
