//! CLI module for shardgate
//!
//! Provides command-line interface for:
//! - check: Validate a gateway configuration
//! - plan: Plan JSON requests from stdin
//! - explain: Explain JSON requests from stdin

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check, explain, plan, plan_stream, run, run_command, summary, OutputMode, PlanRequest};
pub use config::{CatalogTableConfig, GatewayConfig, ShardKeyConfig, TableConfig};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_requests, write_error, write_response, write_text};
