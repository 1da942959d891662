//! CLI argument definitions using clap
//!
//! Commands:
//! - shardgate check --config <path>
//! - shardgate plan --config <path>
//! - shardgate explain --config <path>

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use crate::observability::Severity;

/// shardgate - SELECT planning for a sharding SQL gateway
#[derive(Parser, Debug)]
#[command(name = "shardgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Minimum log severity written to stderr (trace, info, warn, error)
    #[arg(long, global = true, default_value = "info", value_parser = Severity::from_str)]
    pub log_level: Severity,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a gateway configuration and print a summary
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./shardgate.json")]
        config: PathBuf,
    },

    /// Read JSON plan requests from stdin, one per line, and print plans
    Plan {
        /// Path to configuration file
        #[arg(long, default_value = "./shardgate.json")]
        config: PathBuf,
    },

    /// Same input as `plan`, printing explain output instead
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./shardgate.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
