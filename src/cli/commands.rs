//! CLI command implementations
//!
//! `plan` and `explain` read one request per stdin line:
//!
//! ```json
//! {"db_group": "school", "sql": "select * from student where uid = ?",
//!  "statement": {"type": "select", ...}, "args": [7]}
//! ```
//!
//! A request that fails to plan produces an error line and processing
//! continues with the next request.

use std::io::{self, BufRead, Write};
use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::observability::{log_event, Event, Logger};
use crate::planner::{CompileContext, ExplainPlan, OptimizerRegistry, Planner, Statement};
use crate::rule::Sharder;

use super::args::{Cli, Command};
use super::config::GatewayConfig;
use super::errors::{CliError, CliResult};
use super::io::{read_requests, write_error, write_response, write_text};

/// One plan request line
#[derive(Debug, Clone, Deserialize)]
pub struct PlanRequest {
    /// Overrides the configured default database group
    #[serde(default)]
    pub db_group: Option<String>,
    /// Original query text, used in error messages
    #[serde(default)]
    pub sql: Option<String>,
    pub statement: Statement,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// How planned requests are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One JSON response per request
    Json,
    /// Explain text per request
    Explain,
}

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    Logger::set_min_severity(cli.log_level);
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Check { config } => check(&config),
        Command::Plan { config } => plan(&config),
        Command::Explain { config } => explain(&config),
    }
}

/// Validate configuration and print a summary
pub fn check(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_response(&mut out, summary(&config)?)
}

/// Plan stdin requests, writing JSON plans
pub fn plan(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    plan_stream(&config, stdin.lock(), &mut out, OutputMode::Json)
}

/// Plan stdin requests, writing explain text
pub fn explain(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    plan_stream(&config, stdin.lock(), &mut out, OutputMode::Explain)
}

/// Configuration summary written by `check`
pub fn summary(config: &GatewayConfig) -> CliResult<Value> {
    let rule = config.sharding_rule()?;
    let catalog = config.schema_catalog();
    Ok(json!({
        "default_db_group": config.default_db_group,
        "tables": rule.table_names(),
        "catalog_tables": catalog.len(),
        "planner": config.planner,
    }))
}

/// Plans every request in `input`, writing one result per request to `out`.
///
/// Only configuration and I/O failures abort the stream.
pub fn plan_stream<R: BufRead, W: Write>(
    config: &GatewayConfig,
    input: R,
    out: &mut W,
    mode: OutputMode,
) -> CliResult<()> {
    let rule = config.sharding_rule()?;
    let catalog = config.schema_catalog();
    let resolver = Sharder::new(&rule);
    let registry = OptimizerRegistry::with_defaults();
    let planner = Planner::new(&rule, &resolver, &catalog, &registry).with_config(config.planner);

    for line in read_requests(input) {
        let request = match line.and_then(parse_request) {
            Ok(request) => request,
            Err(e) if e.code().aborts_stream() => return Err(e),
            Err(e) => {
                write_error(out, e.code_str(), e.message())?;
                continue;
            }
        };

        let db_group = request
            .db_group
            .as_deref()
            .unwrap_or(&config.default_db_group);
        let ctx = CompileContext::new(db_group).with_sql(request.sql.clone().unwrap_or_default());
        let result = planner.plan(&ctx, &request.statement, &request.args);

        match mode {
            OutputMode::Json => match result {
                Ok(plan) => write_response(
                    out,
                    json!({
                        "compile_id": ctx.compile_id(),
                        "plan": serde_json::to_value(&plan)?,
                    }),
                )?,
                Err(e) => write_error(out, e.code().code(), e.message())?,
            },
            OutputMode::Explain => {
                let explain = match &result {
                    Ok(plan) => ExplainPlan::from_plan(plan),
                    Err(e) => ExplainPlan::from_error(e),
                };
                write_text(out, &explain.to_string())?;
            }
        }
    }

    Ok(())
}

fn parse_request(value: Value) -> CliResult<PlanRequest> {
    serde_json::from_value(value)
        .map_err(|e| CliError::invalid_request(format!("invalid plan request: {}", e)))
}

fn load_config(path: &Path) -> CliResult<GatewayConfig> {
    let config = GatewayConfig::load(path)?;
    let tables = config.tables.len().to_string();
    let catalog = config.catalog.len().to_string();
    log_event(
        Event::ConfigLoaded,
        &[
            ("catalog_tables", &catalog),
            ("path", &path.display().to_string()),
            ("tables", &tables),
        ],
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::PlannerConfig;
    use crate::cli::config::{CatalogTableConfig, ShardKeyConfig, TableConfig};
    use crate::rule::ShardFunction;

    fn config() -> GatewayConfig {
        GatewayConfig {
            default_db_group: "school".into(),
            tables: vec![TableConfig {
                name: "student".into(),
                db_pattern: "school_${0000}".into(),
                table_pattern: "student_${0000}".into(),
                db_count: 2,
                tables_per_db: 2,
                shard_key: Some(ShardKeyConfig {
                    column: "uid".into(),
                    function: ShardFunction::Mod,
                }),
                allow_full_scan: false,
            }],
            catalog: vec![CatalogTableConfig {
                database: "school_0001".into(),
                table: "student_0003".into(),
                columns: vec!["uid".into(), "name".into()],
            }],
            planner: PlannerConfig::default(),
        }
    }

    fn run_lines(input: &str, mode: OutputMode) -> String {
        let mut out = Vec::new();
        plan_stream(&config(), input.as_bytes(), &mut out, mode).unwrap();
        String::from_utf8(out).unwrap()
    }

    const POINT_QUERY: &str = r#"{"sql":"select * from student where uid = ?","statement":{"type":"select","select":[{"kind":"all"}],"from":[{"source":{"kind":"table","name":"student"}}],"where":{"kind":"compare","op":"eq","left":{"kind":"column","name":"uid"},"right":{"kind":"param","index":0}}},"args":[7]}"#;

    #[test]
    fn test_plan_stream_json() {
        let text = run_lines(POINT_QUERY, OutputMode::Json);
        let response: Value = serde_json::from_str(text.trim()).unwrap();

        assert_eq!(response["status"], "ok");
        let plan = &response["data"]["plan"];
        assert_eq!(plan["node"], "scan");
        assert_eq!(plan["database"], "school_0001");
        assert_eq!(plan["tables"], json!(["student_0003"]));
        assert_eq!(plan["stmt"]["select"][0]["column"]["name"], "uid");
    }

    #[test]
    fn test_plan_stream_continues_after_errors() {
        let full_scan = r#"{"sql":"select uid from student","statement":{"type":"select","select":[{"kind":"column","column":{"name":"uid"}}],"from":[{"source":{"kind":"table","name":"student"}}]}}"#;
        let input = format!("{}\nnot json\n{}\n", full_scan, POINT_QUERY);
        let text = run_lines(&input, OutputMode::Json);
        let lines: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["code"], "SHARD_FULL_SCAN_DENIED");
        assert_eq!(lines[1]["code"], "SHARD_CLI_INVALID_REQUEST");
        assert_eq!(lines[2]["status"], "ok");
    }

    #[test]
    fn test_plan_stream_explain() {
        let text = run_lines(POINT_QUERY, OutputMode::Explain);
        assert!(text.starts_with("=== EXPLAIN PLAN ==="));
        assert!(text.contains("Scan db=school_0001 tables=[student_0003] star_expanded"));
    }

    #[test]
    fn test_summary() {
        let summary = summary(&config()).unwrap();
        assert_eq!(summary["tables"], json!(["student"]));
        assert_eq!(summary["catalog_tables"], 1);
    }
}
