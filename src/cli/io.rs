//! JSON line I/O for the CLI
//!
//! - Input: one JSON request per line
//! - Output: one JSON object per line
//! - UTF-8 only

use std::io::{BufRead, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Reads JSON requests line by line, skipping blank lines
pub fn read_requests<R: BufRead>(input: R) -> impl Iterator<Item = CliResult<Value>> {
    input.lines().filter_map(|line| match line {
        Err(e) => Some(Err(CliError::from(e))),
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(
            serde_json::from_str(&line)
                .map_err(|e| CliError::invalid_request(format!("malformed JSON: {}", e))),
        ),
    })
}

/// Write a success response
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    serde_json::to_writer(&mut *out, &response)?;
    writeln!(out)?;
    out.flush()?;

    Ok(())
}

/// Write an error response
pub fn write_error<W: Write>(out: &mut W, code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });

    serde_json::to_writer(&mut *out, &response)?;
    writeln!(out)?;
    out.flush()?;

    Ok(())
}

/// Write preformatted text
pub fn write_text<W: Write>(out: &mut W, text: &str) -> CliResult<()> {
    write!(out, "{}", text)?;
    out.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_requests_skips_blank_lines() {
        let input = "{\"a\":1}\n\n   \n{\"a\":2}\n";
        let values: Vec<Value> = read_requests(input.as_bytes())
            .collect::<CliResult<_>>()
            .unwrap();
        assert_eq!(values, vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[test]
    fn test_read_requests_reports_bad_json() {
        let mut it = read_requests("not json\n".as_bytes());
        let err = it.next().unwrap().unwrap_err();
        assert_eq!(err.code_str(), "SHARD_CLI_INVALID_REQUEST");
    }

    #[test]
    fn test_write_lines() {
        let mut out = Vec::new();
        write_response(&mut out, json!({"x": 1})).unwrap();
        write_error(&mut out, "SHARD_INVALID_LIMIT", "bad").unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0], json!({"status": "ok", "data": {"x": 1}}));
        assert_eq!(lines[1]["code"], "SHARD_INVALID_LIMIT");
    }
}
