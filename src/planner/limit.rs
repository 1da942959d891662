//! LIMIT/OFFSET rewrite for independent per-shard execution
//!
//! Any shard may contribute anywhere from none to all rows of the window
//! `[offset, offset + limit)` of the merged result. Every shard therefore
//! reads `LIMIT offset + limit OFFSET 0`, and the merge-time Limit node skips
//! `offset` rows and keeps `limit`.

use serde::Serialize;
use serde_json::Value;

use super::ast::{LimitClause, LimitValue, SelectStatement};
use super::errors::{PlannerError, PlannerResult};

/// Window the merge-time Limit node slices out of the over-fetched stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LimitWindow {
    /// Offset the client asked for
    pub offset: u64,
    /// Rows each shard is asked for: requested offset + requested limit
    pub limit: u64,
}

/// Rewrites `stmt`'s LIMIT clause in place so every shard returns the leading
/// `offset + limit` rows, appending synthetic arguments when only one operand
/// is a placeholder.
///
/// Returns the requested offset and the combined limit; `(0, 0)` when the
/// statement has no LIMIT.
pub fn rewrite_limit(stmt: &mut SelectStatement, args: &mut Vec<Value>) -> PlannerResult<LimitWindow> {
    let Some(clause) = stmt.limit else {
        return Ok(LimitWindow::default());
    };

    let offset_op = clause.offset_value();
    let limit_op = clause.limit;

    if let (LimitValue::Param(a), LimitValue::Param(b)) = (offset_op, limit_op) {
        if a == b {
            return Err(PlannerError::invalid_limit(format!(
                "offset and limit share placeholder ?{}",
                a
            )));
        }
    }

    let offset = resolve(offset_op, args, "offset")?;
    let limit = resolve(limit_op, args, "limit")?;
    let combined = offset.checked_add(limit).ok_or_else(|| {
        PlannerError::invalid_limit(format!("offset {} + limit {} overflows", offset, limit))
    })?;

    if !offset_op.is_param() && !limit_op.is_param() {
        stmt.limit = Some(
            LimitClause::new(LimitValue::Literal(combined)).with_offset(LimitValue::Literal(0)),
        );
        return Ok(LimitWindow {
            offset,
            limit: combined,
        });
    }

    let offset_idx = match offset_op {
        LimitValue::Param(i) => i,
        LimitValue::Literal(_) => push_arg(args, 0),
    };
    let limit_idx = match limit_op {
        LimitValue::Param(i) => i,
        LimitValue::Literal(l) => push_arg(args, l),
    };

    args[limit_idx] = Value::from(combined);
    args[offset_idx] = Value::from(0u64);
    stmt.limit = Some(
        LimitClause::new(LimitValue::Param(limit_idx)).with_offset(LimitValue::Param(offset_idx)),
    );

    Ok(LimitWindow {
        offset,
        limit: combined,
    })
}

fn push_arg(args: &mut Vec<Value>, value: u64) -> usize {
    args.push(Value::from(value));
    args.len() - 1
}

fn resolve(op: LimitValue, args: &[Value], what: &str) -> PlannerResult<u64> {
    match op {
        LimitValue::Literal(v) => Ok(v),
        LimitValue::Param(index) => {
            let value = args.get(index).ok_or_else(|| {
                PlannerError::invalid_limit(format!(
                    "{} placeholder ?{} is out of range ({} arguments bound)",
                    what,
                    index,
                    args.len()
                ))
            })?;
            value.as_u64().ok_or_else(|| {
                PlannerError::invalid_limit(format!(
                    "{} argument ?{} is not a non-negative integer: {}",
                    what, index, value
                ))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::ast::{SelectElement, TableName};
    use crate::planner::PlannerErrorCode;
    use serde_json::json;

    fn stmt(limit: Option<LimitClause>) -> SelectStatement {
        let mut s = SelectStatement::new(vec![SelectElement::star()])
            .from_table(TableName::new("student"));
        s.limit = limit;
        s
    }

    #[test]
    fn test_no_limit() {
        let mut s = stmt(None);
        let mut args = vec![json!(1)];
        let window = rewrite_limit(&mut s, &mut args).unwrap();

        assert_eq!(window, LimitWindow::default());
        assert_eq!(s.limit, None);
        assert_eq!(args, vec![json!(1)]);
    }

    #[test]
    fn test_literal_limit_offset() {
        let mut s = stmt(Some(
            LimitClause::new(LimitValue::Literal(5)).with_offset(LimitValue::Literal(100)),
        ));
        let mut args = Vec::new();
        let window = rewrite_limit(&mut s, &mut args).unwrap();

        assert_eq!(window, LimitWindow { offset: 100, limit: 105 });
        assert_eq!(
            s.limit,
            Some(LimitClause::new(LimitValue::Literal(105)).with_offset(LimitValue::Literal(0)))
        );
        assert!(args.is_empty());
    }

    #[test]
    fn test_literal_limit_without_offset() {
        let mut s = stmt(Some(LimitClause::new(LimitValue::Literal(10))));
        let window = rewrite_limit(&mut s, &mut Vec::new()).unwrap();
        assert_eq!(window, LimitWindow { offset: 0, limit: 10 });
    }

    #[test]
    fn test_both_params() {
        // SELECT * FROM student WHERE uid = ? LIMIT ? OFFSET ?
        let mut s = stmt(Some(
            LimitClause::new(LimitValue::Param(1)).with_offset(LimitValue::Param(2)),
        ));
        let mut args = vec![json!(7), json!(5), json!(20)];
        let window = rewrite_limit(&mut s, &mut args).unwrap();

        assert_eq!(window, LimitWindow { offset: 20, limit: 25 });
        assert_eq!(args, vec![json!(7), json!(25), json!(0)]);
        assert_eq!(
            s.limit,
            Some(LimitClause::new(LimitValue::Param(1)).with_offset(LimitValue::Param(2)))
        );
    }

    #[test]
    fn test_param_limit_literal_offset() {
        let mut s = stmt(Some(
            LimitClause::new(LimitValue::Param(0)).with_offset(LimitValue::Literal(30)),
        ));
        let mut args = vec![json!(10)];
        let window = rewrite_limit(&mut s, &mut args).unwrap();

        assert_eq!(window, LimitWindow { offset: 30, limit: 40 });
        assert_eq!(args, vec![json!(40), json!(0)]);
        assert_eq!(
            s.limit,
            Some(LimitClause::new(LimitValue::Param(0)).with_offset(LimitValue::Param(1)))
        );
    }

    #[test]
    fn test_literal_limit_param_offset() {
        let mut s = stmt(Some(
            LimitClause::new(LimitValue::Literal(10)).with_offset(LimitValue::Param(0)),
        ));
        let mut args = vec![json!(30)];
        let window = rewrite_limit(&mut s, &mut args).unwrap();

        assert_eq!(window, LimitWindow { offset: 30, limit: 40 });
        assert_eq!(args, vec![json!(0), json!(40)]);
        assert_eq!(
            s.limit,
            Some(LimitClause::new(LimitValue::Param(1)).with_offset(LimitValue::Param(0)))
        );
    }

    #[test]
    fn test_rewrite_of_original_is_repeatable() {
        let original = stmt(Some(
            LimitClause::new(LimitValue::Param(0)).with_offset(LimitValue::Param(1)),
        ));
        let args = vec![json!(10), json!(50)];

        let mut first = original.clone();
        let mut first_args = args.clone();
        let mut second = original.clone();
        let mut second_args = args.clone();

        let a = rewrite_limit(&mut first, &mut first_args).unwrap();
        let b = rewrite_limit(&mut second, &mut second_args).unwrap();
        assert_eq!(a, b);
        assert_eq!(first_args, second_args);
    }

    #[test]
    fn test_rewrite_of_rewritten_reports_zero_offset() {
        let mut s = stmt(Some(
            LimitClause::new(LimitValue::Literal(5)).with_offset(LimitValue::Literal(10)),
        ));
        rewrite_limit(&mut s, &mut Vec::new()).unwrap();
        let again = rewrite_limit(&mut s, &mut Vec::new()).unwrap();
        assert_eq!(again, LimitWindow { offset: 0, limit: 15 });
    }

    #[test]
    fn test_param_out_of_range() {
        let mut s = stmt(Some(LimitClause::new(LimitValue::Param(4))));
        let err = rewrite_limit(&mut s, &mut vec![json!(1)]).unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::InvalidLimit);
    }

    #[test]
    fn test_param_not_integer() {
        let mut s = stmt(Some(LimitClause::new(LimitValue::Param(0))));
        let err = rewrite_limit(&mut s, &mut vec![json!("ten")]).unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::InvalidLimit);

        let err = rewrite_limit(&mut s, &mut vec![json!(-1)]).unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::InvalidLimit);
    }

    #[test]
    fn test_shared_placeholder_rejected() {
        let mut s = stmt(Some(
            LimitClause::new(LimitValue::Param(0)).with_offset(LimitValue::Param(0)),
        ));
        let err = rewrite_limit(&mut s, &mut vec![json!(3)]).unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::InvalidLimit);
    }

    #[test]
    fn test_overflow_rejected() {
        let mut s = stmt(Some(
            LimitClause::new(LimitValue::Literal(u64::MAX)).with_offset(LimitValue::Literal(1)),
        ));
        let err = rewrite_limit(&mut s, &mut Vec::new()).unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::InvalidLimit);
    }
}
