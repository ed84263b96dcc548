//! Binary and unary operator semantics.
//!
//! Short-circuiting `&&`/`||` never reach this module; the expression
//! evaluator handles them before evaluating the right operand. Everything
//! here is a pure function of already-evaluated operands, with the span
//! attached by the caller.

use quill_ir::{BinaryOp, UnaryOp};

use crate::errors::{division_by_zero, invalid_comparison, type_mismatch, EvalError};
use crate::Value;

/// Apply a non-short-circuiting binary operator.
pub fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add => add(lhs, rhs),
        BinaryOp::Sub => arith(lhs, rhs, |a, b| Ok(a - b)),
        BinaryOp::Mul => arith(lhs, rhs, |a, b| Ok(a * b)),
        BinaryOp::Div => arith(lhs, rhs, |a, b| {
            if b == 0.0 {
                Err(division_by_zero())
            } else {
                Ok(a / b)
            }
        }),
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(lhs, rhs))),
        BinaryOp::NotEq => Ok(Value::Bool(!loose_eq(lhs, rhs))),
        BinaryOp::Lt => compare(lhs, rhs).map(|ord| Value::Bool(ord == std::cmp::Ordering::Less)),
        BinaryOp::LtEq => compare(lhs, rhs).map(|ord| Value::Bool(ord != std::cmp::Ordering::Greater)),
        BinaryOp::Gt => compare(lhs, rhs).map(|ord| Value::Bool(ord == std::cmp::Ordering::Greater)),
        BinaryOp::GtEq => compare(lhs, rhs).map(|ord| Value::Bool(ord != std::cmp::Ordering::Less)),
        // Handled by the evaluator; falling through here is a logic error,
        // so evaluate non-short-circuiting as a safe default.
        BinaryOp::And => Ok(Value::Bool(lhs.is_truthy() && rhs.is_truthy())),
        BinaryOp::Or => Ok(Value::Bool(lhs.is_truthy() || rhs.is_truthy())),
    }
}

/// Apply a unary operator.
pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Neg => {
            let n = operand
                .as_number()
                .ok_or_else(|| type_mismatch("number", operand))?;
            Ok(Value::Number(-n))
        }
    }
}

/// Dual `+`: numeric addition when both operands coerce to numbers,
/// string concatenation when either operand is a string that does not.
fn add(lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
        return Ok(Value::Number(a + b));
    }
    if matches!(lhs, Value::Str(_)) || matches!(rhs, Value::Str(_)) {
        let mut out = lhs.to_display_string();
        out.push_str(&rhs.to_display_string());
        return Ok(Value::string(out));
    }
    let offender = if lhs.as_number().is_none() { lhs } else { rhs };
    Err(type_mismatch("number or string", offender))
}

fn arith(
    lhs: &Value,
    rhs: &Value,
    f: impl FnOnce(f64, f64) -> Result<f64, EvalError>,
) -> Result<Value, EvalError> {
    let a = lhs.as_number().ok_or_else(|| type_mismatch("number", lhs))?;
    let b = rhs.as_number().ok_or_else(|| type_mismatch("number", rhs))?;
    f(a, b).map(Value::Number)
}

/// Loose equality: numeric when both sides coerce to numbers (so
/// `"1.0" == 1` and `"1.0" == "1"`), structural otherwise. `null` equals
/// only `null`.
pub fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
        return a == b;
    }
    match (lhs, rhs) {
        (Value::Null, Value::Null) => true,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && loose_eq(va, vb))
        }
        (Value::Date(a), Value::Date(b)) => a == b,
        (Value::DateTime(a), Value::DateTime(b)) => a == b,
        _ => false,
    }
}

/// Ordered comparison for `<`, `<=`, `>`, `>=`.
///
/// Numeric when both sides coerce to numbers (numeric strings included,
/// so `"9" < "10"`), lexicographic for the remaining string pairs,
/// chronological for temporal pairs. Anything else is an
/// `InvalidComparison`.
pub fn compare(lhs: &Value, rhs: &Value) -> Result<std::cmp::Ordering, EvalError> {
    if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
        return a
            .partial_cmp(&b)
            .ok_or_else(|| invalid_comparison(lhs, rhs));
    }
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Ok(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Ok(a.cmp(b)),
        _ => Err(invalid_comparison(lhs, rhs)),
    }
}
