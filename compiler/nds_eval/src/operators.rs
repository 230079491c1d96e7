//! Operator semantics on evaluated operands.
//!
//! `and`/`or` short-circuit and are handled by the evaluator; everything
//! else lands here once both operands are values.

use std::cmp::Ordering;

use nds_ir::{BinaryOp, CompareOp, UnaryOp};

use crate::errors::{division_by_zero, invalid_operands, type_mismatch, EvalResult};
use crate::value::Value;

/// Numeric operands after promotion.
enum Numeric {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn numeric(left: &Value, right: &Value) -> Option<Numeric> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(Numeric::Ints(*a, *b)),
        _ => Some(Numeric::Floats(number_as_float(left)?, number_as_float(right)?)),
    }
}

fn number_as_float(value: &Value) -> Option<f64> {
    if value.is_number() {
        value.as_float()
    } else {
        None
    }
}

fn int_or_float(checked: Option<i64>, fallback: f64) -> Value {
    checked.map_or(Value::Float(fallback), Value::Int)
}

/// Floored modulo: the result takes the sign of the divisor.
fn floored_rem_i64(a: i64, b: i64) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) {
        r + b
    } else {
        r
    }
}

fn floored_rem_f64(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
        r + b
    } else {
        r
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    let fail = || invalid_operands(op.as_symbol(), left.type_name(), right.type_name());

    if let (BinaryOp::Add, Value::Str(a), Value::Str(b)) = (op, left, right) {
        let mut joined = String::with_capacity(a.len() + b.len());
        joined.push_str(a);
        joined.push_str(b);
        return Ok(Value::string(joined));
    }

    let operands = numeric(left, right).ok_or_else(fail)?;
    let value = match (op, operands) {
        (BinaryOp::Add, Numeric::Ints(a, b)) => int_or_float(a.checked_add(b), a as f64 + b as f64),
        (BinaryOp::Sub, Numeric::Ints(a, b)) => int_or_float(a.checked_sub(b), a as f64 - b as f64),
        (BinaryOp::Mul, Numeric::Ints(a, b)) => int_or_float(a.checked_mul(b), a as f64 * b as f64),
        (BinaryOp::Div, Numeric::Ints(_, 0)) | (BinaryOp::Mod, Numeric::Ints(_, 0)) => {
            return Err(division_by_zero());
        }
        (BinaryOp::Div, Numeric::Ints(a, b)) => {
            if a.checked_rem(b) == Some(0) {
                int_or_float(a.checked_div(b), a as f64 / b as f64)
            } else {
                Value::Float(a as f64 / b as f64)
            }
        }
        (BinaryOp::Mod, Numeric::Ints(a, b)) => Value::Int(floored_rem_i64(a, b)),

        (BinaryOp::Add, Numeric::Floats(a, b)) => Value::Float(a + b),
        (BinaryOp::Sub, Numeric::Floats(a, b)) => Value::Float(a - b),
        (BinaryOp::Mul, Numeric::Floats(a, b)) => Value::Float(a * b),
        (BinaryOp::Div | BinaryOp::Mod, Numeric::Floats(_, b)) if b == 0.0 => {
            return Err(division_by_zero());
        }
        (BinaryOp::Div, Numeric::Floats(a, b)) => Value::Float(a / b),
        (BinaryOp::Mod, Numeric::Floats(a, b)) => Value::Float(floored_rem_f64(a, b)),
        _ => return Err(fail()),
    };
    Ok(value)
}

fn ordering_matches(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::NotEq => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        _ => false,
    }
}

fn comparison(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (l, r) if l.is_number() && r.is_number() => number_as_float(l)
            .zip(number_as_float(r))
            .and_then(|(a, b)| a.partial_cmp(&b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Str(_), _) | (_, Value::Str(_)) => {
            Some(left.display_value().cmp(&right.display_value()))
        }
        _ => match op {
            BinaryOp::Eq => return Ok(Value::Bool(left == right)),
            BinaryOp::NotEq => return Ok(Value::Bool(left != right)),
            _ => return Err(invalid_operands(op.as_symbol(), left.type_name(), right.type_name())),
        },
    };
    // NaN compares unequal to everything.
    Ok(Value::Bool(ordering.is_some_and(|o| ordering_matches(op, o))
        || (op == BinaryOp::NotEq && ordering.is_none())))
}

/// Apply a strict binary operator. `And`/`Or` are evaluated lazily elsewhere
/// and only reach here with both operands already computed.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, left, right)
        }
        BinaryOp::And => Ok(if left.is_truthy() { right.clone() } else { left.clone() }),
        BinaryOp::Or => Ok(if left.is_truthy() { left.clone() } else { right.clone() }),
        _ => comparison(op, left, right),
    }
}

pub fn unary(op: UnaryOp, operand: &Value) -> EvalResult {
    match (op, operand) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.is_truthy())),
        (UnaryOp::Neg, Value::Int(n)) => Ok(int_or_float(n.checked_neg(), -(*n as f64))),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Neg, v) => Err(type_mismatch("number", v.type_name())),
    }
}

/// Coercing comparison: text if either side is a string, floats otherwise.
pub fn compare(op: CompareOp, left: &Value, right: &Value) -> EvalResult {
    let ordering = if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
        Some(left.display_value().cmp(&right.display_value()))
    } else {
        let a = coerce_float(left)?;
        let b = coerce_float(right)?;
        a.partial_cmp(&b)
    };
    let holds = match (op, ordering) {
        (CompareOp::NotEq, None) => true,
        (_, None) => false,
        (CompareOp::Eq, Some(o)) => o == Ordering::Equal,
        (CompareOp::NotEq, Some(o)) => o != Ordering::Equal,
        (CompareOp::Lt, Some(o)) => o == Ordering::Less,
        (CompareOp::LtEq, Some(o)) => o != Ordering::Greater,
        (CompareOp::Gt, Some(o)) => o == Ordering::Greater,
        (CompareOp::GtEq, Some(o)) => o != Ordering::Less,
    };
    Ok(Value::Bool(holds))
}

fn coerce_float(value: &Value) -> EvalResult<f64> {
    match value {
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        v => number_as_float(v).ok_or_else(|| type_mismatch("number", v.type_name())),
    }
}

#[cfg(test)]
mod tests;
