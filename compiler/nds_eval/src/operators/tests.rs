use super::*;
use crate::errors::EvalErrorKind;

fn int(n: i64) -> Value {
    Value::Int(n)
}

#[test]
fn test_int_arithmetic_stays_int() {
    assert_eq!(binary(BinaryOp::Add, &int(2), &int(3)), Ok(int(5)));
    assert_eq!(binary(BinaryOp::Mul, &int(4), &int(-2)), Ok(int(-8)));
    assert_eq!(binary(BinaryOp::Div, &int(8), &int(2)), Ok(int(4)));
}

#[test]
fn test_inexact_division_yields_float() {
    assert_eq!(binary(BinaryOp::Div, &int(7), &int(2)), Ok(Value::Float(3.5)));
}

#[test]
fn test_float_promotion() {
    assert_eq!(
        binary(BinaryOp::Add, &int(1), &Value::Float(0.5)),
        Ok(Value::Float(1.5))
    );
}

#[test]
fn test_overflow_promotes_to_float() {
    assert!(matches!(
        binary(BinaryOp::Add, &int(i64::MAX), &int(1)),
        Ok(Value::Float(_))
    ));
}

#[test]
fn test_modulo_follows_divisor_sign() {
    assert_eq!(binary(BinaryOp::Mod, &int(-7), &int(3)), Ok(int(2)));
    assert_eq!(binary(BinaryOp::Mod, &int(7), &int(-3)), Ok(int(-2)));
}

#[test]
fn test_division_by_zero() {
    for op in [BinaryOp::Div, BinaryOp::Mod] {
        let err = binary(op, &int(1), &int(0)).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
        let err = binary(op, &Value::Float(1.0), &Value::Float(0.0)).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
    }
}

#[test]
fn test_string_concatenation() {
    assert_eq!(
        binary(BinaryOp::Add, &Value::from("مرحبا "), &Value::from("world")),
        Ok(Value::from("مرحبا world"))
    );
    assert!(binary(BinaryOp::Sub, &Value::from("a"), &Value::from("b")).is_err());
    assert!(binary(BinaryOp::Add, &Value::from("a"), &int(1)).is_err());
}

#[test]
fn test_strict_comparisons() {
    assert_eq!(binary(BinaryOp::Lt, &int(1), &Value::Float(1.5)), Ok(Value::Bool(true)));
    assert_eq!(binary(BinaryOp::Eq, &int(2), &Value::Float(2.0)), Ok(Value::Bool(true)));
    assert_eq!(
        binary(BinaryOp::GtEq, &Value::from("b"), &Value::from("a")),
        Ok(Value::Bool(true))
    );
    assert_eq!(binary(BinaryOp::Eq, &Value::None, &Value::None), Ok(Value::Bool(true)));
    assert!(binary(BinaryOp::Lt, &Value::None, &int(1)).is_err());
}

#[test]
fn test_nan_is_unequal() {
    let nan = Value::Float(f64::NAN);
    assert_eq!(binary(BinaryOp::Eq, &nan, &nan), Ok(Value::Bool(false)));
    assert_eq!(binary(BinaryOp::NotEq, &nan, &nan), Ok(Value::Bool(true)));
}

#[test]
fn test_unary() {
    assert_eq!(unary(UnaryOp::Neg, &int(3)), Ok(int(-3)));
    assert_eq!(unary(UnaryOp::Not, &int(0)), Ok(Value::Bool(true)));
    assert!(unary(UnaryOp::Neg, &Value::from("x")).is_err());
}

#[test]
fn test_coercing_compare() {
    // Mixed string/number compares as text.
    assert_eq!(
        compare(CompareOp::Eq, &Value::from("3"), &int(3)),
        Ok(Value::Bool(true))
    );
    // Booleans count as numbers.
    assert_eq!(
        compare(CompareOp::Gt, &Value::Bool(true), &Value::Float(0.5)),
        Ok(Value::Bool(true))
    );
    assert!(compare(CompareOp::Lt, &Value::None, &int(1)).is_err());
}
