#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::errors::EvalErrorKind;

fn call(env: &Environment, name: &str, args: &[Value]) -> EvalResult {
    match env.get(name)? {
        Value::Builtin(builtin) => builtin.call(args),
        other => panic!("{name} is bound to {other}"),
    }
}

fn globals() -> Environment {
    let env = Environment::new();
    seed_globals(&env);
    env
}

#[test]
fn test_constants_are_seeded() {
    let env = globals();
    assert_eq!(env.get("π"), Ok(Value::Float(std::f64::consts::PI)));
    assert_eq!(env.get("c"), Ok(Value::Int(299_792_458)));
    assert!(env.has("hbar"));
    assert!(env.has("φ"));
}

#[test]
fn test_arabic_aliases_share_implementation() {
    let env = globals();
    assert_eq!(call(&env, "جذر", &[Value::Int(9)]), Ok(Value::Float(3.0)));
    assert_eq!(call(&env, "مطلق", &[Value::Int(-4)]), Ok(Value::Int(4)));
    assert_eq!(
        call(&env, "أعلى", &[Value::Int(1), Value::Int(7), Value::Int(3)]),
        Ok(Value::Int(7))
    );
    assert_eq!(
        call(&env, "أدنى", &[Value::Float(1.5), Value::Int(1)]),
        Ok(Value::Int(1))
    );
}

#[test]
fn test_min_max_accept_a_list() {
    let env = globals();
    let list = Value::list(vec![Value::Int(4), Value::Int(-2), Value::Int(9)]);
    assert_eq!(call(&env, "min", &[list.clone()]), Ok(Value::Int(-2)));
    assert_eq!(call(&env, "max", &[list]), Ok(Value::Int(9)));
    assert!(call(&env, "max", &[]).is_err());
}

#[test]
fn test_round_and_pow() {
    let env = globals();
    assert_eq!(call(&env, "round", &[Value::Float(2.5)]), Ok(Value::Int(2)));
    assert_eq!(call(&env, "round", &[Value::Float(3.5)]), Ok(Value::Int(4)));
    assert_eq!(
        call(&env, "round", &[Value::Float(1.2345), Value::Int(2)]),
        Ok(Value::Float(1.23))
    );
    assert_eq!(call(&env, "pow", &[Value::Int(2), Value::Int(10)]), Ok(Value::Int(1024)));
    assert_eq!(
        call(&env, "قوة", &[Value::Int(2), Value::Int(-1)]),
        Ok(Value::Float(0.5))
    );
}

#[test]
fn test_len_counts_characters() {
    let env = globals();
    assert_eq!(call(&env, "len", &[Value::from("سلام")]), Ok(Value::Int(4)));
}

#[test]
fn test_errors_are_reported_not_panics() {
    let env = globals();
    let err = call(&env, "sqrt", &[Value::Int(1), Value::Int(2)]).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::ArityMismatch { .. }));

    let err = call(&env, "sin", &[Value::from("x")]).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::TypeMismatch { .. }));

    assert!(call(&env, "log", &[Value::Int(0)]).is_err());
    assert!(call(&env, "sqrt", &[Value::Int(-1)]).is_err());
}

#[test]
fn test_is_seeded() {
    let env = globals();
    assert!(is_seeded("pi", &env.get("pi").unwrap()));
    assert!(is_seeded("abs", &env.get("abs").unwrap()));
    assert!(!is_seeded("pi", &Value::Int(3)));
    assert!(!is_seeded("x", &Value::Int(1)));
}
