#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::errors::{EvalErrorKind, MisusedSignal};
use pretty_assertions::assert_eq;

fn names(list: &[&str]) -> Vec<Name> {
    list.iter().map(|s| Name::from(*s)).collect()
}

fn manager(limit: usize) -> ScopeManager {
    ScopeManager::new(Environment::new(), limit)
}

#[test]
fn test_enter_binds_params_in_child_of_global() {
    let mut scopes = manager(10);
    scopes.global().define("g", Value::Int(1));

    let env = scopes
        .enter_function(&Name::from("f"), &names(&["a", "b"]), vec![
            Value::Int(2),
            Value::Int(3),
        ])
        .unwrap();

    assert_eq!(env.get("a"), Ok(Value::Int(2)));
    assert_eq!(env.get("b"), Ok(Value::Int(3)));
    assert_eq!(env.get("g"), Ok(Value::Int(1)));
    assert!(env.parent().is_some_and(|p| p.ptr_eq(scopes.global())));
    assert_eq!(scopes.depth(), 1);
}

#[test]
fn test_arity_mismatch_pushes_nothing() {
    let mut scopes = manager(10);
    let err = scopes
        .enter_function(&Name::from("f"), &names(&["a"]), vec![])
        .unwrap_err();

    assert_eq!(
        err.kind,
        EvalErrorKind::ArityMismatch {
            name: "f".to_string(),
            expected: 1,
            got: 0,
        }
    );
    assert_eq!(scopes.depth(), 0);
}

#[test]
fn test_depth_limit_is_exact() {
    let mut scopes = manager(3);
    let f = Name::from("f");
    for _ in 0..3 {
        scopes.enter_function(&f, &[], vec![]).unwrap();
    }

    let err = scopes.enter_function(&f, &[], vec![]).unwrap_err();

    assert_eq!(err.kind, EvalErrorKind::RecursionLimit { limit: 3 });
    assert_eq!(scopes.depth(), 3);
}

#[test]
fn test_exit_returns_value_and_pops() {
    let mut scopes = manager(10);
    scopes.enter_function(&Name::from("f"), &[], vec![]).unwrap();

    assert_eq!(scopes.exit_function(Value::Int(7)), Ok(Value::Int(7)));
    assert!(scopes.is_empty());
}

#[test]
fn test_exit_on_empty_stack_is_error() {
    let mut scopes = manager(10);
    let err = scopes.exit_function(Value::None).unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::ControlFlowMisuse {
            signal: MisusedSignal::ExitWithoutCall
        }
    );
}

#[test]
fn test_trace_is_innermost_first() {
    let mut scopes = manager(10);
    scopes
        .enter_function(&Name::from("outer"), &[], vec![])
        .unwrap();
    scopes
        .enter(
            CallKind::Macro,
            &Name::from("inner"),
            &names(&["x"]),
            vec![Value::Int(4)],
            Some(Span::new(2, 3)),
        )
        .unwrap();

    assert_eq!(
        scopes.get_call_stack_trace(),
        vec![
            "in macro 'inner' (x = 4) called at 2:3".to_string(),
            "in function 'outer'".to_string(),
        ]
    );
    assert_eq!(scopes.macro_depth(), 1);

    let backtrace = scopes.capture();
    assert_eq!(backtrace.frames()[0].name, "inner");
    assert_eq!(backtrace.frames()[1].name, "outer");
}

#[test]
fn test_attach_backtrace_keeps_deeper_capture() {
    let mut scopes = manager(10);
    scopes.enter_function(&Name::from("a"), &[], vec![]).unwrap();
    scopes.enter_function(&Name::from("b"), &[], vec![]).unwrap();
    let deep = scopes.attach_backtrace(EvalError::new("boom"));
    scopes.exit_function(Value::None).unwrap();

    let again = scopes.attach_backtrace(deep);

    assert_eq!(again.backtrace.map(|b| b.len()), Some(2));
}

#[test]
fn test_frames_do_not_see_each_other() {
    let mut scopes = manager(10);
    let outer = scopes
        .enter_function(&Name::from("outer"), &names(&["secret"]), vec![Value::Int(1)])
        .unwrap();
    let inner = scopes.enter_function(&Name::from("inner"), &[], vec![]).unwrap();

    assert!(outer.has("secret"));
    assert!(!inner.has("secret"));
}
