//! `parallel for` through the evaluator.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use nds_eval::{
    buffer_handler, EvalErrorKind, ExecutionStrategy, Interpreter, InterpreterBuilder,
    InterpreterConfig, ParallelConfig, Value,
};
use nds_ir::{BinaryOp, CompareOp, Expr, Program, Stmt, StmtKind};
use pretty_assertions::assert_eq;

fn interpreter_with(parallel: ParallelConfig) -> Interpreter {
    InterpreterBuilder::new()
        .config(InterpreterConfig::default().parallel(parallel))
        .print_handler(buffer_handler())
        .build()
}

fn eager() -> ParallelConfig {
    ParallelConfig {
        light_threshold: 1,
        medium_threshold: 1,
        heavy_threshold: 1,
        max_workers: Some(4),
        ..ParallelConfig::default()
    }
}

fn square_of(name: &str) -> Expr {
    Expr::binary(BinaryOp::Mul, Expr::ident(name), Expr::ident(name))
}

fn parallel_squares(end: i64) -> Stmt {
    Stmt::parallel_for(
        "i",
        Expr::int(0),
        Expr::int(end),
        None,
        vec![Stmt::expr(square_of("i"))],
    )
}

#[test]
fn test_results_match_sequential_order() {
    let mut interp = interpreter_with(eager());
    let value = interp
        .run_program(&Program::new(vec![parallel_squares(100)]))
        .unwrap();
    let expected = Value::list((0..100).map(|i| Value::Int(i * i)).collect());
    assert_eq!(value, expected);

    let report = interp.last_parallel_report().unwrap();
    assert!(report.is_clean());
    assert_eq!(report.plan.iterations, 100);
    assert_ne!(report.plan.strategy, ExecutionStrategy::Sequential);
}

#[test]
fn test_small_loop_stays_sequential_with_defaults() {
    let mut interp = interpreter_with(ParallelConfig::default());
    let value = interp
        .run_program(&Program::new(vec![parallel_squares(4)]))
        .unwrap();
    assert_eq!(
        value,
        Value::list(vec![Value::Int(0), Value::Int(1), Value::Int(4), Value::Int(9)])
    );
    let stats = interp.parallel_stats();
    assert_eq!(stats.sequential_runs, 1);
    assert_eq!(stats.parallel_runs, 0);
    assert_eq!(stats.iterations, 4);
}

#[test]
fn test_iteration_locals_stay_local() {
    let mut interp = interpreter_with(eager());
    interp
        .run_program(&Program::new(vec![Stmt::parallel_for(
            "i",
            Expr::int(0),
            Expr::int(20),
            None,
            vec![Stmt::assign("tmp", square_of("i"))],
        )]))
        .unwrap();
    assert!(!interp.global_env().has("i"));
    assert!(!interp.global_env().has("tmp"));
}

#[test]
fn test_existing_outer_names_are_written_through() {
    let mut interp = interpreter_with(eager());
    interp
        .run_program(&Program::new(vec![
            Stmt::assign("flag", Expr::int(0)),
            Stmt::parallel_for(
                "i",
                Expr::int(0),
                Expr::int(10),
                None,
                vec![Stmt::if_else(
                    Expr::compare(CompareOp::Eq, Expr::ident("i"), Expr::int(7)),
                    vec![Stmt::assign("flag", Expr::ident("i"))],
                    None,
                )],
            ),
        ]))
        .unwrap();
    assert_eq!(interp.global_env().lookup("flag"), Some(Value::Int(7)));
}

#[test]
fn test_body_can_call_user_functions() {
    let mut interp = interpreter_with(eager());
    let value = interp
        .run_program(&Program::new(vec![
            Stmt::function("sq", &["n"], vec![Stmt::ret(Some(square_of("n")))]),
            Stmt::parallel_for(
                "k",
                Expr::int(1),
                Expr::int(6),
                None,
                vec![Stmt::expr(Expr::call("sq", vec![Expr::ident("k")]))],
            ),
        ]))
        .unwrap();
    assert_eq!(
        value,
        Value::list((1..6).map(|k| Value::Int(k * k)).collect())
    );
    assert_eq!(interp.call_depth(), 0);
}

#[test]
fn test_failing_iteration_leaves_marker_and_warning() {
    let mut interp = interpreter_with(eager());
    let value = interp
        .run_program(&Program::new(vec![Stmt::parallel_for(
            "i",
            Expr::int(0),
            Expr::int(10),
            None,
            vec![Stmt::expr(Expr::binary(
                BinaryOp::Div,
                Expr::int(10),
                Expr::binary(BinaryOp::Sub, Expr::ident("i"), Expr::int(3)),
            ))],
        )]))
        .unwrap();

    let Value::List(items) = value else {
        panic!("expected a list, got {value:?}");
    };
    assert_eq!(items.len(), 10);
    assert!(items[3].is_failure());
    assert_eq!(items.iter().filter(|v| v.is_failure()).count(), 1);

    let report = interp.last_parallel_report().unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 3);
    assert_eq!(
        interp.warnings(),
        vec!["1 of 10 parallel iterations failed".to_string()]
    );
}

#[test]
fn test_break_and_continue_end_only_their_iteration() {
    let mut interp = interpreter_with(eager());
    let value = interp
        .run_program(&Program::new(vec![Stmt::parallel_for(
            "i",
            Expr::int(0),
            Expr::int(4),
            None,
            vec![
                Stmt::if_else(
                    Expr::compare(CompareOp::Eq, Expr::ident("i"), Expr::int(1)),
                    vec![Stmt::brk()],
                    None,
                ),
                Stmt::if_else(
                    Expr::compare(CompareOp::Eq, Expr::ident("i"), Expr::int(2)),
                    vec![Stmt::cont()],
                    None,
                ),
                Stmt::expr(Expr::ident("i")),
            ],
        )]))
        .unwrap();
    assert_eq!(
        value,
        Value::list(vec![Value::Int(0), Value::None, Value::None, Value::Int(3)])
    );
}

#[test]
fn test_return_in_body_is_an_iteration_failure() {
    let mut interp = interpreter_with(eager());
    let value = interp
        .run_program(&Program::new(vec![Stmt::parallel_for(
            "i",
            Expr::int(0),
            Expr::int(3),
            None,
            vec![Stmt::ret(Some(Expr::ident("i")))],
        )]))
        .unwrap();
    let Value::List(items) = value else {
        panic!("expected a list");
    };
    assert!(items.iter().all(Value::is_failure));
}

#[test]
fn test_slow_iterations_time_out() {
    let mut interp = InterpreterBuilder::new()
        .config(
            InterpreterConfig::default()
                .max_while_iterations(usize::MAX)
                .parallel(ParallelConfig {
                    sample_size: 0,
                    timeout: Some(Duration::from_millis(1)),
                    ..eager()
                }),
        )
        .print_handler(buffer_handler())
        .build();
    // Every iteration spins far longer than the deadline.
    let spin = Stmt::while_loop(
        Expr::compare(CompareOp::Lt, Expr::ident("n"), Expr::int(1_000_000)),
        vec![Stmt::assign(
            "n",
            Expr::binary(BinaryOp::Add, Expr::ident("n"), Expr::int(1)),
        )],
    );
    let value = interp
        .run_program(&Program::new(vec![Stmt::parallel_for(
            "i",
            Expr::int(0),
            Expr::int(8),
            None,
            vec![Stmt::assign("n", Expr::int(0)), spin],
        )]))
        .unwrap();
    let Value::List(items) = value else {
        panic!("expected a list");
    };
    assert_eq!(items.len(), 8);
    let report = interp.last_parallel_report().unwrap();
    assert!(!report.failures.is_empty());
    assert!(report.failures.iter().all(|f| f.message.contains("timed out")));
}

#[test]
fn test_oversized_domain_is_reported_not_allocated() {
    let mut interp = interpreter_with(eager());
    let err = interp
        .run_program(&Program::new(vec![Stmt::parallel_for(
            "i",
            Expr::int(0),
            Expr::int(i64::MAX),
            None,
            vec![Stmt::brk()],
        )]))
        .unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::ParallelDomainTooLarge { .. }));
    assert!(interp.last_parallel_report().is_none());
}

#[test]
fn test_benchmark_compares_sequential_and_parallel_runs() {
    let mut interp = interpreter_with(ParallelConfig::default());
    let Stmt {
        kind: StmtKind::ParallelFor(stmt),
        ..
    } = parallel_squares(50)
    else {
        panic!("expected a parallel for");
    };
    let report = interp.benchmark_parallel_for(&stmt, 2).unwrap();

    assert_eq!(report.iterations, 50);
    assert_eq!(report.rounds, 2);
    assert_ne!(report.strategy, ExecutionStrategy::Sequential);
    assert!(report.workers >= 1);
    // Benchmarks are not recorded as loop runs.
    assert_eq!(interp.parallel_stats().total_runs(), 0);
}
