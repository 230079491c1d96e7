use super::*;
use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;

fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: FxHashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults() {
    let config = InterpreterConfig::default();
    assert_eq!(config.max_call_depth, 1000);
    assert_eq!(config.max_while_iterations, 10_000);
    assert_eq!(config.loop_guard, LoopGuardPolicy::Warn);
    assert_eq!(config.parallel.sample_size, 5);
    assert_eq!(config.parallel.timeout, Some(Duration::from_secs(30)));
    assert_eq!(config.parallel.max_iterations, DEFAULT_MAX_PARALLEL_ITERATIONS);
}

#[test]
fn test_env_overlay() {
    let config = InterpreterConfig::from_vars(vars(&[
        ("NDS_MAX_CALL_DEPTH", "64"),
        ("NDS_MAX_WHILE_ITERATIONS", " 500 "),
        ("NDS_LOOP_GUARD", "Error"),
        ("NDS_PARALLEL_WORKERS", "2"),
        ("NDS_PARALLEL_TIMEOUT_MS", "0"),
        ("NDS_PARALLEL_MAX_ITERATIONS", "5000"),
    ]));
    assert_eq!(config.max_call_depth, 64);
    assert_eq!(config.max_while_iterations, 500);
    assert_eq!(config.loop_guard, LoopGuardPolicy::Error);
    assert_eq!(config.parallel.max_workers, Some(2));
    assert_eq!(config.parallel.timeout, None);
    assert_eq!(config.parallel.max_iterations, 5000);
}

#[test]
fn test_bad_values_keep_defaults() {
    let config = InterpreterConfig::from_vars(vars(&[
        ("NDS_MAX_CALL_DEPTH", "deep"),
        ("NDS_LOOP_GUARD", "panic"),
    ]));
    assert_eq!(config, InterpreterConfig::default());
}

#[test]
fn test_builder_setters() {
    let config = InterpreterConfig::default()
        .max_call_depth(10)
        .max_while_iterations(3)
        .loop_guard(LoopGuardPolicy::Error)
        .silent(true);
    assert_eq!(config.max_call_depth, 10);
    assert_eq!(config.max_while_iterations, 3);
    assert!(config.silent);
}
