#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::errors::EvalErrorKind;
use pretty_assertions::assert_eq;

#[test]
fn test_local_universe_counts_steps() {
    let mut universe = LocalUniverse::new(64);
    assert_eq!(universe.evolve(3), Ok(Value::Int(3)));
    assert_eq!(universe.evolve(2), Ok(Value::Int(2)));
    assert_eq!(universe.evolution_steps, 5);
    assert!(universe.evolve(-1).is_err());
}

#[test]
fn test_state_round_trip() {
    let mut original = LocalUniverse::new(32);
    original.evolve(7).unwrap();
    original.set_parameter("gravity", Value::Float(9.8)).unwrap();

    let state = original.get_state();
    assert_eq!(state.get("param.gravity"), Some(&Value::Float(9.8)));

    let mut restored = LocalUniverse::new(1);
    restored.set_state(&state).unwrap();
    assert_eq!(restored, original);
}

#[test]
fn test_set_state_rejects_missing_fields() {
    let mut universe = LocalUniverse::new(1);
    assert!(universe.set_state(&UniverseState::default()).is_err());
}

#[test]
fn test_shared_wrapper_maps_errors() {
    let shared = SharedUniverse::new(Box::new(LocalUniverse::new(10)));
    let err = shared.evolve(-5).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::Universe { .. }));
}

#[test]
fn test_shared_wrapper_serializes_concurrent_evolves() {
    let shared = SharedUniverse::new(Box::new(LocalUniverse::new(10)));

    std::thread::scope(|s| {
        for _ in 0..8 {
            let handle = shared.clone();
            s.spawn(move || {
                for _ in 0..100 {
                    handle.evolve(1).unwrap();
                }
            });
        }
    });

    assert_eq!(
        shared.get_state().get("evolution_steps"),
        Some(&Value::Int(800))
    );
}

#[test]
fn test_factory_builds_requested_size() {
    let factory = local_universe_factory();
    let universe = factory(25);
    assert_eq!(universe.get_state().get("size"), Some(&Value::Int(25)));
}
