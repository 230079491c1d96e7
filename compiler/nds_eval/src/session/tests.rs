#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use pretty_assertions::assert_eq;

fn sample() -> SessionSnapshot {
    let mut variables = BTreeMap::new();
    variables.insert("x".to_string(), Value::Int(3));
    variables.insert("name".to_string(), Value::from("nova"));
    SessionSnapshot {
        universe_initialized: false,
        timestamp: 1_700_000_000.5,
        variables,
        functions: vec!["square".to_string()],
        macros: vec![],
        universe_state: None,
    }
}

#[test]
fn test_memory_store_round_trip() {
    let store = MemoryStateStore::new();
    assert!(store.is_empty());
    store.save("run.nds", &sample()).unwrap();
    assert_eq!(store.load("run.nds").unwrap(), sample());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_memory_store_missing_path() {
    let err = MemoryStateStore::new().load("absent").unwrap_err();
    assert!(err.contains("absent"));
}

#[test]
fn test_snapshot_survives_serialization() {
    let bytes = bincode::serialize(&sample()).unwrap();
    let decoded: SessionSnapshot = bincode::deserialize(&bytes).unwrap();
    assert_eq!(decoded, sample());
}

#[test]
fn test_timestamp_is_recent() {
    assert!(unix_timestamp() > 1_600_000_000.0);
}
