//! Persisted session record and the storage collaborator.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::universe::UniverseState;
use crate::value::Value;

/// Everything `save` writes and `load` reads back.
///
/// Function and macro bodies are not part of the record, only their names.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub universe_initialized: bool,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub variables: BTreeMap<String, Value>,
    pub functions: Vec<String>,
    pub macros: Vec<String>,
    pub universe_state: Option<UniverseState>,
}

pub(crate) fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

/// File-persistence collaborator behind `save` and `load`.
pub trait StateStore: Send + Sync {
    fn save(&self, path: &str, snapshot: &SessionSnapshot) -> Result<(), String>;
    fn load(&self, path: &str) -> Result<SessionSnapshot, String>;
}

/// In-memory store keyed by path.
#[derive(Default)]
pub struct MemoryStateStore {
    records: Mutex<FxHashMap<String, SessionSnapshot>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<SessionSnapshot> {
        self.records.lock().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl StateStore for MemoryStateStore {
    fn save(&self, path: &str, snapshot: &SessionSnapshot) -> Result<(), String> {
        self.records
            .lock()
            .insert(path.to_string(), snapshot.clone());
        Ok(())
    }

    fn load(&self, path: &str) -> Result<SessionSnapshot, String> {
        self.get(path)
            .ok_or_else(|| format!("no saved session at '{path}'"))
    }
}

#[cfg(test)]
mod tests;
