//! Simulation collaborator boundary.
//!
//! The physics lives outside this crate behind the [`Universe`] trait. The
//! interpreter only ever touches it through [`SharedUniverse`], which holds
//! one lock for the full duration of each operation. Parallel-loop workers
//! share the same wrapper, so operations from different iterations are
//! serialized and never interleave inside the collaborator.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::{universe_failure, EvalResult};
use crate::value::Value;

/// Default grid size for `init` without an explicit size.
pub const DEFAULT_UNIVERSE_SIZE: i64 = 100;

/// Failure reported by a universe implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniverseError(pub String);

impl fmt::Display for UniverseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for UniverseError {}

pub type UniverseResult<T> = Result<T, UniverseError>;

/// Serializable universe snapshot: a flat name → value map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UniverseState(pub BTreeMap<String, Value>);

impl UniverseState {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }
}

pub trait Universe: Send {
    /// Advance the simulation; returns the step count or a status value.
    fn evolve(&mut self, steps: i64) -> UniverseResult<Value>;
    fn set_parameter(&mut self, name: &str, value: Value) -> UniverseResult<()>;
    fn get_state(&self) -> UniverseState;
    fn set_state(&mut self, state: &UniverseState) -> UniverseResult<()>;
}

/// Builds a universe of the given size for `init` and `load`.
pub type UniverseFactory = Arc<dyn Fn(i64) -> Box<dyn Universe> + Send + Sync>;

pub fn local_universe_factory() -> UniverseFactory {
    Arc::new(|size| -> Box<dyn Universe> { Box::new(LocalUniverse::new(size)) })
}

/// Serializing wrapper around the collaborator.
#[derive(Clone)]
pub struct SharedUniverse(Arc<Mutex<Box<dyn Universe>>>);

impl SharedUniverse {
    pub fn new(universe: Box<dyn Universe>) -> Self {
        SharedUniverse(Arc::new(Mutex::new(universe)))
    }

    pub fn evolve(&self, steps: i64) -> EvalResult {
        self.0
            .lock()
            .evolve(steps)
            .map_err(|e| universe_failure(e.0))
    }

    pub fn set_parameter(&self, name: &str, value: Value) -> EvalResult<()> {
        self.0
            .lock()
            .set_parameter(name, value)
            .map_err(|e| universe_failure(e.0))
    }

    pub fn get_state(&self) -> UniverseState {
        self.0.lock().get_state()
    }

    pub fn set_state(&self, state: &UniverseState) -> EvalResult<()> {
        self.0
            .lock()
            .set_state(state)
            .map_err(|e| universe_failure(e.0))
    }

    pub fn ptr_eq(&self, other: &SharedUniverse) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SharedUniverse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedUniverse")
            .field(&self.get_state())
            .finish()
    }
}

/// Deterministic in-process universe: counts steps and records parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalUniverse {
    pub size: i64,
    pub evolution_steps: i64,
    pub parameters: BTreeMap<String, Value>,
    pub phase: String,
}

const PARAM_PREFIX: &str = "param.";

impl LocalUniverse {
    pub fn new(size: i64) -> Self {
        LocalUniverse {
            size,
            evolution_steps: 0,
            parameters: BTreeMap::new(),
            phase: "initialized".to_string(),
        }
    }
}

impl Universe for LocalUniverse {
    fn evolve(&mut self, steps: i64) -> UniverseResult<Value> {
        if steps < 0 {
            return Err(UniverseError(format!(
                "cannot evolve a negative number of steps ({steps})"
            )));
        }
        self.evolution_steps = self.evolution_steps.saturating_add(steps);
        self.phase = "evolving".to_string();
        Ok(Value::Int(steps))
    }

    fn set_parameter(&mut self, name: &str, value: Value) -> UniverseResult<()> {
        self.parameters.insert(name.to_string(), value);
        Ok(())
    }

    fn get_state(&self) -> UniverseState {
        let mut state = UniverseState::default();
        state.insert("size", Value::Int(self.size));
        state.insert("evolution_steps", Value::Int(self.evolution_steps));
        state.insert("state", Value::from(self.phase.as_str()));
        for (name, value) in &self.parameters {
            state.insert(format!("{PARAM_PREFIX}{name}"), value.clone());
        }
        state
    }

    fn set_state(&mut self, state: &UniverseState) -> UniverseResult<()> {
        let int = |key: &str| match state.get(key) {
            Some(Value::Int(n)) => Ok(*n),
            Some(other) => Err(UniverseError(format!(
                "state field '{key}' must be an int, got {}",
                other.type_name()
            ))),
            None => Err(UniverseError(format!("state field '{key}' is missing"))),
        };
        self.size = int("size")?;
        self.evolution_steps = int("evolution_steps")?;
        if let Some(phase) = state.get("state") {
            self.phase = phase.display_value();
        }
        self.parameters = state
            .0
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(PARAM_PREFIX)
                    .map(|name| (name.to_string(), value.clone()))
            })
            .collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests;
