//! Environment for variable scoping in the interpreter.
//!
//! An [`Environment`] is a handle to one scope frame. Frames form a parent
//! chain ending at the global frame; function calls and parallel-loop
//! iterations each get a fresh child frame that is dropped when they end.
//!
//! # Thread Safety
//! Frames are shared with parallel-loop workers, so a frame is an `Arc`
//! holding its bindings behind a `parking_lot::RwLock`. Cloning an
//! `Environment` clones the handle, not the bindings.
//!
//! # Lookup Cache
//! Each frame memoizes resolved lookups. Every frame in a tree shares one
//! write-generation counter: any `define`/`set` anywhere in the tree bumps
//! it, and a cache whose stamp is older than the counter is discarded
//! before use. A cached value is therefore never older than the most
//! recent write to any frame, including writes made through a sibling.
//! Spawning a child also clears the spawning frame's cache.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nds_ir::Name;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::errors::{undefined_variable, EvalResult};
use crate::value::Value;

/// Hit/miss counters of a frame's lookup cache.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries currently held.
    pub entries: usize,
}

#[derive(Default)]
struct LookupCache {
    generation: u64,
    entries: FxHashMap<Name, Value>,
    hits: u64,
    misses: u64,
}

struct Frame {
    bindings: RwLock<FxHashMap<Name, Value>>,
    parent: Option<Environment>,
    cache: Mutex<LookupCache>,
    /// Write generation shared by every frame of the tree.
    generation: Arc<AtomicU64>,
    depth: usize,
}

/// Handle to one scope frame.
#[derive(Clone)]
pub struct Environment(Arc<Frame>);

impl Environment {
    /// Create a root (global) frame.
    pub fn new() -> Self {
        Environment(Arc::new(Frame {
            bindings: RwLock::new(FxHashMap::default()),
            parent: None,
            cache: Mutex::new(LookupCache::default()),
            generation: Arc::new(AtomicU64::new(0)),
            depth: 0,
        }))
    }

    /// Create a child frame whose parent is `self`.
    #[must_use]
    pub fn create_child(&self) -> Self {
        self.0.cache.lock().entries.clear();
        Environment(Arc::new(Frame {
            bindings: RwLock::new(FxHashMap::default()),
            parent: Some(self.clone()),
            cache: Mutex::new(LookupCache::default()),
            generation: Arc::clone(&self.0.generation),
            depth: self.0.depth + 1,
        }))
    }

    /// Enclosing frame; `None` for the global frame.
    pub fn parent(&self) -> Option<&Environment> {
        self.0.parent.as_ref()
    }

    /// Number of ancestors; the global frame is at depth 0.
    pub fn depth(&self) -> usize {
        self.0.depth
    }

    /// Whether this is a global frame.
    pub fn is_root(&self) -> bool {
        self.0.parent.is_none()
    }

    /// Whether both handles refer to the same frame.
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Create or overwrite a binding in this frame.
    pub fn define(&self, name: impl Into<Name>, value: Value) {
        self.0.bindings.write().insert(name.into(), value);
        self.bump_generation();
    }

    /// Resolve `name`, walking the parent chain.
    pub fn get(&self, name: &str) -> EvalResult {
        self.lookup(name).ok_or_else(|| undefined_variable(name))
    }

    /// Resolve `name`, returning `None` if no frame defines it.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        // Read the generation before resolving: a write racing with the
        // resolution bumps it afterwards, which discards this entry.
        let generation = self.0.generation.load(Ordering::Acquire);
        {
            let mut cache = self.0.cache.lock();
            if cache.generation == generation {
                if let Some(value) = cache.entries.get(name).cloned() {
                    cache.hits += 1;
                    return Some(value);
                }
            } else {
                cache.entries.clear();
                cache.generation = generation;
            }
            cache.misses += 1;
        }

        let (key, value) = self.resolve(name)?;
        let mut cache = self.0.cache.lock();
        if cache.generation == generation {
            cache.entries.insert(key, value.clone());
        }
        Some(value)
    }

    /// Uncached chain walk; returns the stored key so the cache can share it.
    fn resolve(&self, name: &str) -> Option<(Name, Value)> {
        let mut frame = Some(self);
        while let Some(env) = frame {
            if let Some((key, value)) = env.0.bindings.read().get_key_value(name) {
                return Some((Arc::clone(key), value.clone()));
            }
            frame = env.parent();
        }
        None
    }

    /// Update the nearest frame that defines `name`; define locally if none does.
    pub fn set(&self, name: impl Into<Name>, value: Value) {
        let name = name.into();
        let mut frame = Some(self);
        while let Some(env) = frame {
            let mut bindings = env.0.bindings.write();
            if let Some(slot) = bindings.get_mut(&*name) {
                *slot = value;
                drop(bindings);
                self.bump_generation();
                return;
            }
            drop(bindings);
            frame = env.parent();
        }
        self.define(name, value);
    }

    /// Whether `name` is visible from this frame.
    pub fn has(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Whether `name` is bound in this frame itself.
    pub fn has_local(&self, name: &str) -> bool {
        self.0.bindings.read().contains_key(name)
    }

    /// Names bound in this frame, sorted.
    pub fn local_names(&self) -> Vec<Name> {
        let mut names: Vec<Name> = self.0.bindings.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Every visible binding, with inner frames shadowing outer ones.
    pub fn visible_bindings(&self) -> BTreeMap<String, Value> {
        let mut chain = Vec::with_capacity(self.depth() + 1);
        let mut frame = Some(self);
        while let Some(env) = frame {
            chain.push(env);
            frame = env.parent();
        }
        let mut out = BTreeMap::new();
        for env in chain.into_iter().rev() {
            for (name, value) in env.0.bindings.read().iter() {
                out.insert(name.to_string(), value.clone());
            }
        }
        out
    }

    /// Lookup-cache counters of this frame since it was created or last cleared.
    pub fn cache_stats(&self) -> CacheStats {
        let cache = self.0.cache.lock();
        CacheStats {
            hits: cache.hits,
            misses: cache.misses,
            entries: cache.entries.len(),
        }
    }

    /// Empty this frame's lookup cache and reset its counters.
    pub fn clear_cache(&self) {
        let mut cache = self.0.cache.lock();
        cache.entries.clear();
        cache.hits = 0;
        cache.misses = 0;
    }

    fn bump_generation(&self) {
        self.0.generation.fetch_add(1, Ordering::Release);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("depth", &self.0.depth)
            .field("locals", &self.local_names())
            .finish()
    }
}

#[cfg(test)]
mod tests;
