//! Macro registry and textual expansion.
//!
//! The evaluator invokes macros like functions: parameters become local
//! bindings in a fresh frame (see `Interpreter::invoke`). This module
//! additionally offers the source-level path, [`MacroProcessor::expand_source`],
//! which rewrites `name(args)` call sites in script text before parsing.
//!
//! Textual expansion rules:
//! - call sites are `name(arg, ...)` with commas split only at nesting
//!   depth zero and outside string literals;
//! - parameters are substituted by whole identifier, never inside string
//!   literals and never into text that was itself substituted;
//! - non-atomic arguments are parenthesized, so `double(3+1)` with body
//!   `x + x` yields `(3+1) + (3+1)`;
//! - expansion repeats until no call site remains, failing once
//!   `max_expansion_depth` rounds have run.

mod scan;

use std::sync::Arc;

use nds_ir::{Definition, Name};
use rustc_hash::FxHashMap;

use crate::errors::{macro_arity_mismatch, macro_depth_exceeded, unknown_macro, EvalResult};

/// Default limit on nested expansion rounds.
pub const DEFAULT_MAX_EXPANSION_DEPTH: usize = 50;

pub struct MacroProcessor {
    macros: FxHashMap<Name, Arc<Definition>>,
    max_expansion_depth: usize,
}

impl MacroProcessor {
    /// Empty registry expanding at most `max_expansion_depth` rounds.
    pub fn new(max_expansion_depth: usize) -> Self {
        MacroProcessor {
            macros: FxHashMap::default(),
            max_expansion_depth,
        }
    }

    /// Register `def`; a later definition with the same name replaces it.
    pub fn register(&mut self, def: Arc<Definition>) {
        tracing::debug!(name = %def.name, params = def.params.len(), "macro registered");
        self.macros.insert(def.name.clone(), def);
    }

    /// Definition registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<Definition>> {
        self.macros.get(name).cloned()
    }

    /// Whether a macro named `name` is registered.
    pub fn has(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.macros.keys().map(ToString::to_string).collect();
        names.sort();
        names
    }

    /// Number of registered macros.
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Drop every registered macro.
    pub fn clear(&mut self) {
        self.macros.clear();
    }

    pub fn max_expansion_depth(&self) -> usize {
        self.max_expansion_depth
    }

    /// Substitute `args` (source text) into the body of macro `name`.
    pub fn expand_call(&self, name: &str, args: &[&str]) -> EvalResult<String> {
        let def = self.macros.get(name).ok_or_else(|| unknown_macro(name))?;
        if def.arity() != args.len() {
            return Err(macro_arity_mismatch(name, def.arity(), args.len()));
        }
        let bindings: FxHashMap<&str, String> = def
            .params
            .iter()
            .zip(args)
            .map(|(param, arg)| (&**param, scan::wrap_argument(arg)))
            .collect();
        Ok(scan::substitute(&def.body_source(), &bindings))
    }

    /// Expand every macro call site in `source`.
    ///
    /// Expression-bodied macros are parenthesized at the call site so the
    /// surrounding operator precedence is preserved.
    pub fn expand_source(&self, source: &str) -> EvalResult<String> {
        let mut text = source.to_owned();
        let mut round = 0;
        loop {
            let calls = scan::find_calls(&text, |name| self.macros.contains_key(name))?;
            if calls.is_empty() {
                return Ok(text);
            }
            if round == self.max_expansion_depth {
                let mut pending: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
                pending.dedup();
                return Err(macro_depth_exceeded(self.max_expansion_depth, &pending));
            }
            // Replace back to front so earlier byte ranges stay valid.
            for call in calls.iter().rev() {
                let args: Vec<&str> = call.args.iter().map(String::as_str).collect();
                let mut expansion = self.expand_call(&call.name, &args)?;
                if self.macros.get(call.name.as_str()).is_some_and(|d| d.body_expr().is_some()) {
                    expansion = format!("({expansion})");
                }
                text.replace_range(call.range.clone(), &expansion);
            }
            round += 1;
            tracing::trace!(round, sites = calls.len(), "macro expansion round");
        }
    }
}

impl Default for MacroProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXPANSION_DEPTH)
    }
}

#[cfg(test)]
mod tests;
