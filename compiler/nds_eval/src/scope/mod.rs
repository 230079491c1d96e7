//! Call-frame management.
//!
//! `ScopeManager` owns the live call stack of one evaluator. Entering a
//! function or macro creates a child of the *global* frame (bodies do not
//! see the caller's locals), binds parameters there and pushes a
//! [`CallFrame`]. The depth limit turns runaway recursion into a
//! `RecursionLimit` error instead of a host stack overflow.
//!
//! Stacks are never shared: each parallel-loop worker gets its own
//! `ScopeManager` over the same global frame.

use std::fmt;

use nds_ir::{Name, Span};

use crate::environment::Environment;
use crate::errors::{
    arity_mismatch, no_active_call, recursion_limit_exceeded, BacktraceFrame, EvalBacktrace,
    EvalError, EvalResult,
};
use crate::value::Value;

/// Default call-depth limit.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CallKind {
    Function,
    Macro,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallKind::Function => f.write_str("function"),
            CallKind::Macro => f.write_str("macro"),
        }
    }
}

/// One active invocation.
#[derive(Clone, Debug)]
pub struct CallFrame {
    pub name: Name,
    pub kind: CallKind,
    /// Parameter → argument bindings of this invocation.
    pub bindings: Vec<(Name, Value)>,
    /// Frame the body executes in.
    pub env: Environment,
    /// Position of the call site.
    pub call_span: Option<Span>,
}

impl CallFrame {
    /// Human-readable description used in stack traces.
    pub fn describe(&self) -> String {
        let mut out = format!("in {} '{}'", self.kind, self.name);
        if !self.bindings.is_empty() {
            let args: Vec<String> = self
                .bindings
                .iter()
                .map(|(name, value)| format!("{name} = {value}"))
                .collect();
            out.push_str(&format!(" ({})", args.join(", ")));
        }
        if let Some(span) = self.call_span {
            out.push_str(&format!(" called at {span}"));
        }
        out
    }
}

/// Call stack of one evaluator thread.
pub struct ScopeManager {
    global: Environment,
    frames: Vec<CallFrame>,
    max_depth: usize,
}

impl ScopeManager {
    /// Empty stack whose call frames are children of `global`.
    pub fn new(global: Environment, max_depth: usize) -> Self {
        ScopeManager {
            global,
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Enter a function with no recorded call site.
    pub fn enter_function(
        &mut self,
        name: &Name,
        params: &[Name],
        args: Vec<Value>,
    ) -> EvalResult<Environment> {
        self.enter(CallKind::Function, name, params, args, None)
    }

    /// Push a frame for `name` and return the environment its body runs in.
    ///
    /// On error nothing is pushed, so the depth is unchanged.
    pub fn enter(
        &mut self,
        kind: CallKind,
        name: &Name,
        params: &[Name],
        args: Vec<Value>,
        call_span: Option<Span>,
    ) -> EvalResult<Environment> {
        if params.len() != args.len() {
            return Err(arity_mismatch(name, params.len(), args.len()));
        }
        if self.frames.len() >= self.max_depth {
            return Err(recursion_limit_exceeded(self.max_depth));
        }

        let env = self.global.create_child();
        let bindings: Vec<(Name, Value)> = params.iter().cloned().zip(args).collect();
        for (param, value) in &bindings {
            env.define(param.clone(), value.clone());
        }
        tracing::trace!(%kind, name = %name, depth = self.frames.len() + 1, "enter");
        self.frames.push(CallFrame {
            name: name.clone(),
            kind,
            bindings,
            env: env.clone(),
            call_span,
        });
        Ok(env)
    }

    /// Pop the innermost frame, passing `return_value` through.
    pub fn exit_function(&mut self, return_value: Value) -> EvalResult {
        match self.frames.pop() {
            Some(frame) => {
                tracing::trace!(name = %frame.name, depth = self.frames.len(), "exit");
                Ok(return_value)
            }
            None => Err(no_active_call()),
        }
    }

    /// Frame descriptions, innermost first.
    pub fn get_call_stack_trace(&self) -> Vec<String> {
        self.frames.iter().rev().map(CallFrame::describe).collect()
    }

    /// Snapshot the stack as a backtrace, innermost first.
    pub fn capture(&self) -> EvalBacktrace {
        let frames = self
            .frames
            .iter()
            .rev()
            .map(|f| BacktraceFrame {
                name: f.name.to_string(),
                span: f.call_span,
            })
            .collect();
        EvalBacktrace::new(frames)
    }

    /// Attach a backtrace unless the error already carries one from a deeper frame.
    pub fn attach_backtrace(&self, err: EvalError) -> EvalError {
        if self.frames.is_empty() || err.backtrace.is_some() {
            return err;
        }
        err.with_backtrace(self.capture())
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Innermost active frame.
    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// Active frames, outermost first.
    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    /// Active macro invocations on the stack.
    pub fn macro_depth(&self) -> usize {
        self.frames
            .iter()
            .filter(|f| f.kind == CallKind::Macro)
            .count()
    }

    pub fn global(&self) -> &Environment {
        &self.global
    }

    /// Drop every frame (used after an aborted top-level statement).
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests;
