//! Statement completions.
//!
//! Every statement executor returns a [`Completion`]. `Break`/`Continue`
//! are intercepted by the nearest enclosing loop and `Return` by the
//! nearest function or macro invocation; anything reaching the top level
//! unintercepted is a misuse error.

use crate::errors::{break_outside_loop, continue_outside_loop, return_outside_function, EvalError};
use crate::value::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum Completion {
    /// Statement finished; carries its value.
    Normal(Value),
    Break,
    Continue,
    Return(Value),
}

/// What a loop should do after one body execution.
pub(crate) enum LoopAction {
    Next(Value),
    Exit,
    Propagate(Completion),
}

impl Completion {
    pub fn none() -> Self {
        Completion::Normal(Value::None)
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, Completion::Normal(_))
    }

    /// Loop-boundary interception. `Continue` keeps the previous value.
    pub(crate) fn at_loop_boundary(self, last: Value) -> LoopAction {
        match self {
            Completion::Normal(value) => LoopAction::Next(value),
            Completion::Continue => LoopAction::Next(last),
            Completion::Break => LoopAction::Exit,
            ret @ Completion::Return(_) => LoopAction::Propagate(ret),
        }
    }

    /// Call-boundary interception: `Return` becomes the call's value.
    pub fn into_call_result(self) -> Result<Value, EvalError> {
        match self {
            Completion::Normal(value) | Completion::Return(value) => Ok(value),
            Completion::Break => Err(break_outside_loop()),
            Completion::Continue => Err(continue_outside_loop()),
        }
    }

    /// Program-boundary interception: no signal may escape.
    pub fn into_program_result(self) -> Result<Value, EvalError> {
        match self {
            Completion::Normal(value) => Ok(value),
            Completion::Break => Err(break_outside_loop()),
            Completion::Continue => Err(continue_outside_loop()),
            Completion::Return(_) => Err(return_outside_function()),
        }
    }
}
