//! Call resolution and function/macro invocation.

use std::sync::Arc;

use nds_ir::Definition;

use super::Interpreter;
use crate::control::Completion;
use crate::errors::{
    macro_arity_mismatch, macro_depth_exceeded, not_callable, undefined_function, EvalResult,
};
use crate::scope::CallKind;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

impl Interpreter {
    /// Call `name` with already-evaluated arguments.
    ///
    /// Resolution order: user function, then macro, then a builtin bound
    /// in the environment.
    #[tracing::instrument(level = "debug", skip(self, args), fields(args = args.len()))]
    pub fn call_function(&mut self, name: &str, args: Vec<Value>) -> EvalResult {
        if let Some(def) = self.session.function(name) {
            return self.invoke(CallKind::Function, &def, args);
        }

        let macro_def = self.session.macros.read().get(name);
        if let Some(def) = macro_def {
            return self.invoke_macro(&def, args);
        }

        match self.env.lookup(name) {
            Some(Value::Builtin(builtin)) => builtin.call(&args),
            Some(other) => Err(not_callable(name, other.type_name())),
            None => Err(undefined_function(name)),
        }
    }

    fn invoke_macro(&mut self, def: &Arc<Definition>, args: Vec<Value>) -> EvalResult {
        if def.arity() != args.len() {
            return Err(macro_arity_mismatch(&def.name, def.arity(), args.len()));
        }
        let limit = self.session.macros.read().max_expansion_depth();
        if self.scopes.macro_depth() >= limit {
            let mut pending: Vec<&str> = self
                .scopes
                .frames()
                .iter()
                .rev()
                .filter(|f| f.kind == CallKind::Macro)
                .map(|f| &*f.name)
                .collect();
            pending.dedup();
            return Err(macro_depth_exceeded(limit, &pending));
        }
        self.invoke(CallKind::Macro, def, args)
    }

    /// Bind parameters in a fresh frame over the globals, run the body and
    /// convert a `Return` into the call's value. The frame is popped on
    /// every path.
    fn invoke(&mut self, kind: CallKind, def: &Arc<Definition>, args: Vec<Value>) -> EvalResult {
        let env = self
            .scopes
            .enter(kind, &def.name, &def.params, args, self.current_span)?;
        let caller_env = std::mem::replace(&mut self.env, env);

        let outcome = ensure_sufficient_stack(|| self.exec_block(&def.body))
            .map_err(|err| self.scopes.attach_backtrace(err));
        self.env = caller_env;

        match outcome.and_then(Completion::into_call_result) {
            Ok(value) => self.scopes.exit_function(value),
            Err(err) => {
                // The frame pushed above is still on the stack.
                let _ = self.scopes.exit_function(Value::None);
                Err(err)
            }
        }
    }
}
