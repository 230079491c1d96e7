//! Tree-walking evaluator for ND-Script.
//!
//! # Architecture
//!
//! Shared state lives in one [`Session`]: the global frame, the function
//! and macro registries, the universe handle, the state store, the print
//! handler, configuration, the running flag and collected diagnostics.
//! An [`Interpreter`] pairs a session with its own current frame and
//! [`ScopeManager`]. Parallel-loop workers clone the session (every field
//! is an `Arc`) and get a fresh interpreter, so call stacks are never
//! shared while globals, registries and the universe are.
//!
//! Evaluation is split across:
//!
//! - `exec` - statement dispatch, blocks, `if`, `while`, `for`
//! - `expr` - expression evaluation
//! - `call` - call resolution and function/macro invocation
//! - `commands` - simulation, persistence and diagnostic statements
//! - `import` - module imports through the [`ImportResolver`]
//! - `parallel_for` - the bridge to [`ParallelEngine`]
//!
//! Statements return a [`Completion`]; `Break`/`Continue` are intercepted
//! by loops, `Return` by `invoke`, and [`Interpreter::run_program`] turns
//! anything left over into a control-flow misuse error.

mod builder;
mod call;
mod commands;
mod exec;
mod expr;
mod import;
mod parallel_for;

pub use builder::InterpreterBuilder;
pub use commands::ShowTarget;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nds_ir::{Definition, Name, Program, Span};
use rustc_hash::FxHashMap;

use crate::builtins::is_seeded;
use crate::config::InterpreterConfig;
use crate::control::Completion;
use crate::environment::Environment;
use crate::errors::EvalResult;
use crate::imports::ImportResolver;
use crate::macros::MacroProcessor;
use crate::parallel::{ParallelEngine, ParallelReport, ParallelStats};
use crate::print_handler::SharedPrintHandler;
use crate::scope::ScopeManager;
use crate::session::{unix_timestamp, SessionSnapshot, StateStore};
use crate::shared::SharedMutableRegistry;
use crate::universe::{SharedUniverse, UniverseFactory, DEFAULT_UNIVERSE_SIZE};
use crate::value::Value;

/// Record of one `debug` statement.
#[derive(Clone, Debug, PartialEq)]
pub struct DebugEvent {
    pub message: Option<String>,
    pub universe_active: bool,
    /// User names visible from the statement, sorted.
    pub visible: Vec<String>,
    pub call_depth: usize,
    pub span: Option<Span>,
}

/// Timing of one `profile` block.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileReport {
    pub label: Option<String>,
    pub duration: Duration,
    /// Statements in the profiled block.
    pub statements: usize,
    pub failed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    warnings: Vec<String>,
    debug_events: Vec<DebugEvent>,
    profile_reports: Vec<ProfileReport>,
    last_parallel: Option<ParallelReport>,
    parallel_stats: ParallelStats,
}

pub(crate) type FunctionRegistry = FxHashMap<Name, Arc<Definition>>;

/// State shared by the main evaluator and every parallel-loop worker.
#[derive(Clone)]
pub(crate) struct Session {
    globals: Environment,
    functions: SharedMutableRegistry<FunctionRegistry>,
    macros: SharedMutableRegistry<MacroProcessor>,
    universe: SharedMutableRegistry<Option<SharedUniverse>>,
    universe_factory: UniverseFactory,
    store: Option<Arc<dyn StateStore>>,
    imports: Arc<ImportResolver>,
    print: SharedPrintHandler,
    config: Arc<InterpreterConfig>,
    running: Arc<AtomicBool>,
    diagnostics: SharedMutableRegistry<Diagnostics>,
    engine: Arc<ParallelEngine>,
}

impl Session {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn function(&self, name: &str) -> Option<Arc<Definition>> {
        self.functions.read().get(name).cloned()
    }

    fn universe(&self) -> Option<SharedUniverse> {
        self.universe.read().clone()
    }

    /// A confirmation line; suppressed when the session is silent.
    fn confirm(&self, msg: &str) {
        if !self.config.silent {
            self.print.println(msg);
        }
    }

    fn warn(&self, msg: String) {
        self.print.println(&format!("Warning: {msg}"));
        self.diagnostics.write().warnings.push(msg);
    }
}

pub struct Interpreter {
    session: Session,
    /// Frame the current statement executes in.
    env: Environment,
    scopes: ScopeManager,
    /// Span of the statement being executed.
    current_span: Option<Span>,
    /// Cooperative cancellation point of a parallel-loop worker.
    deadline: Option<Instant>,
}

impl Interpreter {
    /// Interpreter with default configuration printing to stdout.
    pub fn new() -> Self {
        InterpreterBuilder::new().build()
    }

    fn with_session(session: Session, env: Environment, deadline: Option<Instant>) -> Self {
        let scopes = ScopeManager::new(session.globals.clone(), session.config.max_call_depth);
        Interpreter {
            session,
            env,
            scopes,
            current_span: None,
            deadline,
        }
    }

    /// Execute `program`, returning the value of its last executed statement.
    ///
    /// A failing statement aborts the program; the call stack is cleared so
    /// the interpreter can run further programs.
    #[tracing::instrument(level = "debug", skip_all, fields(statements = program.statements.len()))]
    pub fn run_program(&mut self, program: &Program) -> EvalResult {
        self.session.running.store(true, Ordering::Release);
        let mut last = Value::None;
        for stmt in &program.statements {
            if !self.session.is_running() {
                break;
            }
            let outcome = self
                .exec_statement(stmt)
                .and_then(Completion::into_program_result);
            match outcome {
                Ok(value) => last = value,
                Err(err) => {
                    tracing::debug!(error = %err, "program aborted");
                    self.scopes.clear();
                    self.env = self.session.globals.clone();
                    return Err(err);
                }
            }
        }
        Ok(last)
    }

    /// Register a function as if its definition statement had run.
    pub fn define_function(&self, def: Definition) {
        let def = Arc::new(def);
        tracing::debug!(name = %def.name, params = def.params.len(), "function registered");
        self.session.functions.write().insert(def.name.clone(), def);
    }

    pub fn define_macro(&self, def: Definition) {
        self.session.macros.write().register(Arc::new(def));
    }

    /// Rewrite macro call sites in `source` before it is parsed.
    pub fn expand_macros(&self, source: &str) -> EvalResult<String> {
        self.session.macros.read().expand_source(source)
    }

    pub fn global_env(&self) -> &Environment {
        &self.session.globals
    }

    pub fn current_env(&self) -> &Environment {
        &self.env
    }

    pub fn call_depth(&self) -> usize {
        self.scopes.depth()
    }

    pub fn call_stack_trace(&self) -> Vec<String> {
        self.scopes.get_call_stack_trace()
    }

    /// Registered function names, sorted.
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .session
            .functions
            .read()
            .keys()
            .map(ToString::to_string)
            .collect();
        names.sort();
        names
    }

    pub fn macro_names(&self) -> Vec<String> {
        self.session.macros.read().names()
    }

    /// False once an `exit` statement has run.
    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    pub fn universe(&self) -> Option<SharedUniverse> {
        self.session.universe()
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.session.config
    }

    pub fn parallel_engine(&self) -> &ParallelEngine {
        &self.session.engine
    }

    /// Keys of every module loaded by an import, sorted.
    pub fn imported_modules(&self) -> Vec<String> {
        self.session.imports.imported_modules()
    }

    /// Drop cached modules so the next import reloads them.
    pub fn clear_import_cache(&self) {
        self.session.imports.clear_cache();
    }

    /// User variables of the global frame, builtins excluded.
    fn user_variables(&self) -> std::collections::BTreeMap<String, Value> {
        self.session
            .globals
            .visible_bindings()
            .into_iter()
            .filter(|(name, value)| !is_seeded(name, value))
            .collect()
    }

    /// Capture the persistable session record.
    pub fn snapshot(&self) -> SessionSnapshot {
        let universe = self.session.universe();
        SessionSnapshot {
            universe_initialized: universe.is_some(),
            timestamp: unix_timestamp(),
            variables: self.user_variables(),
            functions: self.function_names(),
            macros: self.macro_names(),
            universe_state: universe.map(|u| u.get_state()),
        }
    }

    /// Restore variables and the universe from `snapshot`.
    ///
    /// Variables are written with `set` semantics into the global frame.
    /// Function and macro bodies are not part of the record and are left as
    /// they are.
    pub fn restore(&mut self, snapshot: &SessionSnapshot) -> EvalResult<()> {
        for (name, value) in &snapshot.variables {
            self.session.globals.set(name.as_str(), value.clone());
        }
        let universe = if snapshot.universe_initialized {
            let size = snapshot
                .universe_state
                .as_ref()
                .and_then(|s| s.get("size"))
                .and_then(Value::as_int)
                .unwrap_or(DEFAULT_UNIVERSE_SIZE);
            let universe = SharedUniverse::new((self.session.universe_factory)(size));
            if let Some(state) = &snapshot.universe_state {
                universe.set_state(state)?;
            }
            Some(universe)
        } else {
            None
        };
        *self.session.universe.write() = universe;
        tracing::debug!(
            variables = snapshot.variables.len(),
            universe = snapshot.universe_initialized,
            "session restored"
        );
        Ok(())
    }

    pub fn warnings(&self) -> Vec<String> {
        self.session.diagnostics.read().warnings.clone()
    }

    pub fn debug_events(&self) -> Vec<DebugEvent> {
        self.session.diagnostics.read().debug_events.clone()
    }

    pub fn profile_reports(&self) -> Vec<ProfileReport> {
        self.session.diagnostics.read().profile_reports.clone()
    }

    pub fn last_parallel_report(&self) -> Option<ParallelReport> {
        self.session.diagnostics.read().last_parallel.clone()
    }

    pub fn parallel_stats(&self) -> ParallelStats {
        self.session.diagnostics.read().parallel_stats.clone()
    }

    /// Captured output; empty unless a buffer handler is installed.
    pub fn get_print_output(&self) -> String {
        self.session.print.get_output()
    }

    pub fn clear_print_output(&self) {
        self.session.print.clear();
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
