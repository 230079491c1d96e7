//! ND-Script Eval - runtime core for ND-Script.
//!
//! Walks an [`nds_ir`] syntax tree against a chain of lexical frames.
//!
//! # Architecture
//!
//! - [`Environment`]: shared, lock-protected scope frames with per-frame
//!   lookup caches invalidated by a session-wide generation counter
//! - [`Completion`]: break/continue/return as values, not unwinding
//! - [`ScopeManager`]: the call stack, recursion limit and backtraces
//! - [`MacroProcessor`]: macro registry plus source-level expansion
//! - [`Interpreter`]: the evaluator, built with [`InterpreterBuilder`]
//! - [`ParallelEngine`]: sampling, planning and execution of `parallel for`
//! - [`SharedUniverse`] and [`StateStore`]: the simulation and persistence
//!   collaborators
//! - [`ImportResolver`]: module imports through a [`ModuleLoader`], with a
//!   per-session cache and cycle detection
//!
//! User-visible text goes through a [`PrintHandler`]; structured logs go
//! through `tracing` and are printed only after [`init_tracing`] with
//! `RUST_LOG` set.

pub mod builtins;
pub mod config;
mod control;
mod environment;
pub mod errors;
pub mod imports;
pub mod interpreter;
pub mod macros;
pub mod operators;
pub mod parallel;
mod print_handler;
mod scope;
pub mod session;
mod shared;
mod stack;
pub mod universe;
mod value;

use std::sync::Once;

pub use config::{InterpreterConfig, LoopGuardPolicy, ParallelConfig};
pub use control::Completion;
pub use environment::{CacheStats, Environment};
pub use errors::{EvalBacktrace, EvalError, EvalErrorKind, EvalResult, MisusedSignal};
pub use imports::{
    FileModuleLoader, ImportResolver, MemoryModuleLoader, ModuleLoader, SourceParser,
};
pub use interpreter::{DebugEvent, Interpreter, InterpreterBuilder, ProfileReport, ShowTarget};
pub use macros::MacroProcessor;
pub use parallel::{
    BenchmarkReport, ExecutionStrategy, ExpectedBenefit, IterationDomain, ParallelEngine,
    ParallelPlan, ParallelPolicy, ParallelReport, ParallelStats, WorkloadClass,
};
pub use print_handler::{
    buffer_handler, silent_handler, stdout_handler, PrintHandler, SharedPrintHandler,
};
pub use scope::{CallFrame, CallKind, ScopeManager, DEFAULT_MAX_CALL_DEPTH};
pub use session::{MemoryStateStore, SessionSnapshot, StateStore};
pub use shared::SharedMutableRegistry;
pub use stack::ensure_sufficient_stack;
pub use universe::{
    local_universe_factory, LocalUniverse, SharedUniverse, Universe, UniverseError,
    UniverseFactory, UniverseResult, UniverseState,
};
pub use value::{BuiltinFn, Value};

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset; later calls are no-ops.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .try_init();
        }
    });
}
