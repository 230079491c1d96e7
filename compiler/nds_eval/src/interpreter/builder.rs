//! `InterpreterBuilder` for assembling an [`Interpreter`] and its session.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::{Diagnostics, FunctionRegistry, Interpreter, Session};
use crate::builtins::seed_globals;
use crate::config::InterpreterConfig;
use crate::environment::Environment;
use crate::imports::{ImportResolver, ModuleLoader};
use crate::macros::{MacroProcessor, DEFAULT_MAX_EXPANSION_DEPTH};
use crate::parallel::ParallelEngine;
use crate::print_handler::{stdout_handler, SharedPrintHandler};
use crate::session::StateStore;
use crate::shared::SharedMutableRegistry;
use crate::universe::{local_universe_factory, UniverseFactory};

/// Builder for interpreters with non-default collaborators.
#[derive(Default)]
pub struct InterpreterBuilder {
    config: InterpreterConfig,
    print_handler: Option<SharedPrintHandler>,
    universe_factory: Option<UniverseFactory>,
    state_store: Option<Arc<dyn StateStore>>,
    module_loader: Option<Arc<dyn ModuleLoader>>,
}

impl InterpreterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    /// Where user-visible text goes. Default is stdout.
    #[must_use]
    pub fn print_handler(mut self, handler: SharedPrintHandler) -> Self {
        self.print_handler = Some(handler);
        self
    }

    /// How `init` builds a universe. Default is [`crate::LocalUniverse`].
    #[must_use]
    pub fn universe_factory(mut self, factory: UniverseFactory) -> Self {
        self.universe_factory = Some(factory);
        self
    }

    /// Backend for `save` and `load`. Without one both fail.
    #[must_use]
    pub fn state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.state_store = Some(store);
        self
    }

    /// Source of imported modules. Without one every import fails.
    #[must_use]
    pub fn module_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.module_loader = Some(loader);
        self
    }

    pub fn build(self) -> Interpreter {
        let globals = Environment::new();
        seed_globals(&globals);

        let engine = ParallelEngine::new(self.config.parallel.clone());
        let session = Session {
            globals: globals.clone(),
            functions: SharedMutableRegistry::new(FunctionRegistry::default()),
            macros: SharedMutableRegistry::new(MacroProcessor::new(DEFAULT_MAX_EXPANSION_DEPTH)),
            universe: SharedMutableRegistry::new(None),
            universe_factory: self.universe_factory.unwrap_or_else(local_universe_factory),
            store: self.state_store,
            imports: Arc::new(ImportResolver::new(self.module_loader)),
            print: self.print_handler.unwrap_or_else(stdout_handler),
            config: Arc::new(self.config),
            running: Arc::new(AtomicBool::new(true)),
            diagnostics: SharedMutableRegistry::new(Diagnostics::default()),
            engine: Arc::new(engine),
        };
        Interpreter::with_session(session, globals, None)
    }
}
