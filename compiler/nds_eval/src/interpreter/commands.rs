//! Simulation, persistence and diagnostic statements.

use std::sync::atomic::Ordering;
use std::time::Instant;

use nds_ir::{Block, Expr, Name};

use super::{DebugEvent, Interpreter, ProfileReport};
use crate::builtins::is_seeded;
use crate::control::Completion;
use crate::errors::{
    persistence_failure, persistence_unavailable, universe_not_initialized, EvalResult,
};
use crate::universe::{SharedUniverse, DEFAULT_UNIVERSE_SIZE};
use crate::value::Value;

/// What `show` can display. Each target has an English and an Arabic name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShowTarget {
    State,
    Stats,
    Variables,
    Functions,
    Macros,
    Density,
    Energy,
    Plot,
    Analysis,
}

impl ShowTarget {
    pub fn parse(target: &str) -> Option<Self> {
        let target = target.trim().trim_matches(|c| c == '"' || c == '\'');
        Some(match target {
            "state" | "حالة" | "الحالة" => ShowTarget::State,
            "stats" | "statistics" | "إحصائيات" => ShowTarget::Stats,
            "variables" | "متغيرات" => ShowTarget::Variables,
            "functions" | "دوال" => ShowTarget::Functions,
            "macros" | "ماكرو" => ShowTarget::Macros,
            "density" | "كثافة" => ShowTarget::Density,
            "energy" | "طاقة" => ShowTarget::Energy,
            "plot" | "رسم" => ShowTarget::Plot,
            "analysis" | "تحليل" => ShowTarget::Analysis,
            _ => return None,
        })
    }

    /// Targets that report on the interpreter rather than the universe.
    fn needs_universe(self) -> bool {
        !matches!(
            self,
            ShowTarget::Variables | ShowTarget::Functions | ShowTarget::Macros
        )
    }
}

impl Interpreter {
    fn require_universe(&self) -> EvalResult<SharedUniverse> {
        self.session.universe().ok_or_else(universe_not_initialized)
    }

    pub(super) fn exec_init(&mut self, size: Option<&Expr>) -> EvalResult<Completion> {
        let size = match size {
            Some(expr) => self.eval_int(expr)?,
            None => DEFAULT_UNIVERSE_SIZE,
        };
        let universe = SharedUniverse::new((self.session.universe_factory)(size));
        *self.session.universe.write() = Some(universe);
        tracing::debug!(size, "universe initialized");
        self.session
            .confirm(&format!("Universe initialized with size={size}"));
        Ok(Completion::none())
    }

    pub(super) fn exec_evolve(&mut self, steps: Option<&Expr>) -> EvalResult<Completion> {
        let universe = self.require_universe()?;
        let steps = match steps {
            Some(expr) => self.eval_int(expr)?,
            None => 1,
        };
        let result = universe.evolve(steps)?;
        self.session
            .confirm(&format!("Universe evolved for {steps} steps"));
        Ok(Completion::Normal(result))
    }

    pub(super) fn exec_set_parameter(&mut self, name: &Name, value: &Expr) -> EvalResult<Completion> {
        let universe = self.require_universe()?;
        let value = self.eval_expr(value)?;
        universe.set_parameter(name, value.clone())?;
        self.session.confirm(&format!("Set {name} = {value}"));
        Ok(Completion::Normal(value))
    }

    pub(super) fn exec_show(&mut self, target: &str) -> EvalResult<Completion> {
        let print = &self.session.print;
        let Some(parsed) = ShowTarget::parse(target) else {
            print.println(&format!("Displaying: {target}"));
            return Ok(Completion::Normal(Value::string(target)));
        };
        let universe = self.session.universe();
        if universe.is_none() && parsed.needs_universe() {
            print.println("Warning: Universe not initialized. Some information may be limited.");
        }

        let status = match parsed {
            ShowTarget::State => {
                match &universe {
                    Some(u) => {
                        print.println("Universe State:");
                        for (key, value) in &u.get_state().0 {
                            print.println(&format!("  {key}: {value}"));
                        }
                    }
                    None => print.println("No universe initialized"),
                }
                "state_displayed"
            }
            ShowTarget::Stats => {
                match &universe {
                    Some(u) => {
                        let state = u.get_state();
                        print.println("Universe Statistics:");
                        for key in ["size", "state", "evolution_steps"] {
                            if let Some(value) = state.get(key) {
                                print.println(&format!("  {key}: {}", value.display_value()));
                            }
                        }
                    }
                    None => print.println("No universe initialized"),
                }
                let variables = self.user_variables().len();
                let functions = self.session.functions.read().len();
                print.println(&format!("  Variables: {variables}"));
                print.println(&format!("  Functions: {functions}"));
                "stats_displayed"
            }
            ShowTarget::Variables => {
                print.println("Variables:");
                for (name, value) in self.user_variables() {
                    print.println(&format!("  {name} = {value}"));
                }
                "variables_displayed"
            }
            ShowTarget::Functions => {
                print.println(&format!("Functions: {}", self.function_names().join(", ")));
                "functions_displayed"
            }
            ShowTarget::Macros => {
                print.println(&format!("Macros: {}", self.macro_names().join(", ")));
                "macros_displayed"
            }
            ShowTarget::Density | ShowTarget::Energy if universe.is_none() => {
                print.println(&format!("No universe to display {target} for"));
                return Ok(Completion::none());
            }
            ShowTarget::Density => {
                print.println("Displaying density visualization...");
                "density_displayed"
            }
            ShowTarget::Energy => {
                print.println("Displaying energy analysis...");
                "energy_displayed"
            }
            ShowTarget::Plot => {
                print.println("Generating plot...");
                "plot_generated"
            }
            ShowTarget::Analysis => {
                print.println("Performing analysis...");
                "analysis_performed"
            }
        };
        Ok(Completion::Normal(Value::from(status)))
    }

    fn eval_path(&mut self, path: &Expr) -> EvalResult<String> {
        let path = self.eval_expr(path)?.display_value();
        Ok(path.trim_matches(|c| c == '"' || c == '\'').to_string())
    }

    pub(super) fn exec_save(&mut self, path: &Expr) -> EvalResult<Completion> {
        let path = self.eval_path(path)?;
        let store = self.session.store.clone().ok_or_else(persistence_unavailable)?;
        store
            .save(&path, &self.snapshot())
            .map_err(persistence_failure)?;
        tracing::debug!(%path, "session saved");
        self.session.confirm(&format!("State saved to {path}"));
        Ok(Completion::Normal(Value::string(path)))
    }

    pub(super) fn exec_load(&mut self, path: &Expr) -> EvalResult<Completion> {
        let path = self.eval_path(path)?;
        let store = self.session.store.clone().ok_or_else(persistence_unavailable)?;
        let snapshot = store.load(&path).map_err(persistence_failure)?;
        self.restore(&snapshot)?;
        self.session.confirm(&format!("State loaded from {path}"));
        Ok(Completion::Normal(Value::string(path)))
    }

    pub(super) fn exec_exit(&mut self) -> EvalResult<Completion> {
        self.session.running.store(false, Ordering::Release);
        self.session.confirm("Exiting ND-Script interpreter...");
        Ok(Completion::none())
    }

    pub(super) fn exec_debug(&mut self, message: Option<&str>) -> EvalResult<Completion> {
        let universe_active = self.session.universe().is_some();
        let visible: Vec<String> = self
            .env
            .visible_bindings()
            .into_iter()
            .filter(|(name, value)| !is_seeded(name, value))
            .map(|(name, _)| name)
            .collect();

        let print = &self.session.print;
        print.println("Debug breakpoint reached");
        if let Some(message) = message {
            print.println(&format!("Debug message: {message}"));
        }
        print.println(&format!(
            "Universe state: {}",
            if universe_active { "Active" } else { "Not initialized" }
        ));
        print.println(&format!("Environment variables: [{}]", visible.join(", ")));

        self.session.diagnostics.write().debug_events.push(DebugEvent {
            message: message.map(str::to_owned),
            universe_active,
            visible,
            call_depth: self.scopes.depth(),
            span: self.current_span,
        });
        Ok(Completion::none())
    }

    /// Time `body`. Completions and errors pass through unchanged; the
    /// report is recorded either way.
    pub(super) fn exec_profile(&mut self, label: Option<&str>, body: &Block) -> EvalResult<Completion> {
        let started = Instant::now();
        let outcome = self.exec_block(body);
        let duration = started.elapsed();

        let title = label.map_or_else(String::new, |l| format!(" [{l}]"));
        let print = &self.session.print;
        match &outcome {
            Ok(_) => {
                print.println(&format!("Profile Results{title}:"));
                print.println(&format!("  Execution time: {:.4} seconds", duration.as_secs_f64()));
                print.println(&format!("  Statements: {}", body.len()));
            }
            Err(err) => {
                tracing::debug!(error = %err, elapsed = ?duration, "profiled block failed");
                print.println(&format!(
                    "Profile{title} terminated due to error after {:.4} seconds",
                    duration.as_secs_f64()
                ));
            }
        }
        self.session.diagnostics.write().profile_reports.push(ProfileReport {
            label: label.map(str::to_owned),
            duration,
            statements: body.len(),
            failed: outcome.is_err(),
        });
        outcome
    }
}
