//! `parallel for` execution.
//!
//! Each iteration runs in a worker interpreter over a child of the loop's
//! frame: the loop variable and first-written names stay local to the
//! iteration, while assignments to names that already exist further out
//! write through to the shared frame. Workers own their call stacks.

use std::sync::Arc;

use nds_ir::{ForStmt, Span};

use super::{Interpreter, Session};
use crate::control::Completion;
use crate::environment::Environment;
use crate::errors::{return_in_parallel_body, EvalResult};
use crate::parallel::{BenchmarkReport, IterationContext};
use crate::value::Value;

impl Interpreter {
    #[tracing::instrument(level = "debug", skip_all, fields(var = %stmt.var))]
    pub(super) fn exec_parallel_for(&mut self, stmt: &ForStmt) -> EvalResult<Completion> {
        let domain = self.range_domain(stmt)?;
        let engine = Arc::clone(&self.session.engine);

        // A nested loop stays inside the deadline of the loop around it.
        let report = engine.run_until(&domain, self.deadline, |ctx| {
            run_iteration(&self.session, &self.env, self.current_span, stmt, ctx)
        })?;

        if !report.failures.is_empty() {
            self.session.warn(format!(
                "{} of {} parallel iterations failed",
                report.failures.len(),
                report.results.len()
            ));
        }
        let results = Value::list(report.results.clone());
        {
            let mut diagnostics = self.session.diagnostics.write();
            diagnostics.parallel_stats.record(&report);
            diagnostics.last_parallel = Some(report);
        }
        Ok(Completion::Normal(results))
    }

    /// Time `stmt` run sequentially against a forced parallel run.
    ///
    /// The loop body runs `2 * rounds` times over the whole range, so any
    /// writes it makes to outer names are repeated that often.
    pub fn benchmark_parallel_for(
        &mut self,
        stmt: &ForStmt,
        rounds: usize,
    ) -> EvalResult<BenchmarkReport> {
        let domain = self.range_domain(stmt)?;
        let engine = Arc::clone(&self.session.engine);
        engine.benchmark(&domain, rounds, |ctx| {
            run_iteration(&self.session, &self.env, self.current_span, stmt, ctx)
        })
    }
}

/// One iteration in its own frame and worker interpreter.
fn run_iteration(
    session: &Session,
    outer: &Environment,
    span: Option<Span>,
    stmt: &ForStmt,
    ctx: IterationContext,
) -> EvalResult {
    let scope = outer.create_child();
    scope.define(stmt.var.clone(), Value::Int(ctx.value));
    let mut worker = Interpreter::with_session(session.clone(), scope, ctx.deadline);
    worker.current_span = span;
    match worker.exec_block(&stmt.body)? {
        Completion::Normal(value) => Ok(value),
        // Only the current iteration ends.
        Completion::Break | Completion::Continue => Ok(Value::None),
        Completion::Return(_) => Err(return_in_parallel_body()),
    }
}
