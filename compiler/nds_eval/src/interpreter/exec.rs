//! Statement execution: dispatch, blocks and sequential loops.

use std::sync::Arc;
use std::time::Instant;

use nds_ir::{Block, Expr, ForStmt, IfStmt, Stmt, StmtKind};

use super::Interpreter;
use crate::config::LoopGuardPolicy;
use crate::control::{Completion, LoopAction};
use crate::errors::{infinite_loop_guard, iteration_timed_out, type_mismatch, EvalResult};
use crate::parallel::IterationDomain;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

impl Interpreter {
    /// Execute one statement. Errors pick up the statement's span unless a
    /// nested statement already attached one.
    pub fn exec_statement(&mut self, stmt: &Stmt) -> EvalResult<Completion> {
        self.check_deadline()?;
        let span = stmt.span.or(self.current_span);
        let outer_span = std::mem::replace(&mut self.current_span, span);
        let outcome = ensure_sufficient_stack(|| self.exec_kind(&stmt.kind));
        self.current_span = outer_span;
        outcome.map_err(|e| e.or_span(stmt.span))
    }

    fn check_deadline(&self) -> EvalResult<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                let limit = self.session.config.parallel.timeout.map_or(0, |t| t.as_millis());
                Err(iteration_timed_out(limit))
            }
            _ => Ok(()),
        }
    }

    fn exec_kind(&mut self, kind: &StmtKind) -> EvalResult<Completion> {
        match kind {
            StmtKind::Expr(expr) => self.eval_expr(expr).map(Completion::Normal),
            StmtKind::Assign { name, value } => {
                let value = self.eval_expr(value)?;
                self.env.set(name.clone(), value.clone());
                Ok(Completion::Normal(value))
            }
            StmtKind::Break => Ok(Completion::Break),
            StmtKind::Continue => Ok(Completion::Continue),
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::None,
                };
                Ok(Completion::Return(value))
            }
            StmtKind::If(stmt) => self.exec_if(stmt),
            StmtKind::While { condition, body } => self.exec_while(condition, body),
            StmtKind::For(stmt) => self.exec_for(stmt),
            StmtKind::ParallelFor(stmt) => self.exec_parallel_for(stmt),
            StmtKind::FunctionDef(def) => {
                tracing::debug!(name = %def.name, params = def.params.len(), "function registered");
                self.session
                    .functions
                    .write()
                    .insert(def.name.clone(), Arc::clone(def));
                Ok(Completion::none())
            }
            StmtKind::MacroDef(def) => {
                self.session.macros.write().register(Arc::clone(def));
                Ok(Completion::none())
            }
            StmtKind::Debug { message } => self.exec_debug(message.as_deref()),
            StmtKind::Profile { label, body } => self.exec_profile(label.as_deref(), body),
            StmtKind::Init { size } => self.exec_init(size.as_ref()),
            StmtKind::Evolve { steps } => self.exec_evolve(steps.as_ref()),
            StmtKind::Show { target } => self.exec_show(target),
            StmtKind::SetParameter { name, value } => self.exec_set_parameter(name, value),
            StmtKind::Save { path } => self.exec_save(path),
            StmtKind::Load { path } => self.exec_load(path),
            StmtKind::Exit => self.exec_exit(),
            StmtKind::Import(stmt) => self.exec_import(stmt),
        }
    }

    /// Run `block` in the current frame. The first non-normal completion
    /// stops the block, as does an `exit` anywhere in the session.
    pub(crate) fn exec_block(&mut self, block: &[Stmt]) -> EvalResult<Completion> {
        let mut last = Value::None;
        for stmt in block {
            if !self.session.is_running() {
                break;
            }
            match self.exec_statement(stmt)? {
                Completion::Normal(value) => last = value,
                signal => return Ok(signal),
            }
        }
        Ok(Completion::Normal(last))
    }

    fn exec_if(&mut self, stmt: &IfStmt) -> EvalResult<Completion> {
        if self.eval_expr(&stmt.condition)?.is_truthy() {
            return self.exec_block(&stmt.then_block);
        }
        for (condition, block) in &stmt.elif_blocks {
            if self.eval_expr(condition)?.is_truthy() {
                return self.exec_block(block);
            }
        }
        match &stmt.else_block {
            Some(block) => self.exec_block(block),
            None => Ok(Completion::none()),
        }
    }

    fn exec_while(&mut self, condition: &Expr, body: &Block) -> EvalResult<Completion> {
        let limit = self.session.config.max_while_iterations;
        let mut iterations = 0;
        let mut last = Value::None;
        while self.session.is_running() {
            if !self.eval_expr(condition)?.is_truthy() {
                break;
            }
            if iterations == limit {
                self.loop_guard_tripped(limit)?;
                break;
            }
            iterations += 1;
            match self.exec_block(body)?.at_loop_boundary(std::mem::take(&mut last)) {
                LoopAction::Next(value) => last = value,
                LoopAction::Exit => break,
                LoopAction::Propagate(signal) => return Ok(signal),
            }
        }
        Ok(Completion::Normal(last))
    }

    fn loop_guard_tripped(&self, limit: usize) -> EvalResult<()> {
        match self.session.config.loop_guard {
            LoopGuardPolicy::Error => Err(infinite_loop_guard(limit)),
            LoopGuardPolicy::Warn => {
                tracing::warn!(limit, span = ?self.current_span, "while loop stopped by iteration guard");
                self.session
                    .warn(format!("while loop terminated after {limit} iterations"));
                Ok(())
            }
        }
    }

    fn exec_for(&mut self, stmt: &ForStmt) -> EvalResult<Completion> {
        let domain = self.range_domain(stmt)?;
        let mut last = Value::None;
        for value in domain.values() {
            if !self.session.is_running() {
                break;
            }
            self.env.set(stmt.var.clone(), Value::Int(value));
            match self.exec_block(&stmt.body)?.at_loop_boundary(std::mem::take(&mut last)) {
                LoopAction::Next(value) => last = value,
                LoopAction::Exit => break,
                LoopAction::Propagate(signal) => return Ok(signal),
            }
        }
        Ok(Completion::Normal(last))
    }

    /// Evaluate `range(start, end, step)` once; step defaults to 1.
    pub(crate) fn range_domain(&mut self, stmt: &ForStmt) -> EvalResult<IterationDomain> {
        let start = self.eval_int(&stmt.start)?;
        let end = self.eval_int(&stmt.end)?;
        let step = match &stmt.step {
            Some(expr) => self.eval_int(expr)?,
            None => 1,
        };
        IterationDomain::new(start, end, step)
    }

    /// Evaluate `expr` and convert it to an integer; floats truncate.
    pub(crate) fn eval_int(&mut self, expr: &Expr) -> EvalResult<i64> {
        match self.eval_expr(expr)? {
            Value::Int(n) => Ok(n),
            Value::Float(x) if x.is_finite() => Ok(x.trunc() as i64),
            other => Err(type_mismatch("int", other.type_name())),
        }
    }
}
