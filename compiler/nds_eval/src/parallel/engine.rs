//! Execution backends for planned parallel loops.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel;
use rayon::prelude::*;

use super::{
    mean, BenchmarkReport, ExecutionStrategy, IterationDomain, IterationFailure, ParallelPlan,
    ParallelPolicy, ParallelReport,
};
use crate::config::ParallelConfig;
use crate::errors::{iteration_timed_out, parallel_domain_too_large, EvalError, EvalResult};
use crate::value::Value;

/// Worker thread stack; `stacker` grows it further for deep bodies.
const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

/// What the body closure receives for one iteration.
#[derive(Copy, Clone, Debug)]
pub struct IterationContext {
    pub index: usize,
    /// Loop-variable value.
    pub value: i64,
    /// Cooperative cancellation point; bodies stop at the next statement
    /// once it has passed.
    pub deadline: Option<Instant>,
}

type Slot = Option<EvalResult>;

pub struct ParallelEngine {
    policy: ParallelPolicy,
}

impl ParallelEngine {
    /// Engine with a policy built from `config`.
    pub fn new(config: ParallelConfig) -> Self {
        ParallelEngine {
            policy: ParallelPolicy::new(config),
        }
    }

    /// Engine around an existing policy.
    pub fn with_policy(policy: ParallelPolicy) -> Self {
        ParallelEngine { policy }
    }

    /// Policy used to classify and plan loops.
    pub fn policy(&self) -> &ParallelPolicy {
        &self.policy
    }

    /// Plan for `domain` given already-measured iteration costs.
    pub fn recommend(&self, domain: &IterationDomain, sample_costs: &[Duration]) -> ParallelPlan {
        self.policy.plan(domain.len(), sample_costs)
    }

    /// Sample, plan and run every iteration of `domain` through `body`.
    ///
    /// Fails without running anything when the domain is larger than
    /// `max_iterations`. Iteration failures are recorded in the report.
    #[tracing::instrument(level = "debug", skip_all, fields(iterations = domain.len()))]
    pub fn run<F>(&self, domain: &IterationDomain, body: F) -> EvalResult<ParallelReport>
    where
        F: Fn(IterationContext) -> EvalResult + Sync,
    {
        self.run_until(domain, None, body)
    }

    /// [`run`](Self::run) bounded by an outer deadline as well as the
    /// configured timeout; the earlier of the two wins.
    pub fn run_until<F>(
        &self,
        domain: &IterationDomain,
        outer_deadline: Option<Instant>,
        body: F,
    ) -> EvalResult<ParallelReport>
    where
        F: Fn(IterationContext) -> EvalResult + Sync,
    {
        self.check_domain(domain)?;
        Ok(self.execute(domain, outer_deadline, false, &body))
    }

    /// Time `rounds` fully sequential passes over `domain` against
    /// `rounds` passes that always use a parallel backend, whatever the
    /// thresholds say.
    #[tracing::instrument(level = "debug", skip_all, fields(iterations = domain.len(), rounds = rounds))]
    pub fn benchmark<F>(
        &self,
        domain: &IterationDomain,
        rounds: usize,
        body: F,
    ) -> EvalResult<BenchmarkReport>
    where
        F: Fn(IterationContext) -> EvalResult + Sync,
    {
        self.check_domain(domain)?;
        let rounds = rounds.max(1);

        let mut sequential = Vec::with_capacity(rounds);
        for _ in 0..rounds {
            let started = Instant::now();
            for index in 0..domain.len() {
                let ctx = IterationContext {
                    index,
                    value: domain.value_at(index),
                    deadline: None,
                };
                // Failures count toward the timing like any other iteration.
                let _ = catch_unwind(AssertUnwindSafe(|| body(ctx)));
            }
            sequential.push(started.elapsed());
        }

        let mut parallel = Vec::with_capacity(rounds);
        let mut last_plan = None;
        for _ in 0..rounds {
            let report = self.execute(domain, None, true, &body);
            parallel.push(report.elapsed);
            last_plan = Some(report.plan);
        }
        let plan = last_plan.unwrap_or_else(|| self.policy.plan(domain.len(), &[]));

        let report = BenchmarkReport {
            iterations: domain.len(),
            rounds,
            sequential: mean(&sequential),
            parallel: mean(&parallel),
            strategy: plan.strategy,
            workers: plan.workers,
        };
        tracing::debug!(
            sequential_us = report.sequential.as_micros() as u64,
            parallel_us = report.parallel.as_micros() as u64,
            speedup = report.speedup(),
            "parallel benchmark"
        );
        Ok(report)
    }

    fn check_domain(&self, domain: &IterationDomain) -> EvalResult<()> {
        let limit = self.policy.config().max_iterations;
        match domain.len() {
            total if total > limit => Err(parallel_domain_too_large(total, limit)),
            _ => Ok(()),
        }
    }

    /// Sample, plan and execute. `force_parallel` overrides a plan that
    /// would stay sequential.
    fn execute(
        &self,
        domain: &IterationDomain,
        outer_deadline: Option<Instant>,
        force_parallel: bool,
        body: &(dyn Fn(IterationContext) -> EvalResult + Sync),
    ) -> ParallelReport {
        let config = self.policy.config();
        let total = domain.len();

        let started = Instant::now();
        let deadline = earliest(
            config.timeout.and_then(|t| started.checked_add(t)),
            outer_deadline,
        );
        let limit_ms = deadline.map_or(0, |d| d.saturating_duration_since(started).as_millis());

        let run_slot = |index: usize| -> EvalResult {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(iteration_timed_out(limit_ms));
            }
            let ctx = IterationContext {
                index,
                value: domain.value_at(index),
                deadline,
            };
            catch_unwind(AssertUnwindSafe(|| body(ctx))).unwrap_or_else(|payload| {
                Err(EvalError::new(format!(
                    "iteration panicked: {}",
                    panic_message(payload.as_ref())
                )))
            })
        };

        let mut slots: Vec<Slot> = Vec::with_capacity(total);
        let sampled = config.sample_size.min(total);
        let mut costs = Vec::with_capacity(sampled);
        for index in 0..sampled {
            let t = Instant::now();
            slots.push(Some(run_slot(index)));
            costs.push(t.elapsed());
        }

        let mut plan = self.policy.plan(total, &costs);
        if force_parallel && !plan.should_parallelize {
            plan.strategy = self.policy.strategy(plan.workload, true);
            plan.workers = self.policy.workers(total);
        }
        let rest = sampled..total;
        let tail: Vec<Slot> = match plan.strategy {
            _ if rest.is_empty() => Vec::new(),
            ExecutionStrategy::Sequential => rest.map(|i| Some(run_slot(i))).collect(),
            ExecutionStrategy::ThreadPool => run_thread_pool(plan.workers, rest, &run_slot),
            ExecutionStrategy::DedicatedWorkers => {
                run_dedicated(plan.workers, rest, deadline, &run_slot)
            }
        };
        slots.extend(tail);

        let mut results = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (index, slot) in slots.into_iter().enumerate() {
            let outcome = slot.unwrap_or_else(|| Err(iteration_timed_out(limit_ms)));
            match outcome {
                Ok(value) => results.push(value),
                Err(err) => {
                    let value = domain.value_at(index);
                    tracing::warn!(index, value, error = %err.message, "parallel iteration failed");
                    results.push(Value::Failure(err.message.as_str().into()));
                    failures.push(IterationFailure {
                        index,
                        value,
                        message: err.message,
                    });
                }
            }
        }

        let elapsed = started.elapsed();
        tracing::debug!(
            strategy = %plan.strategy,
            failures = failures.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "parallel loop finished"
        );
        ParallelReport {
            plan,
            results,
            failures,
            sampled,
            elapsed,
        }
    }
}

fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Scoped rayon pool of `workers` threads; falls back to sequential
/// execution when the pool cannot be built.
fn run_thread_pool(
    workers: usize,
    indices: std::ops::Range<usize>,
    run_slot: &(dyn Fn(usize) -> EvalResult + Sync),
) -> Vec<Slot> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .stack_size(WORKER_STACK_SIZE)
        .thread_name(|i| format!("nds-parallel-{i}"))
        .build();
    match pool {
        Ok(pool) => pool.install(|| {
            indices
                .into_par_iter()
                .map(|i| Some(run_slot(i)))
                .collect()
        }),
        Err(e) => {
            tracing::warn!("failed to create thread pool ({e}), running sequentially");
            indices.map(|i| Some(run_slot(i))).collect()
        }
    }
}

/// Dedicated OS threads pulling indices from a shared job queue.
///
/// Once `deadline` passes the collector stops waiting, raises the cancel
/// flag so workers take no new jobs, and leaves unfinished slots empty.
fn run_dedicated(
    workers: usize,
    indices: std::ops::Range<usize>,
    deadline: Option<Instant>,
    run_slot: &(dyn Fn(usize) -> EvalResult + Sync),
) -> Vec<Slot> {
    let base = indices.start;
    let count = indices.len();
    let mut slots: Vec<Slot> = vec![None; count];
    let cancelled = AtomicBool::new(false);

    let (job_tx, job_rx) = channel::unbounded::<usize>();
    for index in indices.clone() {
        // The receiver lives until the scope below ends.
        let _ = job_tx.send(index);
    }
    drop(job_tx);
    let (result_tx, result_rx) = channel::unbounded::<(usize, EvalResult)>();

    let spawned = thread::scope(|s| {
        let mut spawned = 0;
        for worker in 0..workers {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let cancelled = &cancelled;
            let handle = thread::Builder::new()
                .name(format!("nds-worker-{worker}"))
                .stack_size(WORKER_STACK_SIZE)
                .spawn_scoped(s, move || {
                    while let Ok(index) = jobs.recv() {
                        if cancelled.load(Ordering::Acquire) {
                            break;
                        }
                        if results.send((index, run_slot(index))).is_err() {
                            break;
                        }
                    }
                });
            match handle {
                Ok(_) => spawned += 1,
                Err(e) => tracing::warn!(worker, "failed to spawn worker: {e}"),
            }
        }
        drop(result_tx);

        if spawned == 0 {
            return 0;
        }
        let mut received = 0;
        while received < count {
            let next = match deadline {
                Some(d) => result_rx.recv_deadline(d).ok(),
                None => result_rx.recv().ok(),
            };
            let Some((index, outcome)) = next else {
                cancelled.store(true, Ordering::Release);
                break;
            };
            slots[index - base] = Some(outcome);
            received += 1;
        }
        spawned
    });

    if spawned == 0 {
        tracing::warn!("no workers available, running sequentially");
        return indices.map(|i| Some(run_slot(i))).collect();
    }
    // Late arrivals finished before their workers joined.
    for (index, outcome) in result_rx.try_iter() {
        if slots[index - base].is_none() {
            slots[index - base] = Some(outcome);
        }
    }
    slots
}
