//! Parallel-loop engine.
//!
//! A `parallel for` runs in three phases:
//!
//! 1. **Sample.** Up to `sample_size` leading iterations run sequentially on
//!    the calling thread and are timed.
//! 2. **Plan.** [`ParallelPolicy::plan`] turns the iteration count and the
//!    measured costs into a [`ParallelPlan`]: workload class, whether the
//!    loop clears the class threshold, the execution strategy, the worker
//!    count and an expected-benefit label. The policy is a pure function
//!    of its inputs and never spawns anything.
//! 3. **Execute.** [`ParallelEngine`] runs the remaining iterations with the
//!    chosen backend and reassembles results in index order.
//!
//! Iteration failures never abort siblings. Each failed slot holds a
//! [`Value::Failure`] marker and an [`IterationFailure`] entry in the
//! [`ParallelReport`].

mod engine;

use std::fmt;
use std::time::Duration;

pub use engine::{IterationContext, ParallelEngine};

use crate::config::ParallelConfig;
use crate::errors::{zero_step, EvalResult};
use crate::value::Value;

/// Per-iteration cost class derived from sampled timings.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum WorkloadClass {
    Light,
    Medium,
    Heavy,
}

impl fmt::Display for WorkloadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WorkloadClass::Light => "light",
            WorkloadClass::Medium => "medium",
            WorkloadClass::Heavy => "heavy",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionStrategy {
    Sequential,
    /// Work-stealing rayon pool; cheap dispatch for light and medium bodies.
    ThreadPool,
    /// One OS thread per worker pulling jobs from a channel, for heavy
    /// CPU-bound bodies. Workers stop taking jobs once the loop times out.
    DedicatedWorkers,
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionStrategy::Sequential => "sequential",
            ExecutionStrategy::ThreadPool => "thread pool",
            ExecutionStrategy::DedicatedWorkers => "dedicated workers",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExpectedBenefit {
    High,
    Medium,
    Low,
    Minimal,
}

/// Half-open integer range `start..end` walked by `step`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IterationDomain {
    pub start: i64,
    pub end: i64,
    pub step: i64,
}

impl IterationDomain {
    pub fn new(start: i64, end: i64, step: i64) -> EvalResult<Self> {
        if step == 0 {
            return Err(zero_step());
        }
        Ok(IterationDomain { start, end, step })
    }

    pub fn len(&self) -> usize {
        let (start, end, step) = (
            i128::from(self.start),
            i128::from(self.end),
            i128::from(self.step),
        );
        let span = if step > 0 { end - start } else { start - end };
        if span <= 0 {
            return 0;
        }
        let count = (span + step.abs() - 1) / step.abs();
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loop-variable value of iteration `index`.
    pub fn value_at(&self, index: usize) -> i64 {
        let offset = i128::try_from(index).unwrap_or(i128::MAX) * i128::from(self.step);
        i64::try_from(i128::from(self.start) + offset).unwrap_or(self.end)
    }

    pub fn values(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.len()).map(|i| self.value_at(i))
    }
}

/// Every decision the engine makes for one loop.
#[derive(Clone, Debug, PartialEq)]
pub struct ParallelPlan {
    pub iterations: usize,
    /// Mean sampled cost of one iteration.
    pub per_iteration: Duration,
    pub workload: WorkloadClass,
    pub should_parallelize: bool,
    pub strategy: ExecutionStrategy,
    pub workers: usize,
    pub expected_benefit: ExpectedBenefit,
}

/// Pure decision function from (iterations, measured cost) to a plan.
#[derive(Clone, Debug)]
pub struct ParallelPolicy {
    config: ParallelConfig,
    available: usize,
}

impl ParallelPolicy {
    pub fn new(config: ParallelConfig) -> Self {
        let available = std::thread::available_parallelism().map_or(1, usize::from);
        Self::with_available_workers(config, available)
    }

    /// Policy with a fixed hardware-concurrency figure.
    pub fn with_available_workers(config: ParallelConfig, available: usize) -> Self {
        ParallelPolicy {
            config,
            available: available.max(1),
        }
    }

    /// Thresholds this policy was built from.
    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Hardware parallelism, at least 1.
    pub fn available_workers(&self) -> usize {
        self.available
    }

    pub fn classify(&self, per_iteration: Duration) -> WorkloadClass {
        if per_iteration < self.config.light_cutoff {
            WorkloadClass::Light
        } else if per_iteration < self.config.heavy_cutoff {
            WorkloadClass::Medium
        } else {
            WorkloadClass::Heavy
        }
    }

    /// Minimum iteration count that makes parallel execution worthwhile.
    pub fn threshold(&self, workload: WorkloadClass) -> usize {
        match workload {
            WorkloadClass::Light => self.config.light_threshold,
            WorkloadClass::Medium => self.config.medium_threshold,
            WorkloadClass::Heavy => self.config.heavy_threshold,
        }
    }

    pub fn should_parallelize(&self, iterations: usize, workload: WorkloadClass) -> bool {
        iterations >= self.threshold(workload)
    }

    pub fn strategy(&self, workload: WorkloadClass, parallelize: bool) -> ExecutionStrategy {
        match (parallelize, workload) {
            (false, _) => ExecutionStrategy::Sequential,
            (true, WorkloadClass::Heavy) => ExecutionStrategy::DedicatedWorkers,
            (true, WorkloadClass::Light | WorkloadClass::Medium) => ExecutionStrategy::ThreadPool,
        }
    }

    /// Worker count bounded by hardware, loop size and `max_workers`.
    pub fn workers(&self, iterations: usize) -> usize {
        let by_size = if iterations < 100 {
            self.available.min(4)
        } else if iterations < 1000 {
            self.available.min(8)
        } else {
            self.available
        };
        let capped = self.config.max_workers.map_or(by_size, |max| by_size.min(max));
        capped.min(iterations).max(1)
    }

    pub fn expected_benefit(&self, workload: WorkloadClass, iterations: usize) -> ExpectedBenefit {
        match workload {
            WorkloadClass::Heavy if iterations >= 10 => ExpectedBenefit::High,
            WorkloadClass::Medium if iterations >= 50 => ExpectedBenefit::Medium,
            WorkloadClass::Light if iterations >= 200 => ExpectedBenefit::Low,
            _ => ExpectedBenefit::Minimal,
        }
    }

    pub fn plan(&self, iterations: usize, sample_costs: &[Duration]) -> ParallelPlan {
        let per_iteration = mean(sample_costs);
        let workload = self.classify(per_iteration);
        let should_parallelize = self.should_parallelize(iterations, workload);
        let strategy = self.strategy(workload, should_parallelize);
        let workers = if should_parallelize {
            self.workers(iterations)
        } else {
            1
        };
        let plan = ParallelPlan {
            iterations,
            per_iteration,
            workload,
            should_parallelize,
            strategy,
            workers,
            expected_benefit: self.expected_benefit(workload, iterations),
        };
        tracing::debug!(
            iterations,
            per_iteration_us = per_iteration.as_micros() as u64,
            workload = %plan.workload,
            threshold = self.threshold(workload),
            should_parallelize,
            strategy = %plan.strategy,
            workers,
            "parallel plan"
        );
        plan
    }
}

fn mean(samples: &[Duration]) -> Duration {
    let Ok(count) = u32::try_from(samples.len()) else {
        return Duration::ZERO;
    };
    if count == 0 {
        return Duration::ZERO;
    }
    samples.iter().sum::<Duration>() / count
}

#[derive(Clone, Debug, PartialEq)]
pub struct IterationFailure {
    pub index: usize,
    /// Loop-variable value of the failed iteration.
    pub value: i64,
    pub message: String,
}

/// Outcome of one `parallel for`.
#[derive(Clone, Debug, PartialEq)]
pub struct ParallelReport {
    pub plan: ParallelPlan,
    /// One entry per iteration, in index order.
    pub results: Vec<Value>,
    pub failures: Vec<IterationFailure>,
    /// Leading iterations that ran during sampling.
    pub sampled: usize,
    pub elapsed: Duration,
}

impl ParallelReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sequential against parallel timing of one domain.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchmarkReport {
    pub iterations: usize,
    pub rounds: usize,
    /// Mean wall-clock time of one sequential pass.
    pub sequential: Duration,
    /// Mean wall-clock time of one parallel pass.
    pub parallel: Duration,
    pub strategy: ExecutionStrategy,
    pub workers: usize,
}

impl BenchmarkReport {
    /// Sequential time over parallel time; `0.0` when nothing was measured.
    pub fn speedup(&self) -> f64 {
        let parallel = self.parallel.as_secs_f64();
        if parallel > 0.0 {
            self.sequential.as_secs_f64() / parallel
        } else {
            0.0
        }
    }

    /// Speedup per worker, as a percentage.
    pub fn efficiency(&self) -> f64 {
        self.speedup() / self.workers.max(1) as f64 * 100.0
    }

    /// Time saved by the parallel pass, as a percentage of the sequential one.
    pub fn improvement_percent(&self) -> f64 {
        let sequential = self.sequential.as_secs_f64();
        if sequential > 0.0 {
            (sequential - self.parallel.as_secs_f64()) / sequential * 100.0
        } else {
            0.0
        }
    }
}

/// Counters accumulated across every parallel loop of a session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParallelStats {
    pub parallel_runs: usize,
    pub sequential_runs: usize,
    pub iterations: usize,
    pub failures: usize,
    pub parallel_time: Duration,
    pub sequential_time: Duration,
}

impl ParallelStats {
    pub fn record(&mut self, report: &ParallelReport) {
        if report.plan.strategy == ExecutionStrategy::Sequential {
            self.sequential_runs += 1;
            self.sequential_time += report.elapsed;
        } else {
            self.parallel_runs += 1;
            self.parallel_time += report.elapsed;
        }
        self.iterations += report.results.len();
        self.failures += report.failures.len();
    }

    pub fn total_runs(&self) -> usize {
        self.parallel_runs + self.sequential_runs
    }
}
