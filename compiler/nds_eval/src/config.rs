//! Interpreter limits and parallel-engine tuning.
//!
//! [`InterpreterConfig`] is plain data with builder-style setters. It can
//! be overlaid from `NDS_*` environment variables with
//! [`InterpreterConfig::from_env`].

use std::str::FromStr;
use std::time::Duration;

use crate::scope::DEFAULT_MAX_CALL_DEPTH;

/// Default safety valve for `while` loops.
pub const DEFAULT_MAX_WHILE_ITERATIONS: usize = 10_000;

/// Default cap on the size of a `parallel for` domain.
pub const DEFAULT_MAX_PARALLEL_ITERATIONS: usize = 1_000_000;

/// What happens when a `while` loop reaches its iteration cap.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LoopGuardPolicy {
    /// Stop the loop, print a warning and continue with the next statement.
    #[default]
    Warn,
    /// Stop the loop with an `InfiniteLoopGuard` error.
    Error,
}

impl FromStr for LoopGuardPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(LoopGuardPolicy::Warn),
            "error" => Ok(LoopGuardPolicy::Error),
            other => Err(format!("expected 'warn' or 'error', got '{other}'")),
        }
    }
}

/// Heuristics of the parallel-loop engine.
#[derive(Clone, Debug, PartialEq)]
pub struct ParallelConfig {
    /// Iterations run sequentially to measure cost.
    pub sample_size: usize,
    /// Minimum iteration counts per workload class.
    pub light_threshold: usize,
    pub medium_threshold: usize,
    pub heavy_threshold: usize,
    /// Per-iteration cost below which a workload is light.
    pub light_cutoff: Duration,
    /// Per-iteration cost at or above which a workload is heavy.
    pub heavy_cutoff: Duration,
    /// Upper bound on workers; `None` uses available hardware concurrency.
    pub max_workers: Option<usize>,
    /// Wall-clock budget for one parallel loop; `None` is unbounded.
    pub timeout: Option<Duration>,
    /// Largest domain a single `parallel for` may cover.
    pub max_iterations: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        ParallelConfig {
            sample_size: 5,
            light_threshold: 100,
            medium_threshold: 20,
            heavy_threshold: 5,
            light_cutoff: Duration::from_millis(1),
            heavy_cutoff: Duration::from_millis(10),
            max_workers: None,
            timeout: Some(Duration::from_secs(30)),
            max_iterations: DEFAULT_MAX_PARALLEL_ITERATIONS,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InterpreterConfig {
    pub max_call_depth: usize,
    pub max_while_iterations: usize,
    pub loop_guard: LoopGuardPolicy,
    /// Suppress confirmation lines of simulation and persistence commands.
    pub silent: bool,
    pub parallel: ParallelConfig,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_while_iterations: DEFAULT_MAX_WHILE_ITERATIONS,
            loop_guard: LoopGuardPolicy::default(),
            silent: false,
            parallel: ParallelConfig::default(),
        }
    }
}

impl InterpreterConfig {
    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    #[must_use]
    pub fn max_while_iterations(mut self, limit: usize) -> Self {
        self.max_while_iterations = limit;
        self
    }

    #[must_use]
    pub fn loop_guard(mut self, policy: LoopGuardPolicy) -> Self {
        self.loop_guard = policy;
        self
    }

    #[must_use]
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    #[must_use]
    pub fn parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    ///
    /// Recognized keys: `NDS_MAX_CALL_DEPTH`, `NDS_MAX_WHILE_ITERATIONS`,
    /// `NDS_LOOP_GUARD`, `NDS_PARALLEL_WORKERS`, `NDS_PARALLEL_TIMEOUT_MS`
    /// (`0` disables the timeout), `NDS_PARALLEL_MAX_ITERATIONS`. Values
    /// that fail to parse are skipped.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(depth) = parse_var(&lookup, "NDS_MAX_CALL_DEPTH") {
            config.max_call_depth = depth;
        }
        if let Some(limit) = parse_var(&lookup, "NDS_MAX_WHILE_ITERATIONS") {
            config.max_while_iterations = limit;
        }
        if let Some(policy) = parse_var(&lookup, "NDS_LOOP_GUARD") {
            config.loop_guard = policy;
        }
        if let Some(workers) = parse_var::<usize>(&lookup, "NDS_PARALLEL_WORKERS") {
            config.parallel.max_workers = Some(workers.max(1));
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "NDS_PARALLEL_TIMEOUT_MS") {
            config.parallel.timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(max) = parse_var(&lookup, "NDS_PARALLEL_MAX_ITERATIONS") {
            config.parallel.max_iterations = max;
        }
        config
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, value = %raw, %err, "ignoring unparseable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests;
