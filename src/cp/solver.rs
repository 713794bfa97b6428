//! CP solver interface and the branch-and-bound implementation.

use super::model::CpModel;
use super::search::{Compiled, Shared, Snapshot, Worker};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Status of the solver after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// Proven optimal solution found.
    Optimal,
    /// Feasible solution found; optimality not proven (or no objective).
    Feasible,
    /// Proven that no assignment satisfies the constraints.
    Infeasible,
    /// Model is invalid or malformed.
    ModelInvalid,
    /// Solver exceeded its time limit without a solution.
    Timeout,
    /// Cancelled externally without a solution.
    Cancelled,
}

/// Solution from a CP solver.
#[derive(Debug, Clone)]
pub struct CpSolution {
    /// Solver status.
    pub status: SolverStatus,
    /// Objective function value (if any).
    pub objective_value: Option<i64>,
    /// Integer variable assignments.
    pub int_vars: HashMap<String, i64>,
    /// Boolean variable assignments.
    pub bool_vars: HashMap<String, bool>,
    /// Solve time in milliseconds.
    pub solve_time_ms: i64,
    /// Search nodes explored.
    pub nodes: u64,
    /// Whether the search stopped on its time limit or cancel flag.
    pub interrupted: bool,
}

impl CpSolution {
    /// Creates an empty solution with the given status.
    pub fn empty(status: SolverStatus) -> Self {
        Self {
            status,
            objective_value: None,
            int_vars: HashMap::new(),
            bool_vars: HashMap::new(),
            solve_time_ms: 0,
            nodes: 0,
            interrupted: false,
        }
    }

    /// Whether a feasible solution was found.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, SolverStatus::Optimal | SolverStatus::Feasible)
    }

    /// Value of a boolean variable in this solution.
    pub fn bool_value(&self, name: &str) -> Option<bool> {
        self.bool_vars.get(name).copied()
    }

    /// Value of an integer variable in this solution.
    pub fn int_value(&self, name: &str) -> Option<i64> {
        self.int_vars.get(name).copied()
    }
}

/// Solver configuration.
///
/// # Examples
///
/// ```
/// use u_teambalance::cp::SolverConfig;
///
/// let config = SolverConfig::default()
///     .with_time_limit_ms(5_000)
///     .with_num_workers(4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum solve time in milliseconds. Zero or negative disables the limit.
    pub time_limit_ms: i64,
    /// Number of parallel workers (effective with the `parallel` feature).
    pub num_workers: usize,
    /// Stop after finding the first feasible solution.
    pub stop_after_first: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 60_000,
            num_workers: 1,
            stop_after_first: false,
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit_ms(mut self, ms: i64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    pub fn with_num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn with_stop_after_first(mut self, stop: bool) -> Self {
        self.stop_after_first = stop;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.num_workers == 0 {
            return Err("num_workers must be at least 1".into());
        }
        Ok(())
    }

    fn time_limit(&self) -> Option<Duration> {
        u64::try_from(self.time_limit_ms)
            .ok()
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }
}

/// Trait for CP solver implementations.
///
/// A solver turns a constraint model into a satisfying assignment or a
/// proof that none exists. Implementations may wrap an external engine
/// or search on their own; callers only see [`CpSolution`].
pub trait CpSolver {
    /// Solves the model and returns a solution.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        self.solve_with_cancel(model, config, None)
    }

    /// Solves the model; setting `cancel` aborts the whole search.
    fn solve_with_cancel(
        &self,
        model: &CpModel,
        config: &SolverConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> CpSolution;
}

/// Exact depth-first branch-and-bound solver.
///
/// Branches on boolean variables in model order (true first), propagates
/// linear constraints to fixpoint, and prunes with interval bounds on
/// quotients and differences. Every feasible leaf tightens the objective
/// bound, so an exhausted search proves optimality; an exhausted search
/// without a leaf proves infeasibility.
///
/// # Examples
///
/// ```
/// use u_teambalance::cp::{
///     BoolVar, BranchAndBoundSolver, CpModel, CpSolver, Relation, SolverConfig, SolverStatus,
/// };
///
/// let mut model = CpModel::new("two-of-three");
/// for name in ["a", "b", "c"] {
///     model.add_bool_var(BoolVar::new(name));
/// }
/// let terms = ["a", "b", "c"].iter().map(|n| (n.to_string(), 1)).collect();
/// model.add_linear(terms, Relation::Eq, 2);
///
/// let solution = BranchAndBoundSolver::new().solve(&model, &SolverConfig::default());
/// assert_eq!(solution.status, SolverStatus::Feasible);
/// assert_eq!(solution.bool_vars.values().filter(|&&v| v).count(), 2);
/// ```
pub struct BranchAndBoundSolver;

impl BranchAndBoundSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BranchAndBoundSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CpSolver for BranchAndBoundSolver {
    fn solve_with_cancel(
        &self,
        model: &CpModel,
        config: &SolverConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> CpSolution {
        if let Err(reason) = model.validate().and_then(|_| config.validate()) {
            tracing::warn!(model = %model.name, %reason, "rejecting model");
            return CpSolution::empty(SolverStatus::ModelInvalid);
        }

        let start_time = Instant::now();
        let compiled = Compiled::new(model);
        let shared = Shared::new(config.time_limit(), cancel, config.stop_after_first);

        let mut root = Worker::new(&compiled, &shared);
        let feasible_root = root.init_root();
        if feasible_root {
            if root.try_hint() {
                tracing::debug!(model = %model.name, "hint accepted");
            }
            let frontier = root.frontier(frontier_size(config.num_workers));
            explore(&compiled, &shared, frontier, config.num_workers);
        }

        let interrupted = shared.timed_out() || shared.cancelled();
        let incumbent = shared.take_incumbent();
        let status = match &incumbent {
            Some(_) if interrupted || config.stop_after_first || !compiled.has_objective() => {
                SolverStatus::Feasible
            }
            Some(_) => SolverStatus::Optimal,
            None if shared.timed_out() => SolverStatus::Timeout,
            None if shared.cancelled() => SolverStatus::Cancelled,
            None => SolverStatus::Infeasible,
        };

        let mut solution = CpSolution::empty(status);
        solution.interrupted = interrupted;
        if let Some(incumbent) = incumbent {
            solution.objective_value = incumbent.objective;
            solution.bool_vars = compiled
                .bool_names
                .iter()
                .cloned()
                .zip(incumbent.bools)
                .collect();
            solution.int_vars = compiled
                .int_names
                .iter()
                .cloned()
                .zip(incumbent.ints)
                .collect();
        }
        solution.nodes = shared.nodes();
        solution.solve_time_ms = start_time.elapsed().as_millis() as i64;

        tracing::info!(
            model = %model.name,
            status = ?solution.status,
            objective = ?solution.objective_value,
            nodes = solution.nodes,
            ms = solution.solve_time_ms,
            "solve finished"
        );
        solution
    }
}

/// Subtrees to prepare for `workers` parallel explorers.
fn frontier_size(workers: usize) -> usize {
    if workers <= 1 {
        1
    } else {
        workers * 4
    }
}

#[cfg(feature = "parallel")]
fn explore(compiled: &Compiled, shared: &Shared, frontier: Vec<Snapshot>, workers: usize) {
    use rayon::prelude::*;

    if workers <= 1 {
        return explore_sequential(compiled, shared, frontier);
    }
    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(|| {
            frontier.into_par_iter().for_each(|snapshot| {
                Worker::from_snapshot(compiled, shared, snapshot).run();
            });
        }),
        Err(err) => {
            tracing::warn!(%err, "thread pool unavailable, searching sequentially");
            explore_sequential(compiled, shared, frontier);
        }
    }
}

#[cfg(not(feature = "parallel"))]
fn explore(compiled: &Compiled, shared: &Shared, frontier: Vec<Snapshot>, _workers: usize) {
    explore_sequential(compiled, shared, frontier);
}

fn explore_sequential(compiled: &Compiled, shared: &Shared, frontier: Vec<Snapshot>) {
    for snapshot in frontier {
        Worker::from_snapshot(compiled, shared, snapshot).run();
    }
}
