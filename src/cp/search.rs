//! Depth-first branch-and-bound over boolean decisions.
//!
//! The model is compiled to index form once. Each worker owns its partial
//! assignment and undo trail; workers share only the objective bound, the
//! stop flag, and the incumbent.

use super::model::{Constraint, CpModel, Limit, Objective, Relation};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Nodes between two clock reads.
const CLOCK_INTERVAL: u64 = 1024;

const RUNNING: u8 = 0;
const TIMED_OUT: u8 = 1;
const CANCELLED: u8 = 2;

struct LinearC {
    terms: Vec<(usize, i64)>,
    relation: Relation,
    rhs: i64,
}

struct QuotientC {
    target: usize,
    /// Sorted by ascending coefficient.
    terms: Vec<(usize, i64)>,
    divisor: i64,
    cardinality: Option<i64>,
}

#[derive(Clone, Copy)]
enum CLimit {
    Constant(i64),
    Var(usize),
}

struct DiffC {
    left: usize,
    right: usize,
    limit: CLimit,
}

/// Index-based form of a validated [`CpModel`].
pub(crate) struct Compiled {
    pub(crate) bool_names: Vec<String>,
    pub(crate) int_names: Vec<String>,
    domains: Vec<(i64, i64)>,
    linears: Vec<LinearC>,
    quotients: Vec<QuotientC>,
    diffs: Vec<DiffC>,
    /// Linear constraints mentioning each boolean.
    watches: Vec<Vec<usize>>,
    fixed: Vec<Option<bool>>,
    objective: Option<usize>,
    hint: Option<Vec<bool>>,
}

impl Compiled {
    /// Compiles a model. The model must already be valid.
    pub(crate) fn new(model: &CpModel) -> Self {
        let bool_index: HashMap<&str, usize> = model
            .bool_vars
            .iter()
            .enumerate()
            .map(|(i, v)| (v.name.as_str(), i))
            .collect();
        let int_index: HashMap<&str, usize> = model
            .int_vars
            .iter()
            .enumerate()
            .map(|(i, v)| (v.name.as_str(), i))
            .collect();
        let bool_terms = |terms: &[(String, i64)]| -> Vec<(usize, i64)> {
            terms
                .iter()
                .map(|(name, coef)| (bool_index[name.as_str()], *coef))
                .collect()
        };

        let mut linears = Vec::new();
        let mut quotients = Vec::new();
        let mut diffs = Vec::new();
        for constraint in &model.constraints {
            match constraint {
                Constraint::Linear {
                    terms,
                    relation,
                    rhs,
                } => linears.push(LinearC {
                    terms: bool_terms(terms),
                    relation: *relation,
                    rhs: *rhs,
                }),
                Constraint::Quotient {
                    target,
                    terms,
                    divisor,
                    cardinality,
                } => {
                    let mut terms = bool_terms(terms);
                    terms.sort_by_key(|&(_, coef)| coef);
                    quotients.push(QuotientC {
                        target: int_index[target.as_str()],
                        terms,
                        divisor: *divisor,
                        cardinality: *cardinality,
                    });
                }
                Constraint::AbsDiffAtMost { left, right, limit } => diffs.push(DiffC {
                    left: int_index[left.as_str()],
                    right: int_index[right.as_str()],
                    limit: match limit {
                        Limit::Constant(c) => CLimit::Constant(*c),
                        Limit::Var(name) => CLimit::Var(int_index[name.as_str()]),
                    },
                }),
            }
        }

        let mut watches = vec![Vec::new(); model.bool_vars.len()];
        for (ci, c) in linears.iter().enumerate() {
            for &(v, _) in &c.terms {
                if watches[v].last() != Some(&ci) {
                    watches[v].push(ci);
                }
            }
        }

        let fixed: Vec<Option<bool>> = model.bool_vars.iter().map(|v| v.fixed).collect();
        let hint = model
            .bool_vars
            .iter()
            .map(|v| model.hints.get(&v.name).copied().or(v.fixed))
            .collect::<Option<Vec<bool>>>();

        Self {
            bool_names: model.bool_vars.iter().map(|v| v.name.clone()).collect(),
            int_names: model.int_vars.iter().map(|v| v.name.clone()).collect(),
            domains: model.int_vars.iter().map(|v| (v.min, v.max)).collect(),
            linears,
            quotients,
            diffs,
            watches,
            fixed,
            objective: model.objective.as_ref().map(|Objective::Minimize { var }| {
                int_index[var.as_str()]
            }),
            hint: if model.hints.is_empty() { None } else { hint },
        }
    }

    pub(crate) fn has_objective(&self) -> bool {
        self.objective.is_some()
    }

    /// Exact evaluation of a complete assignment.
    ///
    /// Returns the integer values and the objective value, or `None` if a
    /// constraint is violated or the objective would exceed `objective_cap`.
    fn evaluate(&self, values: &[bool], objective_cap: i64) -> Option<(Vec<i64>, Option<i64>)> {
        let weigh = |terms: &[(usize, i64)]| -> i64 {
            terms
                .iter()
                .filter(|&&(v, _)| values[v])
                .map(|&(_, coef)| coef)
                .sum()
        };

        for c in &self.linears {
            if !c.relation.holds(weigh(&c.terms), c.rhs) {
                return None;
            }
        }

        // Free variables start at their minimum and rise to cover their limits.
        let mut ints: Vec<i64> = self.domains.iter().map(|&(min, _)| min).collect();
        for q in &self.quotients {
            let value = weigh(&q.terms).div_euclid(q.divisor);
            let (min, max) = self.domains[q.target];
            if value < min || value > max {
                return None;
            }
            ints[q.target] = value;
        }
        for d in &self.diffs {
            let gap = (ints[d.left] - ints[d.right]).abs();
            match d.limit {
                CLimit::Constant(c) => {
                    if gap > c {
                        return None;
                    }
                }
                CLimit::Var(v) => ints[v] = ints[v].max(gap),
            }
        }
        for d in &self.diffs {
            if let CLimit::Var(v) = d.limit {
                if ints[v] > self.domains[v].1 {
                    return None;
                }
            }
        }

        let objective = self.objective.map(|v| ints[v]);
        if objective.is_some_and(|value| value > objective_cap) {
            return None;
        }
        Some((ints, objective))
    }
}

/// Best complete assignment found so far.
#[derive(Debug, Clone)]
pub(crate) struct Incumbent {
    pub(crate) bools: Vec<bool>,
    pub(crate) ints: Vec<i64>,
    pub(crate) objective: Option<i64>,
}

/// State shared by all workers of one search.
pub(crate) struct Shared {
    /// Objective of the incumbent (`i64::MAX` when none).
    bound: AtomicI64,
    stop: AtomicBool,
    interrupted: AtomicU8,
    nodes: AtomicU64,
    incumbent: Mutex<Option<Incumbent>>,
    deadline: Option<Instant>,
    cancel: Option<Arc<AtomicBool>>,
    stop_after_first: bool,
}

impl Shared {
    pub(crate) fn new(
        time_limit: Option<Duration>,
        cancel: Option<Arc<AtomicBool>>,
        stop_after_first: bool,
    ) -> Self {
        Self {
            bound: AtomicI64::new(i64::MAX),
            stop: AtomicBool::new(false),
            interrupted: AtomicU8::new(RUNNING),
            nodes: AtomicU64::new(0),
            incumbent: Mutex::new(None),
            deadline: time_limit.map(|limit| Instant::now() + limit),
            cancel,
            stop_after_first,
        }
    }

    pub(crate) fn timed_out(&self) -> bool {
        self.interrupted.load(Ordering::Relaxed) == TIMED_OUT
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.interrupted.load(Ordering::Relaxed) == CANCELLED
    }

    pub(crate) fn nodes(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }

    pub(crate) fn take_incumbent(&self) -> Option<Incumbent> {
        match self.incumbent.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    fn interrupt(&self, reason: u8) {
        let _ = self
            .interrupted
            .compare_exchange(RUNNING, reason, Ordering::Relaxed, Ordering::Relaxed);
        self.stop.store(true, Ordering::Relaxed);
    }

    fn offer(&self, candidate: Incumbent, stops: bool) {
        let mut guard = match self.incumbent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let better = match (&*guard, candidate.objective) {
            (None, _) => true,
            (Some(current), Some(value)) => current.objective.is_some_and(|best| value < best),
            (Some(_), None) => false,
        };
        if better {
            if let Some(value) = candidate.objective {
                self.bound.fetch_min(value, Ordering::Relaxed);
                tracing::debug!(objective = value, "new incumbent");
            }
            *guard = Some(candidate);
        }
        if stops {
            self.stop.store(true, Ordering::Relaxed);
        }
    }
}

/// A partial assignment; starting point of a subtree.
pub(crate) type Snapshot = Vec<Option<bool>>;

/// One depth-first explorer.
pub(crate) struct Worker<'a> {
    model: &'a Compiled,
    shared: &'a Shared,
    assign: Vec<Option<bool>>,
    trail: Vec<usize>,
    in_queue: Vec<bool>,
    queue: Vec<usize>,
    bounds: Vec<(i64, i64)>,
    nodes: u64,
}

impl<'a> Worker<'a> {
    pub(crate) fn new(model: &'a Compiled, shared: &'a Shared) -> Self {
        Self {
            model,
            shared,
            assign: vec![None; model.bool_names.len()],
            trail: Vec::new(),
            in_queue: vec![false; model.linears.len()],
            queue: Vec::new(),
            bounds: model.domains.clone(),
            nodes: 0,
        }
    }

    pub(crate) fn from_snapshot(model: &'a Compiled, shared: &'a Shared, snapshot: Snapshot) -> Self {
        let mut worker = Self::new(model, shared);
        worker.assign = snapshot;
        worker
    }

    /// Applies fixed values and propagates every linear constraint.
    /// Returns `false` if the model is infeasible at the root.
    pub(crate) fn init_root(&mut self) -> bool {
        for (v, fixed) in self.model.fixed.iter().enumerate() {
            if let Some(value) = fixed {
                self.assign[v] = Some(*value);
            }
        }
        for ci in 0..self.model.linears.len() {
            self.enqueue(ci);
        }
        self.propagate() && self.bounds_consistent()
    }

    /// Evaluates the model's hint, offering it as the first incumbent.
    pub(crate) fn try_hint(&self) -> bool {
        let Some(hint) = &self.model.hint else {
            return false;
        };
        let consistent = hint
            .iter()
            .zip(&self.assign)
            .all(|(h, a)| a.is_none_or(|a| a == *h));
        if !consistent {
            tracing::debug!("hint conflicts with fixed values");
            return false;
        }
        match self.model.evaluate(hint, i64::MAX) {
            Some((ints, objective)) => {
                let stops = !self.model.has_objective() || self.shared.stop_after_first;
                self.shared.offer(
                    Incumbent {
                        bools: hint.clone(),
                        ints,
                        objective,
                    },
                    stops,
                );
                true
            }
            None => {
                tracing::debug!("hint violates the model");
                false
            }
        }
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        self.assign.clone()
    }

    /// Expands the current node breadth-first until at least `target`
    /// consistent subtrees exist or no decision is left.
    pub(crate) fn frontier(&mut self, target: usize) -> Vec<Snapshot> {
        let mut frontier = vec![self.snapshot()];
        loop {
            if frontier.len() >= target {
                return frontier;
            }
            let mut next = Vec::with_capacity(frontier.len() * 2);
            let mut expanded = false;
            for snapshot in frontier {
                self.assign = snapshot;
                self.trail.clear();
                let Some(var) = self.next_unassigned() else {
                    next.push(self.snapshot());
                    continue;
                };
                expanded = true;
                for value in [true, false] {
                    let mark = self.trail.len();
                    if self.decide(var, value) && self.bounds_consistent() {
                        next.push(self.snapshot());
                    }
                    self.undo(mark);
                }
            }
            frontier = next;
            if !expanded {
                return frontier;
            }
        }
    }

    /// Explores the subtree below the current node.
    pub(crate) fn run(mut self) {
        self.dfs();
        self.shared.nodes.fetch_add(self.nodes, Ordering::Relaxed);
    }

    fn dfs(&mut self) {
        if self.should_stop() {
            return;
        }
        self.nodes += 1;
        if !self.bounds_consistent() {
            return;
        }
        let Some(var) = self.next_unassigned() else {
            self.leaf();
            return;
        };
        for value in [true, false] {
            let mark = self.trail.len();
            if self.decide(var, value) {
                self.dfs();
            }
            self.undo(mark);
            if self.shared.stop.load(Ordering::Relaxed) {
                return;
            }
        }
    }

    fn should_stop(&self) -> bool {
        let shared = self.shared;
        if shared.stop.load(Ordering::Relaxed) {
            return true;
        }
        if let Some(cancel) = &shared.cancel {
            if cancel.load(Ordering::Relaxed) {
                shared.interrupt(CANCELLED);
                return true;
            }
        }
        if self.nodes % CLOCK_INTERVAL == 0 {
            if let Some(deadline) = shared.deadline {
                if Instant::now() >= deadline {
                    shared.interrupt(TIMED_OUT);
                    return true;
                }
            }
        }
        false
    }

    fn leaf(&mut self) {
        let values: Vec<bool> = self.assign.iter().map(|a| a.unwrap_or(false)).collect();
        let cap = self.objective_cap();
        if let Some((ints, objective)) = self.model.evaluate(&values, cap) {
            let stops = !self.model.has_objective() || self.shared.stop_after_first;
            self.shared.offer(
                Incumbent {
                    bools: values,
                    ints,
                    objective,
                },
                stops,
            );
        }
    }

    /// Largest objective value still worth finding.
    fn objective_cap(&self) -> i64 {
        self.shared.bound.load(Ordering::Relaxed).saturating_sub(1)
    }

    fn next_unassigned(&self) -> Option<usize> {
        self.assign.iter().position(Option::is_none)
    }

    fn set(&mut self, var: usize, value: bool) {
        let model = self.model;
        self.assign[var] = Some(value);
        self.trail.push(var);
        for &ci in &model.watches[var] {
            self.enqueue(ci);
        }
    }

    fn enqueue(&mut self, ci: usize) {
        if !self.in_queue[ci] {
            self.in_queue[ci] = true;
            self.queue.push(ci);
        }
    }

    fn decide(&mut self, var: usize, value: bool) -> bool {
        self.set(var, value);
        self.propagate()
    }

    fn undo(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some(var) = self.trail.pop() {
                self.assign[var] = None;
            }
        }
    }

    /// Bound propagation on linear constraints until fixpoint.
    fn propagate(&mut self) -> bool {
        let model = self.model;
        while let Some(ci) = self.queue.pop() {
            self.in_queue[ci] = false;
            let c = &model.linears[ci];
            let (mut lo, mut hi) = (0i64, 0i64);
            for &(v, coef) in &c.terms {
                match self.assign[v] {
                    Some(true) => {
                        lo += coef;
                        hi += coef;
                    }
                    Some(false) => {}
                    None if coef < 0 => lo += coef,
                    None => hi += coef,
                }
            }
            let upper = matches!(c.relation, Relation::Eq | Relation::Le).then_some(c.rhs);
            let lower = matches!(c.relation, Relation::Eq | Relation::Ge).then_some(c.rhs);
            if upper.is_some_and(|u| lo > u) || lower.is_some_and(|l| hi < l) {
                self.clear_queue();
                return false;
            }

            let mut forced = Vec::new();
            for &(v, coef) in &c.terms {
                if self.assign[v].is_some() || coef == 0 {
                    continue;
                }
                let by_upper = upper.and_then(|u| {
                    if coef > 0 && lo + coef > u {
                        Some(false)
                    } else if coef < 0 && lo - coef > u {
                        Some(true)
                    } else {
                        None
                    }
                });
                let by_lower = lower.and_then(|l| {
                    if coef > 0 && hi - coef < l {
                        Some(true)
                    } else if coef < 0 && hi + coef < l {
                        Some(false)
                    } else {
                        None
                    }
                });
                match (by_upper, by_lower) {
                    (Some(a), Some(b)) if a != b => {
                        self.clear_queue();
                        return false;
                    }
                    (Some(value), _) | (None, Some(value)) => forced.push((v, value)),
                    (None, None) => {}
                }
            }
            for (v, value) in forced {
                self.set(v, value);
            }
        }
        true
    }

    fn clear_queue(&mut self) {
        for ci in self.queue.drain(..) {
            self.in_queue[ci] = false;
        }
    }

    /// Interval reasoning on quotients and differences.
    ///
    /// Free variables take their domain, capped by the incumbent bound for
    /// the objective.
    fn bounds_consistent(&mut self) -> bool {
        let model = self.model;
        self.bounds.copy_from_slice(&model.domains);
        if let Some(obj) = model.objective {
            let cap = self.objective_cap();
            let (min, max) = self.bounds[obj];
            if cap < min {
                return false;
            }
            self.bounds[obj] = (min, max.min(cap));
        }

        for q in &model.quotients {
            let (mut sum, mut taken, mut open) = (0i64, 0i64, 0i64);
            let (mut neg, mut pos) = (0i64, 0i64);
            for &(v, coef) in &q.terms {
                match self.assign[v] {
                    Some(true) => {
                        sum += coef;
                        taken += 1;
                    }
                    Some(false) => {}
                    None => {
                        open += 1;
                        if coef < 0 {
                            neg += coef;
                        } else {
                            pos += coef;
                        }
                    }
                }
            }
            let (low_sum, high_sum) = match q.cardinality {
                Some(k) => {
                    let need = k - taken;
                    if need < 0 || need > open {
                        return false;
                    }
                    let smallest = q
                        .terms
                        .iter()
                        .filter(|&&(v, _)| self.assign[v].is_none())
                        .take(need as usize)
                        .map(|&(_, coef)| coef)
                        .sum::<i64>();
                    let largest = q
                        .terms
                        .iter()
                        .rev()
                        .filter(|&&(v, _)| self.assign[v].is_none())
                        .take(need as usize)
                        .map(|&(_, coef)| coef)
                        .sum::<i64>();
                    (sum + smallest, sum + largest)
                }
                None => (sum + neg, sum + pos),
            };
            let (min, max) = self.bounds[q.target];
            let low = low_sum.div_euclid(q.divisor).max(min);
            let high = high_sum.div_euclid(q.divisor).min(max);
            if low > high {
                return false;
            }
            self.bounds[q.target] = (low, high);
        }

        for d in &model.diffs {
            let (la, ha) = self.bounds[d.left];
            let (lb, hb) = self.bounds[d.right];
            let least = 0.max(la - hb).max(lb - ha);
            let limit = match d.limit {
                CLimit::Constant(c) => c,
                CLimit::Var(v) => self.bounds[v].1,
            };
            if least > limit {
                return false;
            }
        }
        true
    }
}
