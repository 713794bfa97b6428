//! End-to-end team planning: build, warm start, solve, extract.

use crate::builder::{SolveMode, TeamModel, TeamModelBuilder};
use crate::cp::{BranchAndBoundSolver, CpSolver, SolverConfig, SolverStatus};
use crate::error::TeamError;
use crate::extract::{extract, TeamAssignment};
use crate::roster::{Roster, TeamConfig};
use crate::warmstart::warm_start;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Options for a planning call.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Solver time limit in milliseconds; `<= 0` disables it.
    pub time_limit_ms: i64,

    /// Parallel search workers (only used with the `parallel` feature).
    pub num_workers: usize,

    /// Seed the solver with an annealing hint.
    pub warm_start: bool,

    /// Annealing seed. `None` draws one at random.
    pub seed: Option<u64>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            time_limit_ms: 60_000,
            num_workers: 1,
            warm_start: true,
            seed: None,
        }
    }
}

impl SolveOptions {
    pub fn with_time_limit_ms(mut self, ms: i64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    pub fn with_num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn with_warm_start(mut self, enabled: bool) -> Self {
        self.warm_start = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the options.
    pub fn validate(&self) -> Result<(), String> {
        if self.num_workers == 0 {
            return Err("num_workers must be at least 1".into());
        }
        Ok(())
    }

    fn solver_config(&self, mode: SolveMode) -> SolverConfig {
        SolverConfig::default()
            .with_time_limit_ms(self.time_limit_ms)
            .with_num_workers(self.num_workers)
            .with_stop_after_first(matches!(mode, SolveMode::Satisfy { .. }))
    }
}

/// Result of a planning call that reached the solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    /// A valid assignment. In optimization mode `proven_optimal` tells
    /// whether the search finished.
    Solved(TeamAssignment),
    /// No assignment satisfies the constraints.
    Unsatisfiable,
    /// Time limit or cancellation hit before any assignment was found.
    Interrupted,
}

impl PlanOutcome {
    pub fn assignment(&self) -> Option<&TeamAssignment> {
        match self {
            PlanOutcome::Solved(assignment) => Some(assignment),
            _ => None,
        }
    }
}

/// Splits rosters into balanced teams.
///
/// # Examples
///
/// ```
/// use u_teambalance::builder::SolveMode;
/// use u_teambalance::planner::{PlanOutcome, SolveOptions, TeamPlanner};
/// use u_teambalance::roster::{Roster, TeamConfig};
///
/// let roster = Roster::from_entries([("A", "F", 80), ("B", "M", 60), ("C", "F", 90), ("D", "M", 70)]);
/// let config = TeamConfig::new(2).with_minimum("F", 1).with_minimum("M", 1);
///
/// let planner = TeamPlanner::new(SolveOptions::default().with_seed(1));
/// let outcome = planner.plan(&roster, &config, SolveMode::Optimize).unwrap();
/// let PlanOutcome::Solved(assignment) = outcome else { panic!("expected teams") };
/// assert_eq!(assignment.gap, Some(0));
/// ```
pub struct TeamPlanner<S: CpSolver = BranchAndBoundSolver> {
    solver: S,
    options: SolveOptions,
}

impl TeamPlanner {
    pub fn new(options: SolveOptions) -> Self {
        Self::with_solver(BranchAndBoundSolver::new(), options)
    }
}

impl<S: CpSolver> TeamPlanner<S> {
    pub fn with_solver(solver: S, options: SolveOptions) -> Self {
        Self { solver, options }
    }

    pub fn options(&self) -> &SolveOptions {
        &self.options
    }

    pub fn plan(
        &self,
        roster: &Roster,
        config: &TeamConfig,
        mode: SolveMode,
    ) -> Result<PlanOutcome, TeamError> {
        self.plan_with_cancel(roster, config, mode, None)
    }

    /// Plans with an optional cancellation token shared by the warm start
    /// and the solver.
    pub fn plan_with_cancel(
        &self,
        roster: &Roster,
        config: &TeamConfig,
        mode: SolveMode,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<PlanOutcome, TeamError> {
        self.options.validate().map_err(TeamError::Configuration)?;

        let TeamModel {
            mut model,
            variables,
        } = TeamModelBuilder::new(roster, config).build(mode)?;

        if self.options.warm_start {
            let hint = warm_start(
                roster,
                config,
                variables.team_count(),
                mode,
                self.options.seed,
                cancel.clone(),
            );
            if let Some(team_of) = hint {
                variables.apply_hint(&mut model, &team_of);
            }
        }

        let solution = self
            .solver
            .solve_with_cancel(&model, &self.options.solver_config(mode), cancel);

        let outcome = match solution.status {
            SolverStatus::Optimal | SolverStatus::Feasible => {
                PlanOutcome::Solved(extract(roster, &variables, &solution)?)
            }
            SolverStatus::Infeasible => PlanOutcome::Unsatisfiable,
            SolverStatus::Timeout | SolverStatus::Cancelled => PlanOutcome::Interrupted,
            SolverStatus::ModelInvalid => {
                let reason = model
                    .validate()
                    .err()
                    .unwrap_or_else(|| "solver rejected the model".into());
                return Err(TeamError::InvalidModel(reason));
            }
        };

        tracing::info!(
            teams = variables.team_count(),
            status = ?solution.status,
            gap = ?outcome.assignment().and_then(|a| a.gap),
            "planning finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn four() -> Roster {
        Roster::from_entries([("A", "F", 80), ("B", "M", 60), ("C", "F", 90), ("D", "M", 70)])
    }

    fn balanced() -> TeamConfig {
        TeamConfig::new(2).with_minimum("F", 1).with_minimum("M", 1)
    }

    fn planner() -> TeamPlanner {
        TeamPlanner::new(SolveOptions::default().with_seed(42))
    }

    fn solved(outcome: PlanOutcome) -> TeamAssignment {
        match outcome {
            PlanOutcome::Solved(assignment) => assignment,
            other => panic!("expected an assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_four_people_balanced() {
        let assignment = solved(planner().plan(&four(), &balanced(), SolveMode::Optimize).unwrap());
        assert_eq!(assignment.gap, Some(0));
        assert!(assignment.proven_optimal);

        let mut groups: Vec<Vec<String>> = assignment.teams.iter().map(|t| t.names.clone()).collect();
        groups.sort();
        assert_eq!(groups, vec![vec!["A", "D"], vec!["B", "C"]]);
    }

    #[test]
    fn test_roster_not_multiple_of_team_size() {
        let roster = Roster::from_entries([
            ("A", "F", 1),
            ("B", "M", 2),
            ("C", "F", 3),
            ("D", "M", 4),
            ("E", "F", 5),
        ]);
        let err = planner()
            .plan(&roster, &TeamConfig::new(2), SolveMode::Optimize)
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_minimums_exceed_team_size() {
        let config = TeamConfig::new(2).with_minimum("F", 2).with_minimum("M", 1);
        let err = planner().plan(&four(), &config, SolveMode::Optimize).unwrap_err();
        assert!(matches!(err, TeamError::InfeasibleConfiguration { .. }));
    }

    #[test]
    fn test_category_supply_shortage_is_unsatisfiable() {
        // Two teams each need two women, but only two exist.
        let config = TeamConfig::new(2).with_minimum("F", 2);
        let outcome = planner().plan(&four(), &config, SolveMode::Optimize).unwrap();
        assert_eq!(outcome, PlanOutcome::Unsatisfiable);
    }

    #[test]
    fn test_replanning_gives_same_gap() {
        let roster = Roster::from_entries([
            ("A", "F", 95),
            ("B", "F", 40),
            ("C", "F", 72),
            ("D", "M", 66),
            ("E", "M", 81),
            ("F", "M", 23),
        ]);
        let config = TeamConfig::new(2).with_minimum("F", 1);
        let first = solved(planner().plan(&roster, &config, SolveMode::Optimize).unwrap());
        let second = solved(planner().plan(&roster, &config, SolveMode::Optimize).unwrap());
        assert_eq!(first.gap, second.gap);
    }

    #[test]
    fn test_satisfy_within_threshold() {
        let mode = SolveMode::Satisfy { max_skill_gap: 0 };
        let assignment = solved(planner().plan(&four(), &balanced(), mode).unwrap());
        assert_eq!(assignment.gap, None);
        assert!(!assignment.proven_optimal);
        assert!(assignment.adjacent_gaps().iter().all(|&g| g <= 0));
    }

    #[test]
    fn test_satisfy_impossible_threshold() {
        let roster = Roster::from_entries([("A", "F", 0), ("B", "F", 0), ("C", "M", 0), ("D", "M", 3)]);
        let mode = SolveMode::Satisfy { max_skill_gap: 0 };
        let outcome = planner().plan(&roster, &TeamConfig::new(2), mode).unwrap();
        assert_eq!(outcome, PlanOutcome::Unsatisfiable);
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mode = SolveMode::Satisfy { max_skill_gap: -1 };
        let err = planner().plan(&four(), &balanced(), mode).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_warm_start_keeps_optimum() {
        let roster = Roster::from_entries([
            ("A", "F", 91),
            ("B", "F", 47),
            ("C", "F", 63),
            ("D", "M", 88),
            ("E", "M", 52),
            ("F", "M", 70),
        ]);
        let config = TeamConfig::new(2).with_minimum("F", 1).with_minimum("M", 1);
        let warm = TeamPlanner::new(SolveOptions::default().with_seed(5));
        let cold = TeamPlanner::new(SolveOptions::default().with_warm_start(false));
        let a = solved(warm.plan(&roster, &config, SolveMode::Optimize).unwrap());
        let b = solved(cold.plan(&roster, &config, SolveMode::Optimize).unwrap());
        assert_eq!(a.gap, b.gap);
        assert!(a.proven_optimal && b.proven_optimal);
    }

    #[test]
    fn test_only_adjacent_teams_are_bounded() {
        let roster = Roster::from_entries([("A", "F", 10), ("B", "M", 20), ("C", "F", 15)]);
        let assignment =
            solved(planner().plan(&roster, &TeamConfig::new(1), SolveMode::Optimize).unwrap());
        assert_eq!(assignment.gap, Some(5));
        assert_eq!(assignment.max_pairwise_gap(), 10);
        // The middle team must hold the middle skill.
        assert_eq!(assignment.teams[1].names, vec!["C"]);
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = Arc::new(AtomicBool::new(true));
        let planner = TeamPlanner::new(SolveOptions::default().with_warm_start(false));
        let outcome = planner
            .plan_with_cancel(&four(), &balanced(), SolveMode::Optimize, Some(cancel))
            .unwrap();
        assert_eq!(outcome, PlanOutcome::Interrupted);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let planner = TeamPlanner::new(SolveOptions::default().with_num_workers(0));
        let err = planner.plan(&four(), &balanced(), SolveMode::Optimize).unwrap_err();
        assert!(err.is_configuration());
    }

    /// Smallest adjacent gap over all valid assignments, by enumeration.
    fn brute_force(skills: &[i64], females: &[bool], team_size: usize, min_f: usize) -> Option<i64> {
        let n = skills.len();
        let n_teams = n / team_size;
        let mut best: Option<i64> = None;
        let total = n_teams.pow(n as u32);
        for code in 0..total {
            let mut team_of = vec![0; n];
            let mut rest = code;
            for slot in team_of.iter_mut() {
                *slot = rest % n_teams;
                rest /= n_teams;
            }
            let mut sizes = vec![0usize; n_teams];
            let mut women = vec![0usize; n_teams];
            let mut sums = vec![0i64; n_teams];
            for j in 0..n {
                sizes[team_of[j]] += 1;
                sums[team_of[j]] += skills[j];
                if females[j] {
                    women[team_of[j]] += 1;
                }
            }
            if sizes.iter().any(|&s| s != team_size) || women.iter().any(|&w| w < min_f) {
                continue;
            }
            let averages: Vec<i64> = sums.iter().map(|s| s / team_size as i64).collect();
            let gap = averages
                .windows(2)
                .map(|w| (w[0] - w[1]).abs())
                .max()
                .unwrap_or(0);
            best = Some(best.map_or(gap, |b| b.min(gap)));
        }
        best
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_optimum_matches_enumeration(
            skills in prop::collection::vec(0i64..50, 6),
            females in prop::collection::vec(any::<bool>(), 6),
            team_size in prop::sample::select(vec![2usize, 3]),
            min_f in 0usize..=1,
            warm in any::<bool>(),
        ) {
            let entries: Vec<(String, &str, i64)> = skills
                .iter()
                .zip(&females)
                .enumerate()
                .map(|(j, (&s, &f))| (format!("P{j}"), if f { "F" } else { "M" }, s))
                .collect();
            let roster = Roster::from_entries(entries.iter().map(|(n, g, s)| (n.as_str(), *g, *s)));
            let config = TeamConfig::new(team_size).with_minimum("F", min_f);
            let planner = TeamPlanner::new(
                SolveOptions::default().with_seed(7).with_warm_start(warm),
            );

            let outcome = planner.plan(&roster, &config, SolveMode::Optimize).unwrap();
            match (brute_force(&skills, &females, team_size, min_f), outcome) {
                (Some(expected), PlanOutcome::Solved(assignment)) => {
                    prop_assert_eq!(assignment.gap, Some(expected));
                    prop_assert!(assignment.proven_optimal);
                    let mut seen = vec![false; 6];
                    for team in &assignment.teams {
                        prop_assert_eq!(team.members.len(), team_size);
                        let women = team.members.iter().filter(|&&j| females[j]).count();
                        prop_assert!(women >= min_f);
                        for &j in &team.members {
                            prop_assert!(!seen[j]);
                            seen[j] = true;
                        }
                    }
                }
                (None, PlanOutcome::Unsatisfiable) => {}
                (expected, outcome) => {
                    prop_assert!(false, "enumeration {:?}, planner {:?}", expected, outcome);
                }
            }
        }
    }
}
