//! Annealing warm start for the exact solver.
//!
//! Searches team-per-individual vectors with capacity-preserving swaps.
//! Energy is the category-floor shortfall (heavily weighted) plus the
//! adjacent-gap term of the mode. A shortfall-free result becomes a model
//! hint; the solver re-checks it before use.

use crate::builder::SolveMode;
use crate::roster::{Roster, TeamConfig};
use crate::sa::{SaConfig, SaProblem, SaRunner};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Team assignment problem as seen by the annealer.
///
/// States are `team_of` vectors; moves swap two individuals of different
/// teams.
pub struct TeamAnnealing<'a> {
    roster: &'a Roster,
    /// (category member flags, minimum) per tracked category.
    floors: Vec<(Vec<bool>, usize)>,
    n_teams: usize,
    team_size: usize,
    mode: SolveMode,
    penalty: i64,
}

impl<'a> TeamAnnealing<'a> {
    /// `n_teams * team_size` must equal the roster size.
    pub fn new(roster: &'a Roster, config: &TeamConfig, n_teams: usize, mode: SolveMode) -> Self {
        let floors = config
            .min_per_gender
            .iter()
            .filter(|&(_, &minimum)| minimum > 0)
            .map(|(category, &minimum)| {
                let flags = roster
                    .individuals()
                    .iter()
                    .map(|p| p.gender == *category)
                    .collect();
                (flags, minimum)
            })
            .collect();
        let skills = roster.individuals().iter().map(|p| p.skill);
        let spread = skills.clone().max().unwrap_or(0) - skills.min().unwrap_or(0);
        Self {
            roster,
            floors,
            n_teams,
            team_size: config.team_size,
            mode,
            // One missing member outweighs any gap term.
            penalty: (spread + 1) * n_teams as i64,
        }
    }

    /// Total members missing from category floors.
    pub fn shortfall(&self, team_of: &[usize]) -> usize {
        self.floors
            .iter()
            .map(|(flags, minimum)| {
                let mut counts = vec![0usize; self.n_teams];
                for (j, &team) in team_of.iter().enumerate() {
                    if flags[j] {
                        counts[team] += 1;
                    }
                }
                counts.iter().map(|&c| minimum.saturating_sub(c)).sum::<usize>()
            })
            .sum()
    }

    /// Truncated team averages.
    pub fn averages(&self, team_of: &[usize]) -> Vec<i64> {
        let mut sums = vec![0i64; self.n_teams];
        for (j, &team) in team_of.iter().enumerate() {
            sums[team] += self.roster.individuals()[j].skill;
        }
        sums.into_iter()
            .map(|s| s.div_euclid(self.team_size as i64))
            .collect()
    }

    /// Largest adjacent gap, or total threshold excess when satisfying.
    fn gap_term(&self, team_of: &[usize]) -> i64 {
        let averages = self.averages(team_of);
        let gaps = averages.windows(2).map(|w| (w[0] - w[1]).abs());
        match self.mode {
            SolveMode::Optimize => gaps.max().unwrap_or(0),
            SolveMode::Satisfy { max_skill_gap } => {
                gaps.map(|g| (g - max_skill_gap).max(0)).sum()
            }
        }
    }

    fn acceptable(&self, team_of: &[usize]) -> bool {
        self.shortfall(team_of) == 0
            && match self.mode {
                SolveMode::Optimize => true,
                SolveMode::Satisfy { .. } => self.gap_term(team_of) == 0,
            }
    }
}

impl SaProblem for TeamAnnealing<'_> {
    type State = Vec<usize>;
    type Move = (usize, usize);

    fn initial_state<R: Rng>(&self, rng: &mut R) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.roster.count()).collect();
        order.shuffle(rng);
        let mut team_of = vec![0; order.len()];
        for (slot, &j) in order.iter().enumerate() {
            team_of[j] = slot / self.team_size;
        }
        team_of
    }

    fn energy(&self, team_of: &Vec<usize>) -> i64 {
        self.shortfall(team_of) as i64 * self.penalty + self.gap_term(team_of)
    }

    fn propose<R: Rng>(&self, team_of: &Vec<usize>, rng: &mut R) -> Option<(usize, usize)> {
        if self.n_teams < 2 {
            return None;
        }
        let a = rng.random_range(0..team_of.len());
        loop {
            let b = rng.random_range(0..team_of.len());
            if team_of[a] != team_of[b] {
                return Some((a, b));
            }
        }
    }

    fn apply(&self, team_of: &mut Vec<usize>, &(a, b): &(usize, usize)) {
        team_of.swap(a, b);
    }

    fn revert(&self, team_of: &mut Vec<usize>, &(a, b): &(usize, usize)) {
        team_of.swap(a, b);
    }

    fn target_energy(&self) -> Option<i64> {
        Some(0)
    }
}

/// Runs the annealer and returns a floor-respecting assignment, if found.
///
/// In satisfaction mode the assignment must also meet the threshold.
pub fn warm_start(
    roster: &Roster,
    config: &TeamConfig,
    n_teams: usize,
    mode: SolveMode,
    seed: Option<u64>,
    cancel: Option<Arc<AtomicBool>>,
) -> Option<Vec<usize>> {
    let problem = TeamAnnealing::new(roster, config, n_teams, mode);
    let mut sa = SaConfig::default()
        .with_initial_temperature((problem.penalty as f64).max(2.0))
        .with_min_temperature(0.05)
        .with_alpha(0.93)
        .with_moves_per_temperature((roster.count() * n_teams).max(20))
        .with_stall_levels(40)
        .with_max_moves(200_000);
    if let Some(seed) = seed {
        sa = sa.with_seed(seed);
    }

    let result = match SaRunner::run_with_cancel(&problem, &sa, cancel) {
        Ok(result) => result,
        Err(reason) => {
            tracing::warn!(%reason, "warm start skipped");
            return None;
        }
    };
    let acceptable = problem.acceptable(&result.best);
    tracing::debug!(
        energy = result.best_energy,
        moves = result.moves,
        levels = result.levels,
        max_levels = sa.level_count(),
        stop = ?result.stop,
        acceptable,
        "warm start finished"
    );
    acceptable.then_some(result.best)
}
