//! SA execution loop.

use super::config::SaConfig;
use super::problem::SaProblem;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Temperature reached `min_temperature`.
    Frozen,
    /// Best energy reached the problem's target.
    Target,
    /// `stall_levels` levels passed without a new best.
    Stalled,
    /// `max_moves` moves were proposed.
    MoveBudget,
    /// The starting state has no neighbours.
    NoMoves,
    Cancelled,
}

/// Result of an annealing run.
#[derive(Debug, Clone)]
pub struct SaResult<S: Clone> {
    pub best: S,
    pub best_energy: i64,
    /// Proposed moves.
    pub moves: usize,
    /// Accepted moves, including sideways and improving ones.
    pub accepted: usize,
    /// Accepted moves that lowered the energy.
    pub improved: usize,
    /// Completed temperature levels.
    pub levels: usize,
    pub stop: StopReason,
}

/// Executes Simulated Annealing.
pub struct SaRunner;

impl SaRunner {
    pub fn run<P: SaProblem>(problem: &P, config: &SaConfig) -> Result<SaResult<P::State>, String> {
        Self::run_with_cancel(problem, config, None)
    }

    /// Runs with an optional cancellation token, checked once per level.
    pub fn run_with_cancel<P: SaProblem>(
        problem: &P,
        config: &SaConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<SaResult<P::State>, String> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.seed.unwrap_or_else(rand::random));
        let reached = |energy: i64| problem.target_energy().is_some_and(|t| energy <= t);

        let mut state = problem.initial_state(&mut rng);
        let mut energy = problem.energy(&state);
        let mut best = state.clone();
        let mut best_energy = energy;

        let mut temperature = config.initial_temperature;
        let (mut moves, mut accepted, mut improved, mut levels) = (0, 0, 0, 0);
        let mut stalled = 0;

        let stop = 'levels: loop {
            if reached(best_energy) {
                break StopReason::Target;
            }
            if temperature <= config.min_temperature {
                break StopReason::Frozen;
            }
            if cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                break StopReason::Cancelled;
            }

            let level_start = best_energy;
            for _ in 0..config.moves_per_temperature {
                if config.max_moves > 0 && moves >= config.max_moves {
                    break 'levels StopReason::MoveBudget;
                }
                let Some(mv) = problem.propose(&state, &mut rng) else {
                    break 'levels StopReason::NoMoves;
                };
                moves += 1;

                problem.apply(&mut state, &mv);
                let next = problem.energy(&state);
                let delta = next - energy;
                let accept =
                    delta <= 0 || rng.random::<f64>() < (-(delta as f64) / temperature).exp();
                if !accept {
                    problem.revert(&mut state, &mv);
                    continue;
                }

                accepted += 1;
                if delta < 0 {
                    improved += 1;
                }
                energy = next;
                if energy < best_energy {
                    best_energy = energy;
                    best = state.clone();
                    if reached(best_energy) {
                        break 'levels StopReason::Target;
                    }
                }
            }

            levels += 1;
            stalled = if best_energy < level_start { 0 } else { stalled + 1 };
            if config.stall_levels > 0 && stalled >= config.stall_levels {
                break StopReason::Stalled;
            }
            temperature *= config.alpha;
        };

        Ok(SaResult {
            best,
            best_energy,
            moves,
            accepted,
            improved,
            levels,
            stop,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Integer walk towards `goal`; energy is the squared distance.
    struct Walk {
        goal: i64,
        target: Option<i64>,
    }

    impl SaProblem for Walk {
        type State = i64;
        type Move = i64;

        fn initial_state<R: Rng>(&self, rng: &mut R) -> i64 {
            rng.random_range(-100..100)
        }

        fn energy(&self, x: &i64) -> i64 {
            (x - self.goal).pow(2)
        }

        fn propose<R: Rng>(&self, _x: &i64, rng: &mut R) -> Option<i64> {
            Some(if rng.random_bool(0.5) { 1 } else { -1 })
        }

        fn apply(&self, x: &mut i64, step: &i64) {
            *x += step;
        }

        fn revert(&self, x: &mut i64, step: &i64) {
            *x -= step;
        }

        fn target_energy(&self) -> Option<i64> {
            self.target
        }
    }

    /// Every state has the same energy.
    struct Flat;

    impl SaProblem for Flat {
        type State = u8;
        type Move = ();

        fn initial_state<R: Rng>(&self, _rng: &mut R) -> u8 {
            0
        }

        fn energy(&self, _state: &u8) -> i64 {
            5
        }

        fn propose<R: Rng>(&self, _state: &u8, _rng: &mut R) -> Option<()> {
            Some(())
        }

        fn apply(&self, _state: &mut u8, _mv: &()) {}

        fn revert(&self, _state: &mut u8, _mv: &()) {}
    }

    /// A single state with no neighbours.
    struct Isolated;

    impl SaProblem for Isolated {
        type State = u8;
        type Move = ();

        fn initial_state<R: Rng>(&self, _rng: &mut R) -> u8 {
            0
        }

        fn energy(&self, _state: &u8) -> i64 {
            1
        }

        fn propose<R: Rng>(&self, _state: &u8, _rng: &mut R) -> Option<()> {
            None
        }

        fn apply(&self, _state: &mut u8, _mv: &()) {}

        fn revert(&self, _state: &mut u8, _mv: &()) {}
    }

    #[test]
    fn test_walk_reaches_target() {
        let problem = Walk {
            goal: 17,
            target: Some(0),
        };
        let config = SaConfig::default().with_moves_per_temperature(500).with_seed(42);
        let result = SaRunner::run(&problem, &config).unwrap();
        assert_eq!(result.stop, StopReason::Target);
        assert_eq!(result.best, 17);
        assert_eq!(result.best_energy, 0);
        assert!(result.accepted >= result.improved);
    }

    #[test]
    fn test_move_budget() {
        let problem = Walk {
            goal: 0,
            target: None,
        };
        let config = SaConfig::default()
            .with_initial_temperature(1e6)
            .with_moves_per_temperature(10)
            .with_max_moves(50)
            .with_seed(1);
        let result = SaRunner::run(&problem, &config).unwrap();
        assert_eq!(result.stop, StopReason::MoveBudget);
        assert_eq!(result.moves, 50);
        assert_eq!(result.levels, 5);
    }

    #[test]
    fn test_freezes_without_target() {
        let problem = Walk {
            goal: 3,
            target: None,
        };
        let config = SaConfig::default().with_seed(9);
        let result = SaRunner::run(&problem, &config).unwrap();
        assert_eq!(result.stop, StopReason::Frozen);
        assert_eq!(result.levels, config.level_count());
    }

    #[test]
    fn test_stall_detection() {
        let config = SaConfig::default().with_stall_levels(3).with_seed(2);
        let result = SaRunner::run(&Flat, &config).unwrap();
        assert_eq!(result.stop, StopReason::Stalled);
        assert_eq!(result.levels, 3);
        assert_eq!(result.improved, 0);
        // Sideways moves are always accepted.
        assert_eq!(result.accepted, result.moves);
    }

    #[test]
    fn test_no_moves() {
        let result = SaRunner::run(&Isolated, &SaConfig::default()).unwrap();
        assert_eq!(result.stop, StopReason::NoMoves);
        assert_eq!(result.moves, 0);
        assert_eq!(result.best_energy, 1);
    }

    #[test]
    fn test_cancelled() {
        let problem = Walk {
            goal: 0,
            target: None,
        };
        let cancel = Arc::new(AtomicBool::new(true));
        let result =
            SaRunner::run_with_cancel(&problem, &SaConfig::default(), Some(cancel)).unwrap();
        assert_eq!(result.stop, StopReason::Cancelled);
        assert_eq!(result.moves, 0);
    }

    #[test]
    fn test_same_seed_same_run() {
        let problem = Walk {
            goal: 40,
            target: None,
        };
        let config = SaConfig::default().with_max_moves(300).with_seed(11);
        let a = SaRunner::run(&problem, &config).unwrap();
        let b = SaRunner::run(&problem, &config).unwrap();
        assert_eq!((a.best, a.moves, a.accepted), (b.best, b.moves, b.accepted));
    }

    #[test]
    fn test_invalid_config() {
        let config = SaConfig::default().with_alpha(2.0);
        assert!(SaRunner::run(&Flat, &config).is_err());
    }
}
