//! Problem interface for the annealer.

use rand::Rng;

/// A state space explored through reversible moves.
///
/// Energies are integers and are minimized. Moves are applied in place and
/// rolled back with [`revert`](SaProblem::revert) when rejected, so states
/// are only cloned when a new best is recorded.
pub trait SaProblem {
    type State: Clone;
    type Move;

    /// A random starting state.
    fn initial_state<R: Rng>(&self, rng: &mut R) -> Self::State;

    fn energy(&self, state: &Self::State) -> i64;

    /// A random move from `state`, or `None` when `state` has no neighbours.
    fn propose<R: Rng>(&self, state: &Self::State, rng: &mut R) -> Option<Self::Move>;

    fn apply(&self, state: &mut Self::State, mv: &Self::Move);

    /// Undoes `apply(state, mv)`.
    fn revert(&self, state: &mut Self::State, mv: &Self::Move);

    /// Energy at or below which the search stops early.
    fn target_energy(&self) -> Option<i64> {
        None
    }
}
