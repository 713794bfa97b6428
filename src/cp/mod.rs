//! Constraint Programming (CP) framework.
//!
//! A small, domain-agnostic modeling layer for problems whose decisions are
//! boolean and whose objective is an integer derived from them, plus an
//! exact solver for it.
//!
//! # Key Components
//!
//! - [`BoolVar`] decisions and derived or free [`IntVar`]s
//! - [`Constraint`]: pseudo-boolean linear, floor quotient, bounded
//!   absolute difference
//! - [`CpModel`] holds variables, constraints, the objective and hints
//! - [`CpSolver`] is the solver interface
//!
//! # Design
//!
//! Consumers build a [`CpModel`] and hand it to any [`CpSolver`]. The bundled
//! [`BranchAndBoundSolver`] is complete: it reports
//! [`SolverStatus::Infeasible`] only after exhausting the search tree, and
//! [`SolverStatus::Optimal`] only after proving no better objective exists.
//!
//! # References
//!
//! Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

mod model;
mod search;
mod solver;
mod variables;

pub use model::{Constraint, CpModel, Limit, Objective, Relation};
pub use solver::{BranchAndBoundSolver, CpSolution, CpSolver, SolverConfig, SolverStatus};
pub use variables::{BoolVar, IntVar};
