//! Skill-balanced team formation.
//!
//! Splits a roster of individuals into equally sized teams so that every
//! team meets per-category minimums and team skill averages stay close.
//!
//! - **Roster**: [`roster`] holds individuals and the team configuration;
//!   [`document`] reads them from JSON.
//! - **Model**: [`builder`] turns a roster into a constraint model over
//!   boolean assignment variables.
//! - **Solver**: [`cp`] is a domain-agnostic modeling layer with an exact
//!   branch-and-bound solver.
//! - **Warm start**: [`warmstart`] runs simulated annealing ([`sa`]) to seed
//!   the solver with a good assignment.
//! - **Results**: [`extract`] rebuilds teams from a solution; [`planner`]
//!   ties the pipeline together.
//!
//! # Example
//!
//! ```
//! use u_teambalance::builder::SolveMode;
//! use u_teambalance::planner::{PlanOutcome, SolveOptions, TeamPlanner};
//! use u_teambalance::roster::{Roster, TeamConfig};
//!
//! let roster = Roster::from_entries([
//!     ("Ada", "F", 80),
//!     ("Ben", "M", 60),
//!     ("Cy", "F", 90),
//!     ("Dan", "M", 70),
//! ]);
//! let config = TeamConfig::new(2).with_minimum("F", 1).with_minimum("M", 1);
//!
//! let outcome = TeamPlanner::new(SolveOptions::default())
//!     .plan(&roster, &config, SolveMode::Optimize)
//!     .unwrap();
//! if let PlanOutcome::Solved(assignment) = outcome {
//!     assert_eq!(assignment.max_adjacent_gap(), 0);
//! }
//! ```

pub mod builder;
pub mod cp;
pub mod document;
pub mod error;
pub mod extract;
pub mod planner;
pub mod roster;
pub mod sa;
pub mod warmstart;

pub use error::TeamError;
pub use planner::{PlanOutcome, SolveOptions, TeamPlanner};
