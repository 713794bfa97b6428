//! Simulated Annealing (SA).
//!
//! Random local search that accepts a worsening move of size `d` with
//! probability `exp(-d / T)`, where the temperature `T` cools geometrically.
//! The warm start uses it to reach a good assignment quickly; it proves
//! nothing about optimality.
//!
//! # References
//!
//! Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"

mod config;
mod problem;
mod runner;

pub use config::SaConfig;
pub use problem::SaProblem;
pub use runner::{SaResult, SaRunner, StopReason};
