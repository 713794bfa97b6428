//! Error taxonomy for team planning.
//!
//! Unsatisfiability is not an error: it is reported as
//! [`PlanOutcome::Unsatisfiable`](crate::planner::PlanOutcome::Unsatisfiable).

use thiserror::Error;

/// Errors raised while loading, modeling, or extracting a team plan.
#[derive(Debug, Error)]
pub enum TeamError {
    /// Roster size is not a positive multiple of the team size, or a
    /// parameter is out of range. Detected before any search.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The roster document could not be parsed.
    #[error("malformed roster document: {0}")]
    Document(#[from] serde_json::Error),

    /// Per-team category minimums cannot fit inside a single team.
    #[error(
        "infeasible configuration: category minimums require {required} members per team, \
         but team size is {team_size}"
    )]
    InfeasibleConfiguration { required: usize, team_size: usize },

    /// The solver returned a model that is not a valid partition.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// The constraint model handed to the solver was rejected.
    #[error("invalid constraint model: {0}")]
    InvalidModel(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TeamError {
    /// Whether this error belongs to the configuration class (bad roster,
    /// bad parameters, or an unreadable document).
    pub fn is_configuration(&self) -> bool {
        matches!(self, TeamError::Configuration(_) | TeamError::Document(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_class() {
        assert!(TeamError::Configuration("x".into()).is_configuration());
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(TeamError::from(parse).is_configuration());
        assert!(!TeamError::Extraction("x".into()).is_configuration());
    }

    #[test]
    fn test_infeasible_message() {
        let err = TeamError::InfeasibleConfiguration {
            required: 3,
            team_size: 2,
        };
        let text = err.to_string();
        assert!(text.contains("require 3"));
        assert!(text.contains("team size is 2"));
    }
}
