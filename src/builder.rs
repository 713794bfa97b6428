//! Translates a roster and team configuration into a [`CpModel`].
//!
//! Variables `team_{i}_member_{j}` state that individual `j` belongs to
//! team `i`. The model holds:
//!
//! 1. partition: each individual is in exactly one team;
//! 2. capacity: each team has exactly `team_size` members;
//! 3. category floors: each team has at least the configured minimum of
//!    every tracked category;
//! 4. `avg_team_{i} = floor(skill sum / team_size)`;
//! 5. the gap between *adjacent* teams (`i`, `i + 1`): bounded by a free
//!    `max_gap` variable that is minimized, or by a constant threshold.
//!
//! Only adjacent pairs in team index order are constrained. Teams that are
//! not neighbours may differ by more than the reported gap; see
//! [`TeamAssignment::max_pairwise_gap`](crate::extract::TeamAssignment::max_pairwise_gap).

use crate::cp::{BoolVar, Constraint, CpModel, IntVar, Limit, Objective, Relation};
use crate::error::TeamError;
use crate::roster::{Roster, TeamConfig};

/// How the skill-gap objective is posed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMode {
    /// Find the minimum achievable adjacent gap.
    Optimize,
    /// Accept any assignment whose adjacent gaps are all within the threshold.
    Satisfy { max_skill_gap: i64 },
}

impl SolveMode {
    /// `Satisfy` when the configuration carries a threshold, else `Optimize`.
    pub fn from_config(config: &TeamConfig) -> Self {
        match config.max_skill_gap {
            Some(max_skill_gap) => SolveMode::Satisfy { max_skill_gap },
            None => SolveMode::Optimize,
        }
    }
}

/// Variable names of a team model.
#[derive(Debug, Clone)]
pub struct TeamVariables {
    /// `assignment[i][j]`: team `i`, individual `j`.
    assignment: Vec<Vec<String>>,
    averages: Vec<String>,
    objective: Option<String>,
    team_size: usize,
}

impl TeamVariables {
    fn new(n_teams: usize, n_individuals: usize, team_size: usize) -> Self {
        let assignment = (0..n_teams)
            .map(|i| {
                (0..n_individuals)
                    .map(|j| format!("team_{i}_member_{j}"))
                    .collect()
            })
            .collect();
        let averages = (0..n_teams).map(|i| format!("avg_team_{i}")).collect();
        Self {
            assignment,
            averages,
            objective: None,
            team_size,
        }
    }

    pub fn team_count(&self) -> usize {
        self.assignment.len()
    }

    pub fn individual_count(&self) -> usize {
        self.assignment.first().map_or(0, Vec::len)
    }

    pub fn team_size(&self) -> usize {
        self.team_size
    }

    /// Name of the variable "individual `j` is in team `i`".
    pub fn assignment(&self, team: usize, individual: usize) -> &str {
        &self.assignment[team][individual]
    }

    /// Name of team `i`'s average variable.
    pub fn average(&self, team: usize) -> &str {
        &self.averages[team]
    }

    /// Name of the minimized gap variable (optimization mode only).
    pub fn objective(&self) -> Option<&str> {
        self.objective.as_deref()
    }

    /// Adds hints placing individual `j` in team `team_of[j]`.
    pub fn apply_hint(&self, model: &mut CpModel, team_of: &[usize]) {
        for (j, &team) in team_of.iter().enumerate() {
            for (i, row) in self.assignment.iter().enumerate() {
                model.add_hint(row[j].clone(), i == team);
            }
        }
    }
}

/// A built model and the names needed to read its solutions.
#[derive(Debug, Clone)]
pub struct TeamModel {
    pub model: CpModel,
    pub variables: TeamVariables,
}

/// Builds team-assignment models.
///
/// # Examples
///
/// ```
/// use u_teambalance::builder::{SolveMode, TeamModelBuilder};
/// use u_teambalance::roster::{Roster, TeamConfig};
///
/// let roster = Roster::from_entries([("A", "F", 80), ("B", "M", 60), ("C", "F", 90), ("D", "M", 70)]);
/// let config = TeamConfig::new(2).with_minimum("F", 1).with_minimum("M", 1);
/// let built = TeamModelBuilder::new(&roster, &config).build(SolveMode::Optimize).unwrap();
/// assert_eq!(built.model.bool_var_count(), 8);
/// assert_eq!(built.variables.objective(), Some("max_gap"));
/// ```
pub struct TeamModelBuilder<'a> {
    roster: &'a Roster,
    config: &'a TeamConfig,
}

impl<'a> TeamModelBuilder<'a> {
    pub fn new(roster: &'a Roster, config: &'a TeamConfig) -> Self {
        Self { roster, config }
    }

    /// Checks everything that can be decided without search.
    ///
    /// Returns the number of teams.
    pub fn check(&self, mode: SolveMode) -> Result<usize, TeamError> {
        let n_teams = self.config.team_count(self.roster)?;
        let required = self.config.minimum_total();
        if required > self.config.team_size {
            return Err(TeamError::InfeasibleConfiguration {
                required,
                team_size: self.config.team_size,
            });
        }
        if let SolveMode::Satisfy { max_skill_gap } = mode {
            if max_skill_gap < 0 {
                return Err(TeamError::Configuration(format!(
                    "max_skill_gap must be non-negative, got {max_skill_gap}"
                )));
            }
        }
        Ok(n_teams)
    }

    pub fn build(&self, mode: SolveMode) -> Result<TeamModel, TeamError> {
        let n_teams = self.check(mode)?;
        let individuals = self.roster.individuals();
        let n = individuals.len();
        let team_size = self.config.team_size;
        let mut variables = TeamVariables::new(n_teams, n, team_size);
        let mut model = CpModel::new("team-balance");

        // Strongest first: early dives spread high skills across teams.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&j| std::cmp::Reverse(individuals[j].skill));
        for &j in &order {
            for i in 0..n_teams {
                model.add_bool_var(BoolVar::new(variables.assignment(i, j)));
            }
        }

        for j in 0..n {
            let terms = (0..n_teams)
                .map(|i| (variables.assignment(i, j).to_string(), 1))
                .collect();
            model.add_linear(terms, Relation::Eq, 1);
        }

        for i in 0..n_teams {
            let terms = (0..n)
                .map(|j| (variables.assignment(i, j).to_string(), 1))
                .collect();
            model.add_linear(terms, Relation::Eq, team_size as i64);
        }

        for (category, &minimum) in &self.config.min_per_gender {
            if minimum == 0 {
                continue;
            }
            let members: Vec<usize> = (0..n)
                .filter(|&j| individuals[j].gender == *category)
                .collect();
            for i in 0..n_teams {
                let terms = members
                    .iter()
                    .map(|&j| (variables.assignment(i, j).to_string(), 1))
                    .collect();
                model.add_linear(terms, Relation::Ge, minimum as i64);
            }
        }

        let min_skill = individuals.iter().map(|p| p.skill).min().unwrap_or(0);
        let max_skill = individuals.iter().map(|p| p.skill).max().unwrap_or(0);
        for i in 0..n_teams {
            model.add_int_var(IntVar::new(variables.average(i), min_skill, max_skill));
            model.add_constraint(Constraint::Quotient {
                target: variables.average(i).to_string(),
                terms: (0..n)
                    .map(|j| (variables.assignment(i, j).to_string(), individuals[j].skill))
                    .collect(),
                divisor: team_size as i64,
                cardinality: Some(team_size as i64),
            });
        }

        let limit = match mode {
            SolveMode::Optimize => {
                let name = "max_gap".to_string();
                model.add_int_var(IntVar::new(name.clone(), 0, max_skill - min_skill));
                model.set_objective(Objective::Minimize { var: name.clone() });
                variables.objective = Some(name.clone());
                Limit::Var(name)
            }
            SolveMode::Satisfy { max_skill_gap } => Limit::Constant(max_skill_gap),
        };
        for i in 1..n_teams {
            model.add_abs_diff_at_most(
                variables.average(i - 1).to_string(),
                variables.average(i).to_string(),
                limit.clone(),
            );
        }

        tracing::debug!(
            teams = n_teams,
            individuals = n,
            bools = model.bool_var_count(),
            constraints = model.constraint_count(),
            ?mode,
            "built team model"
        );
        Ok(TeamModel { model, variables })
    }
}
