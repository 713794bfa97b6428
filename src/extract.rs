//! Turns a solver model back into team rosters.

use crate::builder::TeamVariables;
use crate::cp::{CpSolution, SolverStatus};
use crate::error::TeamError;
use crate::roster::Roster;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// One team of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Team {
    /// `"Team <i>"`.
    pub label: String,
    /// Roster indices, ascending.
    pub members: Vec<usize>,
    /// Member names, in the same order as `members`.
    pub names: Vec<String>,
    pub skill_sum: i64,
    /// `floor(skill_sum / team_size)`.
    pub average: i64,
}

/// A complete partition of the roster into teams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamAssignment {
    pub teams: Vec<Team>,
    /// Minimized adjacent gap (optimization mode).
    pub gap: Option<i64>,
    /// Whether `gap` is proven minimal.
    pub proven_optimal: bool,
}

impl TeamAssignment {
    /// Team index of every individual.
    pub fn team_of(&self) -> Vec<usize> {
        let n = self.teams.iter().map(|t| t.members.len()).sum();
        let mut team_of = vec![0; n];
        for (i, team) in self.teams.iter().enumerate() {
            for &j in &team.members {
                team_of[j] = i;
            }
        }
        team_of
    }

    /// `|avg_i - avg_{i+1}|` for each adjacent pair.
    pub fn adjacent_gaps(&self) -> Vec<i64> {
        self.teams
            .windows(2)
            .map(|w| (w[0].average - w[1].average).abs())
            .collect()
    }

    /// Largest adjacent gap; the quantity the optimizer minimizes.
    pub fn max_adjacent_gap(&self) -> i64 {
        self.adjacent_gaps().into_iter().max().unwrap_or(0)
    }

    /// Largest gap over all team pairs.
    ///
    /// Can exceed [`max_adjacent_gap`](Self::max_adjacent_gap) when
    /// averages are not monotonic in team order.
    pub fn max_pairwise_gap(&self) -> i64 {
        let max = self.teams.iter().map(|t| t.average).max();
        let min = self.teams.iter().map(|t| t.average).min();
        match (max, min) {
            (Some(max), Some(min)) => max - min,
            _ => 0,
        }
    }

    /// Ordered `{"Team 0": [names], ...}` view.
    pub fn table(&self) -> TeamTable<'_> {
        TeamTable(&self.teams)
    }

    /// Pretty JSON of [`table`](Self::table).
    pub fn to_json_pretty(&self) -> Result<String, TeamError> {
        serde_json::to_string_pretty(&self.table())
            .map_err(|err| TeamError::Extraction(err.to_string()))
    }
}

/// Serializes teams as a label → names map in team order.
pub struct TeamTable<'a>(&'a [Team]);

impl Serialize for TeamTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for team in self.0 {
            map.serialize_entry(&team.label, &team.names)?;
        }
        map.end()
    }
}

/// Rebuilds teams from a solved model.
///
/// Fails with [`TeamError::Extraction`] if the solution does not describe a
/// partition into full teams, or if its gap disagrees with the teams.
pub fn extract(
    roster: &Roster,
    variables: &TeamVariables,
    solution: &CpSolution,
) -> Result<TeamAssignment, TeamError> {
    if !solution.is_solution_found() {
        return Err(TeamError::Extraction(format!(
            "no model to extract (status {:?})",
            solution.status
        )));
    }

    let n_teams = variables.team_count();
    let n = roster.count();
    if variables.individual_count() != n {
        return Err(TeamError::Extraction(format!(
            "model covers {} individuals, roster has {n}",
            variables.individual_count()
        )));
    }

    let mut members = vec![Vec::new(); n_teams];
    for j in 0..n {
        let mut placed = Vec::new();
        for (i, team) in members.iter_mut().enumerate() {
            let name = variables.assignment(i, j);
            let value = solution
                .bool_value(name)
                .ok_or_else(|| TeamError::Extraction(format!("missing value for {name}")))?;
            if value {
                team.push(j);
                placed.push(i);
            }
        }
        if placed.len() != 1 {
            return Err(TeamError::Extraction(format!(
                "individual {j} is in {} teams {placed:?}",
                placed.len()
            )));
        }
    }

    let team_size = variables.team_size();
    let teams = members
        .into_iter()
        .enumerate()
        .map(|(i, members)| {
            if members.len() != team_size {
                return Err(TeamError::Extraction(format!(
                    "team {i} has {} members, expected {team_size}",
                    members.len()
                )));
            }
            let people: Vec<_> = members.iter().filter_map(|&j| roster.get(j)).collect();
            let skill_sum: i64 = people.iter().map(|p| p.skill).sum();
            Ok(Team {
                label: format!("Team {i}"),
                names: people.iter().map(|p| p.name.clone()).collect(),
                members,
                skill_sum,
                average: skill_sum.div_euclid(team_size as i64),
            })
        })
        .collect::<Result<Vec<_>, TeamError>>()?;

    let mut assignment = TeamAssignment {
        teams,
        gap: None,
        proven_optimal: solution.status == SolverStatus::Optimal,
    };

    if let Some(name) = variables.objective() {
        let gap = solution
            .int_value(name)
            .ok_or_else(|| TeamError::Extraction(format!("missing value for {name}")))?;
        let actual = assignment.max_adjacent_gap();
        if gap != actual {
            return Err(TeamError::Extraction(format!(
                "solver reported gap {gap}, teams give {actual}"
            )));
        }
        assignment.gap = Some(gap);
    }
    Ok(assignment)
}
