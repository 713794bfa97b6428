//! Roster model: individuals and team configuration.
//!
//! Both are read-only for the lifetime of a solve. An individual's identity
//! is its position in the roster.

use crate::error::TeamError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A person to be placed in a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    /// Positional index within the roster.
    pub id: usize,
    /// Display name.
    pub name: String,
    /// Demographic category (e.g. `"F"`, `"M"`).
    pub gender: String,
    /// Skill level used for team averages.
    pub skill: i64,
}

/// Attribute selector for [`Roster::attribute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Gender,
    Skill,
}

/// A single attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute<'a> {
    Text(&'a str),
    Integer(i64),
}

/// An immutable, ordered collection of individuals.
///
/// # Examples
///
/// ```
/// use u_teambalance::roster::{Attribute, Field, Roster};
///
/// let roster = Roster::from_entries([("Ada", "F", 80), ("Bob", "M", 60)]);
/// assert_eq!(roster.count(), 2);
/// assert_eq!(roster.attribute(1, Field::Skill), Some(Attribute::Integer(60)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    individuals: Vec<Individual>,
}

impl Roster {
    /// Creates a roster. Ids are reassigned to match positions.
    pub fn new(individuals: Vec<Individual>) -> Self {
        let individuals = individuals
            .into_iter()
            .enumerate()
            .map(|(id, individual)| Individual { id, ..individual })
            .collect();
        Self { individuals }
    }

    /// Convenience constructor from `(name, gender, skill)` tuples.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str, i64)>,
    {
        Self::new(
            entries
                .into_iter()
                .map(|(name, gender, skill)| Individual {
                    id: 0,
                    name: name.to_string(),
                    gender: gender.to_string(),
                    skill,
                })
                .collect(),
        )
    }

    /// Number of individuals.
    pub fn count(&self) -> usize {
        self.individuals.len()
    }

    /// Returns one attribute of the individual at `index`.
    pub fn attribute(&self, index: usize, field: Field) -> Option<Attribute<'_>> {
        let individual = self.individuals.get(index)?;
        Some(match field {
            Field::Name => Attribute::Text(&individual.name),
            Field::Gender => Attribute::Text(&individual.gender),
            Field::Skill => Attribute::Integer(individual.skill),
        })
    }

    pub fn get(&self, index: usize) -> Option<&Individual> {
        self.individuals.get(index)
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    /// Number of individuals in the given category.
    pub fn category_count(&self, category: &str) -> usize {
        self.individuals
            .iter()
            .filter(|i| i.gender == category)
            .count()
    }
}

/// Team-formation parameters.
///
/// # Examples
///
/// ```
/// use u_teambalance::roster::TeamConfig;
///
/// let config = TeamConfig::new(4)
///     .with_minimum("F", 1)
///     .with_minimum("M", 1)
///     .with_max_skill_gap(5);
/// assert_eq!(config.minimum_total(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamConfig {
    /// Members per team.
    pub team_size: usize,
    /// Minimum members per team for each tracked category.
    ///
    /// Categories not listed are unconstrained.
    pub min_per_gender: BTreeMap<String, usize>,
    /// Threshold for satisfaction mode.
    pub max_skill_gap: Option<i64>,
}

impl TeamConfig {
    pub fn new(team_size: usize) -> Self {
        Self {
            team_size,
            min_per_gender: BTreeMap::new(),
            max_skill_gap: None,
        }
    }

    pub fn with_minimum(mut self, category: impl Into<String>, minimum: usize) -> Self {
        self.min_per_gender.insert(category.into(), minimum);
        self
    }

    pub fn with_max_skill_gap(mut self, gap: i64) -> Self {
        self.max_skill_gap = Some(gap);
        self
    }

    /// Sum of all per-category minimums for a single team.
    pub fn minimum_total(&self) -> usize {
        self.min_per_gender.values().sum()
    }

    /// Number of teams for `roster`.
    ///
    /// Fails when the team size is zero, the roster is empty, or the
    /// roster size is not an exact multiple of the team size.
    pub fn team_count(&self, roster: &Roster) -> Result<usize, TeamError> {
        if self.team_size == 0 {
            return Err(TeamError::Configuration(
                "team_size must be positive".into(),
            ));
        }
        let n = roster.count();
        if n == 0 {
            return Err(TeamError::Configuration("roster is empty".into()));
        }
        if n % self.team_size != 0 {
            return Err(TeamError::Configuration(format!(
                "roster size {n} is not a multiple of team size {}",
                self.team_size
            )));
        }
        if let Some(gap) = self.max_skill_gap {
            if gap < 0 {
                return Err(TeamError::Configuration(format!(
                    "max_skill_gap must be non-negative, got {gap}"
                )));
            }
        }
        Ok(n / self.team_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four() -> Roster {
        Roster::from_entries([("A", "F", 80), ("B", "M", 60), ("C", "F", 90), ("D", "M", 70)])
    }

    #[test]
    fn test_ids_follow_positions() {
        let roster = four();
        for (idx, individual) in roster.individuals().iter().enumerate() {
            assert_eq!(individual.id, idx);
        }
    }

    #[test]
    fn test_attribute_access() {
        let roster = four();
        assert_eq!(roster.attribute(0, Field::Name), Some(Attribute::Text("A")));
        assert_eq!(roster.attribute(1, Field::Gender), Some(Attribute::Text("M")));
        assert_eq!(roster.attribute(2, Field::Skill), Some(Attribute::Integer(90)));
        assert_eq!(roster.attribute(4, Field::Name), None);
    }

    #[test]
    fn test_category_count() {
        let roster = four();
        assert_eq!(roster.category_count("F"), 2);
        assert_eq!(roster.category_count("X"), 0);
    }

    #[test]
    fn test_team_count_exact() {
        assert_eq!(TeamConfig::new(2).team_count(&four()).unwrap(), 2);
        assert_eq!(TeamConfig::new(4).team_count(&four()).unwrap(), 1);
    }

    #[test]
    fn test_team_count_not_multiple() {
        let roster = Roster::from_entries([
            ("A", "F", 1),
            ("B", "M", 2),
            ("C", "F", 3),
            ("D", "M", 4),
            ("E", "F", 5),
        ]);
        let err = TeamConfig::new(2).team_count(&roster).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_team_count_zero_size_or_empty() {
        assert!(TeamConfig::new(0).team_count(&four()).is_err());
        assert!(TeamConfig::new(2).team_count(&Roster::new(vec![])).is_err());
    }

    #[test]
    fn test_negative_gap_rejected() {
        let config = TeamConfig::new(2).with_max_skill_gap(-1);
        assert!(config.team_count(&four()).unwrap_err().is_configuration());
    }
}
