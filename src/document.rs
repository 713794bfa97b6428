//! JSON roster document.
//!
//! ```json
//! {
//!   "students": [{ "name": "Ada", "gender": "F", "skills": { "coding": 80 } }],
//!   "constraints": {
//!     "team_size": 2,
//!     "min_female_per_team": 1,
//!     "min_male_per_team": 1,
//!     "max_skill_gap": 10
//!   }
//! }
//! ```

use crate::error::TeamError;
use crate::roster::{Individual, Roster, TeamConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Skill key read when none is specified.
pub const DEFAULT_SKILL: &str = "coding";

/// Category label for `min_female_per_team`.
pub const FEMALE: &str = "F";
/// Category label for `min_male_per_team`.
pub const MALE: &str = "M";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRecord {
    pub name: String,
    pub gender: String,
    pub skills: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintRecord {
    pub team_size: usize,
    #[serde(default)]
    pub min_female_per_team: usize,
    #[serde(default)]
    pub min_male_per_team: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_skill_gap: Option<i64>,
}

/// A parsed roster file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterDocument {
    pub students: Vec<StudentRecord>,
    pub constraints: ConstraintRecord,
}

impl RosterDocument {
    pub fn from_json_str(text: &str) -> Result<Self, TeamError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TeamError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Converts to a roster and configuration using the default skill key.
    pub fn into_parts(self) -> Result<(Roster, TeamConfig), TeamError> {
        self.into_parts_with_skill(DEFAULT_SKILL)
    }

    /// Converts to a roster and configuration, reading `skill` from each
    /// student's skill map.
    pub fn into_parts_with_skill(self, skill: &str) -> Result<(Roster, TeamConfig), TeamError> {
        let individuals = self
            .students
            .into_iter()
            .enumerate()
            .map(|(id, student)| {
                let level = student.skills.get(skill).copied().ok_or_else(|| {
                    TeamError::Configuration(format!(
                        "student '{}' has no '{skill}' skill",
                        student.name
                    ))
                })?;
                Ok(Individual {
                    id,
                    name: student.name,
                    gender: student.gender,
                    skill: level,
                })
            })
            .collect::<Result<Vec<_>, TeamError>>()?;

        let c = self.constraints;
        let mut config = TeamConfig::new(c.team_size)
            .with_minimum(FEMALE, c.min_female_per_team)
            .with_minimum(MALE, c.min_male_per_team);
        config.max_skill_gap = c.max_skill_gap;

        Ok((Roster::new(individuals), config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "students": [
            { "name": "A", "gender": "F", "skills": { "coding": 80, "design": 3 } },
            { "name": "B", "gender": "M", "skills": { "coding": 60, "design": 9 } }
        ],
        "constraints": {
            "team_size": 2,
            "min_female_per_team": 1,
            "min_male_per_team": 1
        }
    }"#;

    #[test]
    fn test_parse_document() {
        let doc = RosterDocument::from_json_str(SAMPLE).unwrap();
        let (roster, config) = doc.into_parts().unwrap();
        assert_eq!(roster.count(), 2);
        assert_eq!(roster.get(1).unwrap().skill, 60);
        assert_eq!(config.team_size, 2);
        assert_eq!(config.min_per_gender.get(FEMALE), Some(&1));
        assert_eq!(config.min_per_gender.get(MALE), Some(&1));
        assert_eq!(config.max_skill_gap, None);
    }

    #[test]
    fn test_alternate_skill_key() {
        let doc = RosterDocument::from_json_str(SAMPLE).unwrap();
        let (roster, _) = doc.into_parts_with_skill("design").unwrap();
        assert_eq!(roster.get(0).unwrap().skill, 3);
    }

    #[test]
    fn test_missing_skill_is_configuration_error() {
        let doc = RosterDocument::from_json_str(SAMPLE).unwrap();
        let err = doc.into_parts_with_skill("music").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_malformed_document() {
        let err = RosterDocument::from_json_str(r#"{"students": []}"#).unwrap_err();
        assert!(matches!(err, TeamError::Document(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_max_skill_gap_parsed() {
        let text = SAMPLE.replace(
            "\"min_male_per_team\": 1",
            "\"min_male_per_team\": 1, \"max_skill_gap\": 7",
        );
        let (_, config) = RosterDocument::from_json_str(&text)
            .unwrap()
            .into_parts()
            .unwrap();
        assert_eq!(config.max_skill_gap, Some(7));
    }
}
