//! Criterion definitions, the builtin scoring library and its registry.

pub mod registry;
pub(crate) mod rules;
pub mod travel;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::listings::Applicability;

pub use registry::{BuiltinCriterion, CatalogEntry, CriterionRegistry};
pub use rules::{format_euros, DefaultScore, RuleError};
pub use travel::{NoTravelTimes, TravelTime, TravelTimeLookup, TravelTimeTable};

/// Row identifier of a stored criterion definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriterionId(pub u32);

impl fmt::Display for CriterionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored scoring criterion, either bound to a builtin rule or scored by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionDefinition {
    pub id: CriterionId,
    /// Stable identifier. Builtin criteria bind to their rule through it.
    pub key: String,
    pub name: String,
    pub dealbreaker: bool,
    /// Ignored for dealbreakers.
    pub importance: u8,
    pub applies_to: Applicability,
    pub builtin: bool,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub positive_description: Option<String>,
    #[serde(default)]
    pub negative_description: Option<String>,
    #[serde(default)]
    pub unknown_description: Option<String>,
}

impl CriterionDefinition {
    pub fn from_builtin(id: CriterionId, builtin: &BuiltinCriterion) -> Self {
        Self {
            id,
            key: builtin.key.to_string(),
            name: builtin.name.to_string(),
            dealbreaker: builtin.dealbreaker,
            importance: builtin.importance,
            applies_to: builtin.applies_to,
            builtin: true,
            formula: Some(builtin.formula.to_string()),
            positive_description: None,
            negative_description: None,
            unknown_description: None,
        }
    }

    pub fn positive_description(&self) -> &str {
        description_or(&self.positive_description, &self.name)
    }

    pub fn negative_description(&self) -> &str {
        description_or(&self.negative_description, &self.name)
    }

    pub fn unknown_description(&self) -> &str {
        description_or(&self.unknown_description, &self.name)
    }

    /// Catalog order: dealbreakers first, then by importance, then by id.
    pub fn catalog_order(&self, other: &Self) -> std::cmp::Ordering {
        other
            .dealbreaker
            .cmp(&self.dealbreaker)
            .then(other.importance.cmp(&self.importance))
            .then(self.id.cmp(&other.id))
    }
}

fn description_or<'a>(description: &'a Option<String>, name: &'a str) -> &'a str {
    description
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(name)
}

/// Manually scored criterion submitted by a household member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCriterion {
    pub name: String,
    #[serde(default)]
    pub dealbreaker: bool,
    #[serde(default = "default_importance")]
    pub importance: u8,
    #[serde(flatten)]
    pub applies_to: Applicability,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub positive_description: Option<String>,
    #[serde(default)]
    pub negative_description: Option<String>,
    #[serde(default)]
    pub unknown_description: Option<String>,
}

fn default_importance() -> u8 {
    5
}

impl NewCriterion {
    /// Derived stable key: the lower-cased name with spaces as underscores.
    pub fn key(&self) -> String {
        self.name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase()
    }

    pub fn into_definition(self, id: CriterionId) -> Result<CriterionDefinition, CriterionError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(CriterionError::EmptyName);
        }
        if self.importance > MAX_IMPORTANCE {
            return Err(CriterionError::ImportanceOutOfRange(self.importance));
        }

        Ok(CriterionDefinition {
            id,
            key: self.key(),
            name,
            dealbreaker: self.dealbreaker,
            importance: if self.dealbreaker {
                MAX_IMPORTANCE
            } else {
                self.importance
            },
            applies_to: self.applies_to,
            builtin: false,
            formula: self.formula,
            positive_description: self.positive_description,
            negative_description: self.negative_description,
            unknown_description: self.unknown_description,
        })
    }
}

/// Editable attributes of an existing criterion. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub importance: Option<u8>,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub positive_description: Option<String>,
    #[serde(default)]
    pub negative_description: Option<String>,
    #[serde(default)]
    pub unknown_description: Option<String>,
}

impl CriterionUpdate {
    pub fn apply(self, criterion: &mut CriterionDefinition) -> Result<(), CriterionError> {
        if let Some(name) = self.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(CriterionError::EmptyName);
            }
            criterion.name = name;
        }
        if let Some(importance) = self.importance {
            if importance > MAX_IMPORTANCE {
                return Err(CriterionError::ImportanceOutOfRange(importance));
            }
            if !criterion.dealbreaker {
                criterion.importance = importance;
            }
        }
        if self.formula.is_some() {
            criterion.formula = self.formula;
        }
        if self.positive_description.is_some() {
            criterion.positive_description = self.positive_description;
        }
        if self.negative_description.is_some() {
            criterion.negative_description = self.negative_description;
        }
        if self.unknown_description.is_some() {
            criterion.unknown_description = self.unknown_description;
        }
        Ok(())
    }
}

pub const MAX_IMPORTANCE: u8 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CriterionError {
    #[error("criterion name must not be empty")]
    EmptyName,
    #[error("importance {0} exceeds the maximum of 10")]
    ImportanceOutOfRange(u8),
    #[error("criterion '{0}' already exists")]
    DuplicateKey(String),
    #[error("builtin criterion '{0}' cannot be deleted")]
    ImmutableBuiltin(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_criterion(name: &str, dealbreaker: bool) -> NewCriterion {
        NewCriterion {
            name: name.to_string(),
            dealbreaker,
            importance: 4,
            applies_to: Applicability::BOTH,
            formula: None,
            positive_description: None,
            negative_description: Some("  ".to_string()),
            unknown_description: Some("Nobody checked the neighbours yet".to_string()),
        }
    }

    #[test]
    fn descriptions_fall_back_to_the_name() {
        let criterion = new_criterion("Quiet street", false)
            .into_definition(CriterionId(20))
            .expect("valid criterion");

        assert_eq!(criterion.key, "quiet_street");
        assert_eq!(criterion.positive_description(), "Quiet street");
        assert_eq!(criterion.negative_description(), "Quiet street");
        assert_eq!(
            criterion.unknown_description(),
            "Nobody checked the neighbours yet"
        );
        assert!(!criterion.builtin);
    }

    #[test]
    fn dealbreakers_carry_maximum_importance() {
        let criterion = new_criterion("Flood zone", true)
            .into_definition(CriterionId(21))
            .expect("valid criterion");
        assert_eq!(criterion.importance, MAX_IMPORTANCE);

        let mut criterion = criterion;
        CriterionUpdate {
            importance: Some(2),
            ..CriterionUpdate::default()
        }
        .apply(&mut criterion)
        .expect("update applies");
        assert_eq!(criterion.importance, MAX_IMPORTANCE);
    }

    #[test]
    fn rejects_blank_names_and_oversized_importance() {
        assert_eq!(
            new_criterion("   ", false).into_definition(CriterionId(1)),
            Err(CriterionError::EmptyName)
        );

        let mut oversized = new_criterion("Garden", false);
        oversized.importance = 11;
        assert_eq!(
            oversized.into_definition(CriterionId(1)),
            Err(CriterionError::ImportanceOutOfRange(11))
        );
    }

    #[test]
    fn new_criterion_deserializes_flat_applicability() {
        let parsed: NewCriterion = serde_json::from_str(
            r#"{"name":"Privacy","importance":10,"applies_to_house":true,"applies_to_land":true}"#,
        )
        .expect("valid payload");
        assert_eq!(parsed.applies_to, Applicability::BOTH);
        assert!(!parsed.dealbreaker);

        let invalid: Result<NewCriterion, _> = serde_json::from_str(
            r#"{"name":"Privacy","applies_to_house":false,"applies_to_land":false}"#,
        );
        assert!(invalid.is_err());
    }
}
