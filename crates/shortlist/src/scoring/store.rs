use serde::{Deserialize, Serialize};

use crate::criteria::{
    CriterionDefinition, CriterionId, CriterionRegistry, DefaultScore, TravelTimeLookup,
};
use crate::listings::{Property, PropertyId};

/// One row per (property, criterion): the manual override layered over the
/// cached computed default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub property: PropertyId,
    pub criterion: CriterionId,
    /// Manual override. `Some(0)` is a real score, not "unset".
    pub score: Option<u8>,
    pub comment: Option<String>,
    pub default: DefaultScore,
}

impl CriterionScore {
    pub fn new(property: PropertyId, criterion: CriterionId) -> Self {
        Self {
            property,
            criterion,
            score: None,
            comment: None,
            default: DefaultScore::unknown(),
        }
    }

    /// Manual score if set, else the cached default, else unknown.
    pub fn safe_score(&self) -> Option<u8> {
        self.score.or(self.default.score)
    }

    /// Manual comment, else the default comment, else the safe score itself.
    pub fn safe_comment(&self) -> Option<String> {
        non_blank(&self.comment)
            .or_else(|| non_blank(&self.default.comment))
            .map(str::to_string)
            .or_else(|| self.safe_score().map(|score| score.to_string()))
    }

    pub fn set_manual(&mut self, score: Option<u8>, comment: Option<String>) {
        self.score = score;
        self.comment = comment.filter(|comment| !comment.trim().is_empty());
    }

    pub fn clear_manual(&mut self) {
        self.score = None;
        self.comment = None;
    }

    pub fn has_defaults(&self) -> bool {
        self.default.score.is_some() && self.default.comment.is_some()
    }

    /// Stores a freshly computed default; returns whether it differed.
    pub fn apply_default(&mut self, computed: DefaultScore) -> bool {
        if self.default == computed {
            return false;
        }
        self.default = computed;
        true
    }

    pub fn dealbreaker_outcome(&self) -> DealbreakerOutcome {
        match self.safe_score() {
            Some(0) => DealbreakerOutcome::Failed,
            Some(_) => DealbreakerOutcome::Passed,
            None => DealbreakerOutcome::Undetermined,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.trim().is_empty())
}

/// How a dealbreaker criterion stands for one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DealbreakerOutcome {
    Failed,
    Passed,
    Undetermined,
}

/// Manual criteria have no default. Builtins are looked up by key; a builtin
/// row whose key is not in the registry keeps whatever default it had.
pub fn compute_default(
    criterion: &CriterionDefinition,
    property: &Property,
    registry: &CriterionRegistry,
    travel: &dyn TravelTimeLookup,
) -> Option<DefaultScore> {
    if !criterion.builtin {
        return None;
    }
    registry
        .get(&criterion.key)
        .map(|builtin| builtin.evaluate(property, travel))
}

/// Recomputes the cached default. Returns whether the row changed.
pub fn recompute_default(
    row: &mut CriterionScore,
    criterion: &CriterionDefinition,
    property: &Property,
    registry: &CriterionRegistry,
    travel: &dyn TravelTimeLookup,
) -> bool {
    match compute_default(criterion, property, registry, travel) {
        Some(computed) => row.apply_default(computed),
        None => false,
    }
}

/// Fills the default only when the row does not carry one yet.
pub fn ensure_default(
    row: &mut CriterionScore,
    criterion: &CriterionDefinition,
    property: &Property,
    registry: &CriterionRegistry,
    travel: &dyn TravelTimeLookup,
) -> bool {
    if row.has_defaults() {
        return false;
    }
    recompute_default(row, criterion, property, registry, travel)
}

/// Manual scores are 0..=10, and 0 or 1 for dealbreakers.
pub fn manual_score_in_range(criterion: &CriterionDefinition, score: u8) -> bool {
    if criterion.dealbreaker {
        score <= 1
    } else {
        score <= 10
    }
}
