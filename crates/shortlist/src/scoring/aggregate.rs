//! Combines the resolved criterion scores of one property into its aggregate
//! 0-100 score. Pure: only reads cached and manual scores.

use std::collections::HashMap;

use serde::Serialize;

use super::store::CriterionScore;
use crate::criteria::{CriterionDefinition, CriterionId};
use crate::listings::{Property, PropertyId};

/// A criterion as it stands for one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriterionView {
    pub criterion: CriterionId,
    pub key: String,
    pub name: String,
    pub dealbreaker: bool,
    pub importance: u8,
    pub score: Option<u8>,
    pub comment: Option<String>,
    /// Description matching the score: positive above 5, negative at or
    /// below 5 (and for failed dealbreakers), unknown when unscored.
    pub description: String,
}

impl CriterionView {
    fn resolve(criterion: &CriterionDefinition, row: Option<&CriterionScore>) -> Self {
        let score = row.and_then(CriterionScore::safe_score);
        let comment = row.and_then(CriterionScore::safe_comment);
        let description = match score {
            None => criterion.unknown_description(),
            Some(0) if criterion.dealbreaker => criterion.negative_description(),
            Some(_) if criterion.dealbreaker => criterion.positive_description(),
            Some(score) if score > 5 => criterion.positive_description(),
            Some(_) => criterion.negative_description(),
        };

        Self {
            criterion: criterion.id,
            key: criterion.key.clone(),
            name: criterion.name.clone(),
            dealbreaker: criterion.dealbreaker,
            importance: criterion.importance,
            score,
            comment,
            description: description.to_string(),
        }
    }
}

/// Full reading of a property against every applicable criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyAssessment {
    pub property: PropertyId,
    pub score: u8,
    pub dealbreakers: Vec<CriterionView>,
    pub positive: Vec<CriterionView>,
    pub negative: Vec<CriterionView>,
    pub potential_problems: Vec<CriterionView>,
}

impl PropertyAssessment {
    pub fn is_disqualified(&self) -> bool {
        !self.dealbreakers.is_empty()
    }

    /// `negative description (comment)` for each failed dealbreaker.
    pub fn dealbreaker_warning(&self) -> Option<String> {
        if self.dealbreakers.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .dealbreakers
            .iter()
            .map(|view| match &view.comment {
                Some(comment) => format!("{} ({})", view.description, comment),
                None => view.description.clone(),
            })
            .collect();
        Some(parts.join("; "))
    }
}

/// Assesses `property` against the criteria that apply to its kind. Criteria
/// without a score row count as unknown.
pub fn assess(
    property: &Property,
    criteria: &[CriterionDefinition],
    scores: &[CriterionScore],
) -> PropertyAssessment {
    let rows: HashMap<CriterionId, &CriterionScore> = scores
        .iter()
        .filter(|row| row.property == property.id)
        .map(|row| (row.criterion, row))
        .collect();

    let mut ordered: Vec<&CriterionDefinition> = criteria
        .iter()
        .filter(|criterion| criterion.applies_to.includes(property.kind()))
        .collect();
    ordered.sort_by(|left, right| left.catalog_order(right));

    let mut assessment = PropertyAssessment {
        property: property.id,
        score: 0,
        dealbreakers: Vec::new(),
        positive: Vec::new(),
        negative: Vec::new(),
        potential_problems: Vec::new(),
    };

    for criterion in ordered {
        let view = CriterionView::resolve(criterion, rows.get(&criterion.id).copied());
        match (view.score, criterion.dealbreaker) {
            (None, _) => assessment.potential_problems.push(view),
            (Some(0), true) => assessment.dealbreakers.push(view),
            (Some(_), true) => {}
            (Some(score), false) if score > 5 => assessment.positive.push(view),
            (Some(_), false) => assessment.negative.push(view),
        }
    }

    if assessment.dealbreakers.is_empty() {
        assessment.score = weighted_score(assessment.positive.iter().chain(&assessment.negative));
    }
    assessment
}

/// `round(sum(score * importance) / sum(10 * importance) * 100)`, or 0 when
/// nothing carries weight.
pub fn weighted_score<'a>(aspects: impl IntoIterator<Item = &'a CriterionView>) -> u8 {
    let (achieved, possible) = aspects
        .into_iter()
        .filter_map(|view| view.score.map(|score| (score, view.importance)))
        .fold((0u64, 0u64), |(achieved, possible), (score, importance)| {
            (
                achieved + u64::from(score) * u64::from(importance),
                possible + 10 * u64::from(importance),
            )
        });

    if possible == 0 {
        return 0;
    }
    let percentage = (achieved as f64 / possible as f64 * 100.0).round_ties_even();
    percentage.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{CriterionRegistry, DefaultScore, NewCriterion};
    use crate::listings::{Applicability, NewProperty, PropertyKind};
    use std::collections::BTreeMap;

    fn property(kind: PropertyKind) -> Property {
        Property::new(
            PropertyId(11),
            NewProperty {
                kind,
                address: "Molenstraat 4, 3001 Heverlee".to_string(),
                seller: None,
                price: 150_000,
                total_area: 600,
                inhabitable_area: None,
                source_url: None,
                added_on: None,
                information: BTreeMap::new(),
                features: Vec::new(),
            },
            BTreeMap::new(),
        )
    }

    fn manual(id: u32, name: &str, dealbreaker: bool, importance: u8) -> CriterionDefinition {
        let mut definition = NewCriterion {
            name: name.to_string(),
            dealbreaker,
            importance,
            applies_to: Applicability::BOTH,
            formula: None,
            positive_description: Some(format!("good {name}")),
            negative_description: Some(format!("bad {name}")),
            unknown_description: None,
        }
        .into_definition(CriterionId(id))
        .expect("valid criterion");
        definition.importance = if dealbreaker { 10 } else { importance };
        definition
    }

    fn scored(criterion: &CriterionDefinition, score: Option<u8>, comment: &str) -> CriterionScore {
        let mut row = CriterionScore::new(PropertyId(11), criterion.id);
        row.default = DefaultScore {
            score,
            comment: Some(comment.to_string()),
        };
        row
    }

    #[test]
    fn weighted_score_rounds_half_to_even() {
        let garden = manual(1, "garden", false, 1);
        let light = manual(2, "light", false, 1);
        let quiet = manual(3, "quiet", false, 2);
        let criteria = vec![garden.clone(), light.clone(), quiet.clone()];

        // (7 + 8 + 2 * 5) / 40 * 100 = 62.5 rounds to 62
        let scores = vec![
            scored(&garden, Some(7), "big"),
            scored(&light, Some(8), "south"),
            scored(&quiet, Some(5), "busy road"),
        ];
        let assessment = assess(&property(PropertyKind::House), &criteria, &scores);
        assert_eq!(assessment.score, 62);
        assert_eq!(assessment.positive.len(), 2);
        assert_eq!(assessment.negative.len(), 1);
        assert_eq!(assessment.negative[0].description, "bad quiet");
    }

    #[test]
    fn failed_dealbreaker_forces_zero() {
        let flood = manual(1, "flood zone", true, 10);
        let garden = manual(2, "garden", false, 5);
        let criteria = vec![garden.clone(), flood.clone()];
        let scores = vec![
            scored(&flood, Some(0), "in flood zone"),
            scored(&garden, Some(10), "huge"),
        ];

        let assessment = assess(&property(PropertyKind::House), &criteria, &scores);
        assert_eq!(assessment.score, 0);
        assert!(assessment.is_disqualified());
        assert_eq!(
            assessment.dealbreaker_warning().as_deref(),
            Some("bad flood zone (in flood zone)")
        );
    }

    #[test]
    fn undetermined_dealbreakers_are_potential_problems() {
        let flood = manual(1, "flood zone", true, 10);
        let garden = manual(2, "garden", false, 5);
        let criteria = vec![flood.clone(), garden.clone()];
        let scores = vec![scored(&flood, None, "unknown"), scored(&garden, Some(6), "ok")];

        let assessment = assess(&property(PropertyKind::Land), &criteria, &scores);
        assert_eq!(assessment.score, 60);
        assert_eq!(assessment.potential_problems.len(), 1);
        assert_eq!(assessment.potential_problems[0].description, "flood zone");
        assert_eq!(assessment.dealbreaker_warning(), None);
    }

    #[test]
    fn no_weighted_criteria_scores_zero() {
        let unimportant = manual(1, "view", false, 0);
        let criteria = vec![unimportant.clone()];
        let scores = vec![scored(&unimportant, Some(10), "great")];

        let assessment = assess(&property(PropertyKind::House), &criteria, &scores);
        assert_eq!(assessment.score, 0);

        let nothing = assess(&property(PropertyKind::House), &[], &[]);
        assert_eq!(nothing.score, 0);
    }

    #[test]
    fn inapplicable_criteria_are_ignored() {
        let registry = CriterionRegistry::builtin();
        let criteria: Vec<_> = registry
            .entries()
            .iter()
            .enumerate()
            .map(|(index, entry)| CriterionDefinition::from_builtin(CriterionId(index as u32), entry))
            .collect();

        let assessment = assess(&property(PropertyKind::Land), &criteria, &[]);
        let keys: Vec<_> = assessment
            .potential_problems
            .iter()
            .map(|view| view.key.as_str())
            .collect();
        assert!(keys.contains(&"land_price"));
        assert!(!keys.contains(&"house_price"));
        assert!(!keys.contains(&"cadastral_income"));
    }
}
