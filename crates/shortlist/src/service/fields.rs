use serde::Serialize;

use crate::criteria::CriterionDefinition;
use crate::listings::{categories, Property};
use crate::scoring::CriterionScore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Score { min: u8, max: u8 },
    Toggle,
    Text,
}

/// A form field the review UI renders for one listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditableField {
    pub field_id: String,
    pub label: String,
    pub kind: FieldKind,
    pub value: Option<String>,
}

/// Manual criteria come first (toggles for dealbreakers), followed by the
/// information categories of the listing's kind.
pub fn build_editable_fields(
    property: &Property,
    criteria: &[CriterionDefinition],
    scores: &[CriterionScore],
) -> Vec<EditableField> {
    let mut fields = Vec::new();

    for criterion in criteria
        .iter()
        .filter(|criterion| !criterion.builtin && criterion.applies_to.includes(property.kind()))
    {
        let current = scores
            .iter()
            .find(|row| row.property == property.id && row.criterion == criterion.id)
            .and_then(|row| row.score);
        let (kind, value) = if criterion.dealbreaker {
            (FieldKind::Toggle, current.map(|score| (score > 0).to_string()))
        } else {
            (
                FieldKind::Score { min: 0, max: 10 },
                current.map(|score| score.to_string()),
            )
        };
        fields.push(EditableField {
            field_id: format!("criterion-{}", criterion.id),
            label: criterion.name.clone(),
            kind,
            value,
        });
    }

    for category in categories()
        .iter()
        .filter(|category| category.applies_to.includes(property.kind()))
    {
        fields.push(EditableField {
            field_id: format!("information-{}", category.key),
            label: category.name.to_string(),
            kind: FieldKind::Text,
            value: property.get_information(category.key).map(str::to_string),
        });
    }

    fields
}
