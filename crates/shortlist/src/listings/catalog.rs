use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::Applicability;

/// Information categories a listing can carry in its attribute bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InformationKey {
    Year,
    CadastralIncome,
    SpatialPlanning,
    Epc,
    Heating,
    Building,
}

/// Catalog metadata for one information category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InformationCategory {
    pub key: InformationKey,
    pub name: &'static str,
    /// Field label on the listing portal pages.
    pub portal_label: &'static str,
    pub applies_to: Applicability,
}

/// Ordered like the [`InformationKey`] variants.
static CATEGORIES: [InformationCategory; 6] = [
    InformationCategory {
        key: InformationKey::Year,
        name: "Year",
        portal_label: "Bouwjaar",
        applies_to: Applicability::HOUSE,
    },
    InformationCategory {
        key: InformationKey::CadastralIncome,
        name: "Cadastral income",
        portal_label: "Kadastraal Inkomen",
        applies_to: Applicability::HOUSE,
    },
    InformationCategory {
        key: InformationKey::SpatialPlanning,
        name: "Spatial planning",
        portal_label: "Ruimtelijke ordening",
        applies_to: Applicability::HOUSE,
    },
    InformationCategory {
        key: InformationKey::Epc,
        name: "EPC score",
        portal_label: "EPC waarde",
        applies_to: Applicability::HOUSE,
    },
    InformationCategory {
        key: InformationKey::Heating,
        name: "Heating",
        portal_label: "Type verwarming",
        applies_to: Applicability::HOUSE,
    },
    InformationCategory {
        key: InformationKey::Building,
        name: "Building",
        portal_label: "Bebouwing",
        applies_to: Applicability::HOUSE,
    },
];

impl InformationKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            InformationKey::Year => "year",
            InformationKey::CadastralIncome => "cadastral_income",
            InformationKey::SpatialPlanning => "spatial_planning",
            InformationKey::Epc => "epc",
            InformationKey::Heating => "heating",
            InformationKey::Building => "building",
        }
    }

    pub fn category(self) -> &'static InformationCategory {
        &CATEGORIES[self as usize]
    }

    /// Resolves a raw field name by key, display name or portal label.
    pub fn resolve(raw: &str) -> Option<Self> {
        let wanted = normalize_label(raw);
        CATEGORIES
            .iter()
            .find(|category| {
                wanted == category.key.as_str()
                    || wanted == normalize_label(category.name)
                    || wanted == normalize_label(category.portal_label)
            })
            .map(|category| category.key)
    }
}

impl fmt::Display for InformationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn categories() -> &'static [InformationCategory] {
    &CATEGORIES
}

fn normalize_label(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}', ':'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}
