use std::collections::HashSet;

use serde::Serialize;

use super::rules::{self, clamp_score, DefaultScore, RuleInput, ScoringRule};
use super::travel::TravelTimeLookup;
use super::{CriterionError, MAX_IMPORTANCE};
use crate::listings::{Applicability, Property};

/// A scoring rule bound to its catalog metadata.
#[derive(Clone, Copy)]
pub struct BuiltinCriterion {
    pub key: &'static str,
    pub name: &'static str,
    pub dealbreaker: bool,
    pub importance: u8,
    pub applies_to: Applicability,
    pub formula: &'static str,
    rule: ScoringRule,
}

impl BuiltinCriterion {
    const fn new(
        key: &'static str,
        name: &'static str,
        dealbreaker: bool,
        importance: u8,
        applies_to: Applicability,
        formula: &'static str,
        rule: ScoringRule,
    ) -> Self {
        Self {
            key,
            name,
            dealbreaker,
            importance: if dealbreaker { MAX_IMPORTANCE } else { importance },
            applies_to,
            formula,
            rule,
        }
    }

    /// Runs the rule and clamps the outcome. Never fails: incomplete listings
    /// yield an unknown score.
    pub fn evaluate(&self, property: &Property, travel: &dyn TravelTimeLookup) -> DefaultScore {
        let input = RuleInput { property, travel };
        clamp_score(self.key, (self.rule)(&input))
    }
}

impl std::fmt::Debug for BuiltinCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinCriterion")
            .field("key", &self.key)
            .field("dealbreaker", &self.dealbreaker)
            .field("importance", &self.importance)
            .field("applies_to", &self.applies_to)
            .finish()
    }
}

static BUILTINS: [BuiltinCriterion; 13] = [
    BuiltinCriterion::new(
        "time_by_car_to_brussels",
        "Time to Brussels by car",
        false,
        3,
        Applicability::BOTH,
        "10 - (seconds - 3600) // 360",
        rules::time_by_car_to_brussels,
    ),
    BuiltinCriterion::new(
        "time_by_car_to_leuven",
        "Time to Leuven by car",
        false,
        5,
        Applicability::BOTH,
        "10 - (seconds - 3600) // 300",
        rules::time_by_car_to_leuven,
    ),
    BuiltinCriterion::new(
        "epc",
        "EPC score",
        false,
        6,
        Applicability::HOUSE,
        "10 - (epc - 150) // 60",
        rules::epc,
    ),
    BuiltinCriterion::new(
        "cadastral_income",
        "Cadastral income under limit",
        true,
        10,
        Applicability::HOUSE,
        "1 if cadastral income <= 745 else 0",
        rules::cadastral_income,
    ),
    BuiltinCriterion::new(
        "house_price",
        "Price",
        false,
        10,
        Applicability::HOUSE,
        "10 - (price - 100000) // 7000",
        rules::house_price,
    ),
    BuiltinCriterion::new(
        "land_price",
        "Price",
        false,
        10,
        Applicability::LAND,
        "10 - (price - 20000) // 5000",
        rules::land_price,
    ),
    BuiltinCriterion::new(
        "year",
        "Year built",
        false,
        8,
        Applicability::HOUSE,
        "10 - (2016 - year) // 4",
        rules::year,
    ),
    BuiltinCriterion::new(
        "spatial_planning",
        "Spatial planning status of land",
        true,
        10,
        Applicability::HOUSE,
        "0 if Recreatiegebied else 1",
        rules::spatial_planning,
    ),
    BuiltinCriterion::new(
        "heating",
        "Heating",
        false,
        6,
        Applicability::HOUSE,
        "0 if Elektrisch else 10",
        rules::heating,
    ),
    BuiltinCriterion::new(
        "building",
        "Building",
        false,
        8,
        Applicability::HOUSE,
        "10 if Open else 0",
        rules::building,
    ),
    BuiltinCriterion::new(
        "house_price_per_m2",
        "Price per m2",
        false,
        9,
        Applicability::HOUSE,
        "10 - (price // total_area) // 15",
        rules::house_price_per_m2,
    ),
    BuiltinCriterion::new(
        "land_price_per_m2",
        "Price per m2",
        false,
        10,
        Applicability::LAND,
        "10 - (price // total_area) // 10",
        rules::land_price_per_m2,
    ),
    BuiltinCriterion::new(
        "total_area",
        "Total area",
        false,
        8,
        Applicability::BOTH,
        "(total_area - 300) // 300",
        rules::total_area,
    ),
];

/// Catalog row exposed for criterion synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub key: &'static str,
    pub name: &'static str,
    pub dealbreaker: bool,
    pub importance: u8,
    pub applies_to: Applicability,
}

/// Lookup from stable criterion key to its builtin rule. Built once at startup.
#[derive(Debug, Clone)]
pub struct CriterionRegistry {
    entries: Vec<BuiltinCriterion>,
}

impl CriterionRegistry {
    pub fn builtin() -> Self {
        Self {
            entries: BUILTINS.to_vec(),
        }
    }

    /// Builds a registry from an explicit table, refusing duplicate keys.
    pub fn from_entries(
        entries: impl IntoIterator<Item = BuiltinCriterion>,
    ) -> Result<Self, CriterionError> {
        let mut seen = HashSet::new();
        let mut collected = Vec::new();
        for entry in entries {
            if !seen.insert(entry.key) {
                return Err(CriterionError::DuplicateKey(entry.key.to_string()));
            }
            collected.push(entry);
        }
        Ok(Self { entries: collected })
    }

    pub fn get(&self, key: &str) -> Option<&BuiltinCriterion> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    pub fn entries(&self) -> &[BuiltinCriterion] {
        &self.entries
    }

    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.entries
            .iter()
            .map(|entry| CatalogEntry {
                key: entry.key,
                name: entry.name,
                dealbreaker: entry.dealbreaker,
                importance: entry.importance,
                applies_to: entry.applies_to,
            })
            .collect()
    }
}

impl Default for CriterionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
