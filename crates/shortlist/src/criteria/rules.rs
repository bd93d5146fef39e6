//! Builtin scoring rules.
//!
//! Each rule reads a property (and at most one travel-time lookup) and
//! returns a raw score with a display comment. [`clamp_score`] turns the raw
//! outcome into a [`DefaultScore`]: errors and unset attributes become an
//! unknown score, everything else is clamped into `0..=10`.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::travel::TravelTimeLookup;
use crate::listings::{InformationKey, Property};

pub(crate) const BRUSSELS: &str = "VUB, Brussel";
pub(crate) const LEUVEN: &str = "Campus Arenberg, Heverlee";

const REFERENCE_YEAR: i64 = 2016;
const CADASTRAL_INCOME_LIMIT: i64 = 745;
const HOUR: i64 = 3600;

pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 10;

pub(crate) struct RuleInput<'a> {
    pub(crate) property: &'a Property,
    pub(crate) travel: &'a dyn TravelTimeLookup,
}

/// `Ok(None)` means the rule has nothing to say about this property.
pub(crate) type RuleResult = Result<Option<(i64, String)>, RuleError>;

pub(crate) type ScoringRule = fn(&RuleInput<'_>) -> RuleResult;

/// Reasons a rule could not score a property. Never leaves the scoring library.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("missing {0}")]
    MissingInformation(InformationKey),
    #[error("malformed {key} value '{value}'")]
    Malformed { key: InformationKey, value: String },
    #[error("no travel time from '{origin}' to '{destination}'")]
    TravelTimeUnavailable { origin: String, destination: String },
}

/// Computed score and comment cached for a (property, criterion) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultScore {
    pub score: Option<u8>,
    pub comment: Option<String>,
}

impl DefaultScore {
    pub const fn unknown() -> Self {
        Self {
            score: None,
            comment: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.score.is_none()
    }
}

pub(crate) fn clamp_score(criterion: &str, result: RuleResult) -> DefaultScore {
    match result {
        Ok(Some((score, comment))) => DefaultScore {
            score: Some(score.clamp(MIN_SCORE, MAX_SCORE) as u8),
            comment: Some(comment),
        },
        Ok(None) => DefaultScore::unknown(),
        Err(err) => {
            debug!(criterion, reason = %err, "criterion unknown for property");
            DefaultScore::unknown()
        }
    }
}

/// Python-style floor division; the divisor is always a positive constant.
fn floor_div(value: i64, divisor: i64) -> i64 {
    value.div_euclid(divisor)
}

fn require(property: &Property, key: InformationKey) -> Result<&str, RuleError> {
    property
        .get_information(key)
        .ok_or(RuleError::MissingInformation(key))
}

fn parse_number(key: InformationKey, raw: &str) -> Result<i64, RuleError> {
    raw.trim().parse::<i64>().map_err(|_| RuleError::Malformed {
        key,
        value: raw.to_string(),
    })
}

fn digit_run() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new("[0-9]+").expect("digit pattern compiles"))
}

/// `€170,000`
pub fn format_euros(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if amount < 0 {
        format!("-€{grouped}")
    } else {
        format!("€{grouped}")
    }
}

fn travel_score(input: &RuleInput<'_>, destination: &str, decay: i64) -> RuleResult {
    let origin = input.property.address.as_str();
    let travel_time = input.travel.travel_time(origin, destination).ok_or_else(|| {
        RuleError::TravelTimeUnavailable {
            origin: origin.to_string(),
            destination: destination.to_string(),
        }
    })?;

    Ok(Some((
        MAX_SCORE - floor_div(travel_time.seconds.saturating_sub(HOUR), decay),
        travel_time.text,
    )))
}

pub(crate) fn time_by_car_to_brussels(input: &RuleInput<'_>) -> RuleResult {
    travel_score(input, BRUSSELS, 360)
}

pub(crate) fn time_by_car_to_leuven(input: &RuleInput<'_>) -> RuleResult {
    travel_score(input, LEUVEN, 300)
}

pub(crate) fn epc(input: &RuleInput<'_>) -> RuleResult {
    let raw = require(input.property, InformationKey::Epc)?;
    let digits = digit_run().find(raw).ok_or_else(|| RuleError::Malformed {
        key: InformationKey::Epc,
        value: raw.to_string(),
    })?;
    let rating = parse_number(InformationKey::Epc, digits.as_str())?;

    Ok(Some((MAX_SCORE - floor_div(rating - 150, 60), raw.to_string())))
}

/// Dealbreaker: the reduced registration tax only applies up to the limit.
pub(crate) fn cadastral_income(input: &RuleInput<'_>) -> RuleResult {
    let raw = require(input.property, InformationKey::CadastralIncome)?;
    let amount: String = raw
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .chars()
        .filter(|c| !matches!(c, '.' | ' ' | '\u{a0}'))
        .collect();
    let income = parse_number(InformationKey::CadastralIncome, &amount).map_err(|_| {
        RuleError::Malformed {
            key: InformationKey::CadastralIncome,
            value: raw.to_string(),
        }
    })?;

    Ok(Some((
        i64::from(income <= CADASTRAL_INCOME_LIMIT),
        raw.to_string(),
    )))
}

pub(crate) fn house_price(input: &RuleInput<'_>) -> RuleResult {
    let price = i64::from(input.property.price);
    Ok(Some((
        MAX_SCORE - floor_div(price - 100_000, 7_000),
        format_euros(price),
    )))
}

pub(crate) fn land_price(input: &RuleInput<'_>) -> RuleResult {
    let price = i64::from(input.property.price);
    Ok(Some((
        MAX_SCORE - floor_div(price - 20_000, 5_000),
        format_euros(price),
    )))
}

pub(crate) fn year(input: &RuleInput<'_>) -> RuleResult {
    let raw = require(input.property, InformationKey::Year)?;
    let built = parse_number(InformationKey::Year, raw)?;
    Ok(Some((
        MAX_SCORE - floor_div(REFERENCE_YEAR - built, 4),
        raw.to_string(),
    )))
}

/// Dealbreaker: recreational zoning forbids permanent residence.
pub(crate) fn spatial_planning(input: &RuleInput<'_>) -> RuleResult {
    Ok(input
        .property
        .get_information(InformationKey::SpatialPlanning)
        .map(|zoning| (i64::from(zoning != "Recreatiegebied"), zoning.to_string())))
}

pub(crate) fn heating(input: &RuleInput<'_>) -> RuleResult {
    Ok(input
        .property
        .get_information(InformationKey::Heating)
        .map(|heating| {
            let score = if heating == "Elektrisch" { 0 } else { 10 };
            (score, heating.to_string())
        }))
}

pub(crate) fn building(input: &RuleInput<'_>) -> RuleResult {
    Ok(input
        .property
        .get_information(InformationKey::Building)
        .map(|building| {
            let score = if building == "Open" { 10 } else { 0 };
            (score, building.to_string())
        }))
}

fn price_per_m2(property: &Property, divisor: i64) -> RuleResult {
    let (price, area) = (i64::from(property.price), i64::from(property.total_area));
    if price == 0 || area == 0 {
        return Ok(None);
    }

    let per_m2 = floor_div(price, area);
    Ok(Some((MAX_SCORE - floor_div(per_m2, divisor), format_euros(per_m2))))
}

pub(crate) fn house_price_per_m2(input: &RuleInput<'_>) -> RuleResult {
    price_per_m2(input.property, 15)
}

pub(crate) fn land_price_per_m2(input: &RuleInput<'_>) -> RuleResult {
    price_per_m2(input.property, 10)
}

pub(crate) fn total_area(input: &RuleInput<'_>) -> RuleResult {
    let area = i64::from(input.property.total_area);
    Ok(Some((floor_div(area - 300, 300), format!("{area}m2"))))
}
