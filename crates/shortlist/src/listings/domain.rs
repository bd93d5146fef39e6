use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::catalog::InformationKey;

/// Identifier wrapper for stored listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub u64);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Listing type tag. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    House,
    Land,
}

impl PropertyKind {
    pub const fn label(self) -> &'static str {
        match self {
            PropertyKind::House => "house",
            PropertyKind::Land => "land",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "house" | "huis" | "woning" => Some(Self::House),
            "land" | "grond" | "bouwgrond" => Some(Self::Land),
            _ => None,
        }
    }
}

/// Which listing types a criterion or information category covers.
///
/// At least one flag is always set; the constructor and the deserializer both
/// refuse an empty set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ApplicabilityFlags", into = "ApplicabilityFlags")]
pub struct Applicability {
    house: bool,
    land: bool,
}

impl Applicability {
    pub const HOUSE: Self = Self {
        house: true,
        land: false,
    };
    pub const LAND: Self = Self {
        house: false,
        land: true,
    };
    pub const BOTH: Self = Self {
        house: true,
        land: true,
    };

    pub const fn new(house: bool, land: bool) -> Option<Self> {
        if house || land {
            Some(Self { house, land })
        } else {
            None
        }
    }

    pub const fn house(self) -> bool {
        self.house
    }

    pub const fn land(self) -> bool {
        self.land
    }

    pub const fn includes(self, kind: PropertyKind) -> bool {
        match kind {
            PropertyKind::House => self.house,
            PropertyKind::Land => self.land,
        }
    }
}

/// Wire shape of [`Applicability`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ApplicabilityFlags {
    pub applies_to_house: bool,
    pub applies_to_land: bool,
}

impl TryFrom<ApplicabilityFlags> for Applicability {
    type Error = &'static str;

    fn try_from(value: ApplicabilityFlags) -> Result<Self, Self::Error> {
        Applicability::new(value.applies_to_house, value.applies_to_land)
            .ok_or("a criterion must apply to houses, land, or both")
    }
}

impl From<Applicability> for ApplicabilityFlags {
    fn from(value: Applicability) -> Self {
        Self {
            applies_to_house: value.house,
            applies_to_land: value.land,
        }
    }
}

/// Listing as handed over by the scraper or a bulk import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProperty {
    pub kind: PropertyKind,
    pub address: String,
    #[serde(default)]
    pub seller: Option<String>,
    pub price: u32,
    pub total_area: u32,
    #[serde(default)]
    pub inhabitable_area: Option<u32>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub added_on: Option<NaiveDate>,
    /// Raw scraper fields, keyed by catalog key, display name or portal label.
    #[serde(default)]
    pub information: BTreeMap<String, String>,
    #[serde(default)]
    pub features: Vec<String>,
}

/// A stored house or land parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    kind: PropertyKind,
    pub address: String,
    pub seller: Option<String>,
    pub price: u32,
    pub total_area: u32,
    inhabitable_area: Option<u32>,
    pub source_url: Option<String>,
    pub added_on: Option<NaiveDate>,
    pub sold: bool,
    information: BTreeMap<InformationKey, String>,
    pub features: BTreeSet<String>,
}

impl Property {
    /// Builds the stored listing. Information must already be resolved
    /// against the catalog; entries that do not apply to `kind` are dropped.
    pub fn new(
        id: PropertyId,
        listing: NewProperty,
        information: BTreeMap<InformationKey, String>,
    ) -> Self {
        let kind = listing.kind;
        let mut property = Self {
            id,
            kind,
            address: listing.address.trim().to_string(),
            seller: listing.seller.filter(|seller| !seller.trim().is_empty()),
            price: listing.price,
            total_area: listing.total_area,
            inhabitable_area: match kind {
                PropertyKind::House => listing.inhabitable_area,
                PropertyKind::Land => None,
            },
            source_url: listing.source_url.filter(|url| !url.trim().is_empty()),
            added_on: listing.added_on,
            sold: false,
            information: BTreeMap::new(),
            features: listing
                .features
                .into_iter()
                .map(|feature| feature.trim().to_string())
                .filter(|feature| !feature.is_empty())
                .collect(),
        };

        for (key, value) in information {
            property.set_information(key, Some(value));
        }
        property
    }

    pub const fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub const fn inhabitable_area(&self) -> Option<u32> {
        self.inhabitable_area
    }

    /// Typed accessor over the information bag.
    pub fn get_information(&self, key: InformationKey) -> Option<&str> {
        self.information.get(&key).map(String::as_str)
    }

    pub fn information(&self) -> impl Iterator<Item = (InformationKey, &str)> + '_ {
        self.information
            .iter()
            .map(|(key, value)| (*key, value.as_str()))
    }

    /// Stores or clears a value. Blank values clear the entry, as do keys
    /// that do not apply to this listing's kind. Returns whether the bag changed.
    pub fn set_information(&mut self, key: InformationKey, value: Option<String>) -> bool {
        let value = value
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .filter(|_| key.category().applies_to.includes(self.kind));

        match value {
            Some(value) => self.information.insert(key, value.clone()) != Some(value),
            None => self.information.remove(&key).is_some(),
        }
    }

    /// Last word of the address, which is the municipality for Belgian listings.
    pub fn town(&self) -> &str {
        self.address.split_whitespace().last().unwrap_or_default()
    }
}
