//! Bulk listing import from portal CSV exports.
//!
//! Fixed columns: `type,address,price,total_area,inhabitable_area,url,seller,features`
//! (plus an optional `added_on` date). Every other column is treated as an
//! information field and handed to the service under its original header, so
//! portal labels such as `Bouwjaar` resolve against the category catalog.

mod normalizer;
mod parser;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use tracing::warn;

use crate::listings::{NewProperty, PropertyKind};

use parser::RawListing;

const FIXED_COLUMNS: [&str; 9] = [
    "type",
    "address",
    "price",
    "total_area",
    "inhabitable_area",
    "url",
    "seller",
    "features",
    "added_on",
];

const REQUIRED_COLUMNS: [&str; 4] = ["type", "address", "price", "total_area"];

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingColumn(&'static str),
    InvalidValue {
        line: u64,
        column: &'static str,
        value: String,
    },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read listing export: {}", err),
            ImportError::Csv(err) => write!(f, "invalid listing CSV data: {}", err),
            ImportError::MissingColumn(column) => {
                write!(f, "listing export has no '{}' column", column)
            }
            ImportError::InvalidValue {
                line,
                column,
                value,
            } => write!(f, "line {}: invalid {} '{}'", line, column, value),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::MissingColumn(_) | ImportError::InvalidValue { .. } => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct ListingImporter;

impl ListingImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<NewProperty>, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parses every row; rows without an address are skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<NewProperty>, ImportError> {
        let (headers, rows) = parser::parse_rows(reader)?;
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|header| header == column) {
                return Err(ImportError::MissingColumn(column));
            }
        }

        let mut listings = Vec::with_capacity(rows.len());
        for row in rows {
            if row.is_blank() || row.value("address").is_none() {
                warn!(line = row.line, "skipping listing row without an address");
                continue;
            }
            listings.push(listing_from_row(&row)?);
        }
        Ok(listings)
    }
}

fn listing_from_row(row: &RawListing) -> Result<NewProperty, ImportError> {
    let invalid = |column: &'static str, value: &str| ImportError::InvalidValue {
        line: row.line,
        column,
        value: value.to_string(),
    };
    let amount = |column: &'static str| -> Result<Option<u32>, ImportError> {
        row.value(column)
            .map(|raw| normalizer::parse_amount(raw).ok_or_else(|| invalid(column, raw)))
            .transpose()
    };

    let raw_kind = row.value("type").unwrap_or_default();
    let kind = PropertyKind::parse(raw_kind).ok_or_else(|| invalid("type", raw_kind))?;
    let added_on = row
        .value("added_on")
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid("added_on", raw))
        })
        .transpose()?;

    let information: BTreeMap<String, String> = row
        .cells
        .iter()
        .filter(|(_, normalized, _)| !FIXED_COLUMNS.contains(&normalized.as_str()))
        .map(|(header, _, value)| (header.clone(), value.clone()))
        .collect();

    Ok(NewProperty {
        kind,
        address: row.value("address").unwrap_or_default().to_string(),
        seller: row.value("seller").map(str::to_string),
        price: amount("price")?.unwrap_or_default(),
        total_area: amount("total_area")?.unwrap_or_default(),
        inhabitable_area: amount("inhabitable_area")?,
        source_url: row.value("url").map(str::to_string),
        added_on,
        information,
        features: row
            .value("features")
            .map(normalizer::split_features)
            .unwrap_or_default(),
    })
}
