//! Listings as stored by the shortlist: the property record, its typed
//! information bag, and the fixed catalog of information categories.

pub mod catalog;
pub mod domain;

pub use catalog::{categories, InformationCategory, InformationKey};
pub use domain::{Applicability, NewProperty, Property, PropertyId, PropertyKind};
