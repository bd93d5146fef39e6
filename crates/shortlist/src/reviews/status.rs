use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::listings::PropertyId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u32);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Household member taking part in the reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// A single user's verdict on a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Accepted,
    Rejected,
    Unsure,
}

impl ReviewStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewStatus::Accepted => "accepted",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::Unsure => "unsure",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid review status '{0}' (expected accepted, rejected or unsure)")]
pub struct InvalidReviewStatus(pub String);

impl FromStr for ReviewStatus {
    type Err = InvalidReviewStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "accepted" | "accept" => Ok(Self::Accepted),
            "rejected" | "reject" => Ok(Self::Rejected),
            "unsure" => Ok(Self::Unsure),
            _ => Err(InvalidReviewStatus(value.to_string())),
        }
    }
}

/// At most one per (user, property).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub user: UserId,
    pub property: PropertyId,
    pub status: ReviewStatus,
    pub reviewed_at: DateTime<Utc>,
}

/// Household-wide verdict on a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusStatus {
    Pending,
    Accepted,
    Rejected,
    Controversial,
}

impl ConsensusStatus {
    /// Sort key only: accepted > controversial > pending > rejected.
    pub const fn rank(self) -> u8 {
        match self {
            ConsensusStatus::Accepted => 4,
            ConsensusStatus::Controversial => 3,
            ConsensusStatus::Pending => 2,
            ConsensusStatus::Rejected => 1,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ConsensusStatus::Pending => "pending",
            ConsensusStatus::Accepted => "accepted",
            ConsensusStatus::Rejected => "rejected",
            ConsensusStatus::Controversial => "controversial",
        }
    }
}

impl fmt::Display for ConsensusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn status_rank(status: ConsensusStatus) -> u8 {
    status.rank()
}

/// Pending until every household member reviewed; then unanimous verdicts
/// win and anything else is controversial.
pub fn consensus_status<I>(statuses: I, household_size: usize) -> ConsensusStatus
where
    I: IntoIterator<Item = ReviewStatus>,
{
    let statuses: Vec<ReviewStatus> = statuses.into_iter().collect();
    if household_size == 0 || statuses.len() < household_size {
        return ConsensusStatus::Pending;
    }

    if statuses.iter().all(|status| *status == ReviewStatus::Accepted) {
        ConsensusStatus::Accepted
    } else if statuses.iter().all(|status| *status == ReviewStatus::Rejected) {
        ConsensusStatus::Rejected
    } else {
        ConsensusStatus::Controversial
    }
}
