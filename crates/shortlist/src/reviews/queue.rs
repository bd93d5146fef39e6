use std::cmp::Reverse;

use serde::Serialize;

use super::status::{ConsensusStatus, UserId};
use crate::listings::PropertyId;
use crate::repository::RepositoryError;

/// Per-user materialized review order. A cache: always reconstructible from
/// properties and reviews.
pub trait QueueCache: Send + Sync {
    fn load(&self, user: UserId) -> Result<Vec<PropertyId>, RepositoryError>;
    /// Swaps the whole queue in one step; readers never see a partial queue.
    fn replace(&self, user: UserId, queue: Vec<PropertyId>) -> Result<(), RepositoryError>;
    fn remove(&self, user: UserId, property: PropertyId) -> Result<bool, RepositoryError>;
    fn push_front(&self, user: UserId, property: PropertyId) -> Result<(), RepositoryError>;
    /// Drops `property` from every user's queue.
    fn purge(&self, property: PropertyId) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueCandidate {
    pub property: PropertyId,
    pub status: ConsensusStatus,
    pub score: u8,
}

/// Descending by (status rank, aggregate score), then ascending id.
pub fn order_queue(mut candidates: Vec<QueueCandidate>) -> Vec<PropertyId> {
    candidates.sort_by_key(|candidate| {
        (
            Reverse(candidate.status.rank()),
            Reverse(candidate.score),
            candidate.property,
        )
    });
    candidates
        .into_iter()
        .map(|candidate| candidate.property)
        .collect()
}

/// The next property up for review and how many are left after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueHead<T> {
    pub property: T,
    pub remaining: usize,
}
