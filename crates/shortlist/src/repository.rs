use crate::criteria::{CriterionDefinition, CriterionId};
use crate::listings::{Property, PropertyId};
use crate::reviews::{Review, User, UserId};
use crate::scoring::CriterionScore;

/// Storage abstraction over users, listings, criteria, score rows and reviews
/// so the service can be exercised without a database.
pub trait ShortlistRepository: Send + Sync {
    fn insert_user(&self, username: &str) -> Result<User, RepositoryError>;
    fn users(&self) -> Result<Vec<User>, RepositoryError>;
    fn user_by_name(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    fn next_property_id(&self) -> Result<PropertyId, RepositoryError>;
    /// Conflicts on a reused id or listing URL.
    fn insert_property(&self, property: Property) -> Result<Property, RepositoryError>;
    fn update_property(&self, property: Property) -> Result<(), RepositoryError>;
    fn fetch_property(&self, id: PropertyId) -> Result<Option<Property>, RepositoryError>;
    fn properties(&self) -> Result<Vec<Property>, RepositoryError>;
    /// Removes the property with its score rows and reviews.
    fn delete_property(&self, id: PropertyId) -> Result<Property, RepositoryError>;

    fn next_criterion_id(&self) -> Result<CriterionId, RepositoryError>;
    /// Conflicts on a reused id or key.
    fn insert_criterion(&self, criterion: CriterionDefinition) -> Result<(), RepositoryError>;
    fn update_criterion(&self, criterion: CriterionDefinition) -> Result<(), RepositoryError>;
    fn fetch_criterion(&self, id: CriterionId)
        -> Result<Option<CriterionDefinition>, RepositoryError>;
    fn criteria(&self) -> Result<Vec<CriterionDefinition>, RepositoryError>;
    /// Removes the criterion with its score rows.
    fn delete_criterion(&self, id: CriterionId) -> Result<CriterionDefinition, RepositoryError>;

    fn upsert_score(&self, score: CriterionScore) -> Result<(), RepositoryError>;
    fn fetch_score(
        &self,
        property: PropertyId,
        criterion: CriterionId,
    ) -> Result<Option<CriterionScore>, RepositoryError>;
    fn scores_for(&self, property: PropertyId) -> Result<Vec<CriterionScore>, RepositoryError>;

    /// Returns the review it replaced, if any.
    fn upsert_review(&self, review: Review) -> Result<Option<Review>, RepositoryError>;
    fn delete_review(
        &self,
        user: UserId,
        property: PropertyId,
    ) -> Result<Option<Review>, RepositoryError>;
    fn reviews_for(&self, property: PropertyId) -> Result<Vec<Review>, RepositoryError>;
    fn reviews_by(&self, user: UserId) -> Result<Vec<Review>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
