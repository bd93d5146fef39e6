//! Real-estate shortlisting core: the criterion registry and scoring rules,
//! the per-listing score store, the aggregate scorer, household reviews and
//! the per-user review queue.

pub mod config;
pub mod criteria;
pub mod error;
pub mod import;
pub mod listings;
pub mod memory;
pub mod repository;
pub mod reviews;
pub mod router;
pub mod scoring;
pub mod service;
pub mod telemetry;

pub use criteria::{
    CriterionDefinition, CriterionError, CriterionId, CriterionRegistry, CriterionUpdate,
    NewCriterion, NoTravelTimes, TravelTime, TravelTimeLookup, TravelTimeTable,
};
pub use error::AppError;
pub use import::{ImportError, ListingImporter};
pub use listings::{Applicability, InformationKey, NewProperty, Property, PropertyId, PropertyKind};
pub use memory::{InMemoryQueueCache, InMemoryStore};
pub use repository::{RepositoryError, ShortlistRepository};
pub use reviews::{ConsensusStatus, QueueCache, Review, ReviewStatus, User, UserId};
pub use router::shortlist_router;
pub use scoring::{CriterionScore, CriterionView, PropertyAssessment};
pub use service::{
    CatalogSync, EditableField, FieldKind, IngestReport, ReviewDetail, ShortlistError,
    ShortlistService,
};
