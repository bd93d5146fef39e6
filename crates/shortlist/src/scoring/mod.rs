//! Criterion score rows and the aggregate property scorer.

pub mod aggregate;
pub mod store;

pub use aggregate::{assess, weighted_score, CriterionView, PropertyAssessment};
pub use store::{
    compute_default, ensure_default, manual_score_in_range, recompute_default, CriterionScore,
    DealbreakerOutcome,
};
