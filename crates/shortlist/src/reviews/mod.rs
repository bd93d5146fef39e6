//! Household reviews, consensus status and the per-user review queue.

pub mod queue;
pub mod status;

pub use queue::{order_queue, QueueCache, QueueCandidate, QueueHead};
pub use status::{
    consensus_status, status_rank, ConsensusStatus, InvalidReviewStatus, Review, ReviewStatus,
    User, UserId,
};
