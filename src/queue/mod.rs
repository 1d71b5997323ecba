//! Waiting-pool management for the matchmaking engine
//!
//! This module owns the queued-player state: the skill index data structure,
//! the opponent-selection algorithm, and the coordinator that exposes atomic
//! queue operations.

pub mod coordinator;
pub mod index;
pub mod matcher;

// Re-export commonly used types
pub use coordinator::{QueueCoordinator, QueueCoordinatorStats};
pub use index::{QueueEntry, SkillIndex};
pub use matcher::{ClosestRatingMatcher, OpponentMatcher};
