//! Common types used throughout the matchmaking engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for players
pub type PlayerId = String;

/// Unique identifier for quiz subjects
pub type SubjectId = String;

/// Unique identifier for a live connection
pub type ConnectionId = Uuid;

/// Unique identifier for formed matches
pub type MatchId = Uuid;

/// A player currently waiting in the matchmaking pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitingPlayer {
    pub player_id: PlayerId,
    pub connection_id: ConnectionId,
    pub subject_id: SubjectId,
    pub skill_rating: i32,
    pub joined_at: DateTime<Utc>,
    pub display_name: String,
}

impl WaitingPlayer {
    /// Elapsed wait in milliseconds relative to `now`, saturating at zero.
    pub fn wait_time_ms(&self, now: DateTime<Utc>) -> u64 {
        (now - self.joined_at).num_milliseconds().max(0) as u64
    }
}

/// A quiz subject as known to the subject directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
}

/// The symmetric rating interval currently acceptable for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingWindow {
    pub min: i32,
    pub max: i32,
}

impl RatingWindow {
    pub fn around(rating: i32, range: i32) -> Self {
        Self {
            min: rating - range,
            max: rating + range,
        }
    }

    pub fn contains(&self, rating: i32) -> bool {
        rating >= self.min && rating <= self.max
    }
}

impl Default for RatingWindow {
    fn default() -> Self {
        Self { min: 0, max: 0 }
    }
}

/// Queue membership snapshot returned by status queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatus {
    pub in_queue: bool,
    pub subject_id: Option<SubjectId>,
    pub wait_time_ms: u64,
    pub players_in_queue: usize,
    pub rating_window: RatingWindow,
}

impl QueueStatus {
    /// Snapshot for a player who is not queued
    pub fn absent() -> Self {
        Self {
            in_queue: false,
            subject_id: None,
            wait_time_ms: 0,
            players_in_queue: 0,
            rating_window: RatingWindow::default(),
        }
    }
}

/// The result of pairing two queued players
///
/// Ephemeral: consumed to notify both connections and hand the pairing to
/// the match recorder, then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOffer {
    pub match_id: MatchId,
    pub player_a: WaitingPlayer,
    pub player_b: WaitingPlayer,
    pub subject_id: SubjectId,
}
