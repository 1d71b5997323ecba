//! Per-subject skill rating lookups

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Trait for fetching a player's skill rating in a subject
///
/// `Ok(None)` means the player has no history for the subject yet; the
/// caller substitutes the configured default rating.
#[async_trait]
pub trait SkillStatsProvider: Send + Sync {
    async fn rating_for(&self, player_id: &str, subject_id: &str) -> Result<Option<i32>>;
}

/// In-memory rating table keyed by (player, subject)
#[derive(Debug, Default)]
pub struct InMemorySkillStats {
    ratings: Mutex<HashMap<(String, String), i32>>,
}

impl InMemorySkillStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rating(&self, player_id: &str, subject_id: &str, rating: i32) {
        if let Ok(mut ratings) = self.ratings.lock() {
            ratings.insert((player_id.to_string(), subject_id.to_string()), rating);
        }
    }
}

#[async_trait]
impl SkillStatsProvider for InMemorySkillStats {
    async fn rating_for(&self, player_id: &str, subject_id: &str) -> Result<Option<i32>> {
        let ratings = self
            .ratings
            .lock()
            .map_err(|_| anyhow::anyhow!("Failed to acquire ratings lock"))?;
        Ok(ratings
            .get(&(player_id.to_string(), subject_id.to_string()))
            .copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rating_lookup_and_absence() {
        let stats = InMemorySkillStats::new();
        stats.set_rating("p1", "math", 1450);

        assert_eq!(stats.rating_for("p1", "math").await.unwrap(), Some(1450));
        assert_eq!(stats.rating_for("p1", "history").await.unwrap(), None);
        assert_eq!(stats.rating_for("p2", "math").await.unwrap(), None);
    }
}
