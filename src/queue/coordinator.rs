//! Queue coordinator: atomic operations over the skill index
//!
//! The coordinator is the single owner of the skill index. Every public
//! operation takes the one mutex for its full duration, so no caller ever
//! observes a partially applied mutation. Nothing here awaits or performs
//! I/O while the lock is held; collaborator lookups happen at the protocol
//! boundary before these calls.

use crate::config::MatchmakingSettings;
use crate::error::MatchmakingError;
use crate::queue::index::SkillIndex;
use crate::queue::matcher::{ClosestRatingMatcher, OpponentMatcher};
use crate::types::{ConnectionId, MatchOffer, QueueStatus, WaitingPlayer};
use crate::utils::{current_timestamp, generate_match_id};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Statistics about coordinator operations
#[derive(Debug, Clone, Default)]
pub struct QueueCoordinatorStats {
    /// Total number of successful joins
    pub players_joined: u64,
    /// Total number of explicit leaves
    pub players_left: u64,
    /// Total number of disconnect removals
    pub disconnect_removals: u64,
    /// Total number of entries expired by the timeout sweep
    pub entries_expired: u64,
    /// Total number of matches formed
    pub matches_formed: u64,
    /// Current number of players waiting
    pub players_waiting: usize,
}

/// The single authoritative owner of the waiting pool
pub struct QueueCoordinator {
    index: Mutex<SkillIndex>,
    matcher: Box<dyn OpponentMatcher>,
    settings: MatchmakingSettings,
    stats: Mutex<QueueCoordinatorStats>,
}

impl QueueCoordinator {
    /// Create a coordinator with the default closest-rating matcher
    pub fn new(settings: MatchmakingSettings) -> Self {
        let matcher = Box::new(ClosestRatingMatcher::new(settings.clone()));
        Self::with_matcher(settings, matcher)
    }

    /// Create a coordinator with a custom matcher
    pub fn with_matcher(settings: MatchmakingSettings, matcher: Box<dyn OpponentMatcher>) -> Self {
        Self {
            index: Mutex::new(SkillIndex::new()),
            matcher,
            settings,
            stats: Mutex::new(QueueCoordinatorStats::default()),
        }
    }

    pub fn settings(&self) -> &MatchmakingSettings {
        &self.settings
    }

    /// Add a player to the pool.
    ///
    /// No match attempt happens here; callers confirm the join first and
    /// then call `try_match` as a separate step.
    pub fn join(&self, player: WaitingPlayer) -> Result<(), MatchmakingError> {
        let mut index = self.lock_index()?;
        index.insert(player.clone())?;

        let waiting = index.len();
        drop(index);

        info!(
            "Player {} joined queue for subject {} (rating: {})",
            player.player_id, player.subject_id, player.skill_rating
        );
        self.update_stats(|stats| {
            stats.players_joined += 1;
            stats.players_waiting = waiting;
        });
        Ok(())
    }

    /// Run one match attempt for a queued player.
    ///
    /// On success both players are removed from the index before the offer
    /// is returned, so no concurrent attempt can pair either of them again.
    /// Returns `Ok(None)` when the player is not queued or nobody is
    /// in-window; the caller stays queued in the latter case.
    pub fn try_match(&self, player_id: &str) -> Result<Option<MatchOffer>, MatchmakingError> {
        let now = current_timestamp();
        let mut index = self.lock_index()?;

        let requester = match index.get(player_id) {
            Some(entry) => entry,
            None => {
                debug!("Match attempt for unqueued player {}", player_id);
                return Ok(None);
            }
        };

        let opponent_id = match self.matcher.find_opponent(&index, requester, now) {
            Some(id) => id,
            None => return Ok(None),
        };

        // Both removals happen under the same lock acquisition.
        let player_a = index.remove(player_id).ok_or_else(|| {
            MatchmakingError::InternalError {
                message: format!("matched player {} vanished from index", player_id),
            }
        })?;
        let player_b = index.remove(&opponent_id).ok_or_else(|| {
            MatchmakingError::InternalError {
                message: format!("matched opponent {} vanished from index", opponent_id),
            }
        })?;
        let waiting = index.len();
        drop(index);

        let offer = MatchOffer {
            match_id: generate_match_id(),
            subject_id: player_a.subject_id.clone(),
            player_a,
            player_b,
        };

        info!(
            "Match {} formed: {} ({}) vs {} ({}) in subject {}",
            offer.match_id,
            offer.player_a.player_id,
            offer.player_a.skill_rating,
            offer.player_b.player_id,
            offer.player_b.skill_rating,
            offer.subject_id
        );
        self.update_stats(|stats| {
            stats.matches_formed += 1;
            stats.players_waiting = waiting;
        });
        Ok(Some(offer))
    }

    /// Remove a player who explicitly left the queue
    pub fn leave(&self, player_id: &str) -> Result<WaitingPlayer, MatchmakingError> {
        let mut index = self.lock_index()?;
        let player = index
            .remove(player_id)
            .ok_or_else(|| MatchmakingError::NotQueued {
                player_id: player_id.to_string(),
            })?;
        let waiting = index.len();
        drop(index);

        info!("Player {} left queue", player.player_id);
        self.update_stats(|stats| {
            stats.players_left += 1;
            stats.players_waiting = waiting;
        });
        Ok(player)
    }

    /// Remove whatever queue membership a closing connection holds.
    ///
    /// Returns `None` for connections that never queued — the normal case —
    /// and leaves the index untouched.
    pub fn leave_by_connection(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<Option<WaitingPlayer>, MatchmakingError> {
        let mut index = self.lock_index()?;
        let player_id = match index.resolve_by_connection(connection_id) {
            Some(id) => id,
            None => return Ok(None),
        };
        let player = index.remove(&player_id);
        let waiting = index.len();
        drop(index);

        if let Some(player) = &player {
            info!(
                "Player {} disconnected, removed from queue",
                player.player_id
            );
            self.update_stats(|stats| {
                stats.disconnect_removals += 1;
                stats.players_waiting = waiting;
            });
        }
        Ok(player)
    }

    /// Snapshot a player's queue membership
    pub fn status(&self, player_id: &str) -> Result<QueueStatus, MatchmakingError> {
        let now = current_timestamp();
        let index = self.lock_index()?;

        let entry = match index.get(player_id) {
            Some(entry) => entry,
            None => return Ok(QueueStatus::absent()),
        };

        let wait_time_ms = entry.player.wait_time_ms(now);
        Ok(QueueStatus {
            in_queue: true,
            subject_id: Some(entry.player.subject_id.clone()),
            wait_time_ms,
            players_in_queue: index.subject_pool_size(&entry.player.subject_id),
            rating_window: self
                .matcher
                .current_window(entry.player.skill_rating, wait_time_ms),
        })
    }

    /// Remove and return entries older than `queue_timeout_ms`.
    ///
    /// No-op when the timeout is configured as 0.
    pub fn expire_stale(&self) -> Result<Vec<WaitingPlayer>, MatchmakingError> {
        if self.settings.queue_timeout_ms == 0 {
            return Ok(Vec::new());
        }

        let now = current_timestamp();
        let mut index = self.lock_index()?;
        let stale = index.stale_players(now, self.settings.queue_timeout_ms);
        let expired: Vec<WaitingPlayer> = stale
            .iter()
            .filter_map(|player_id| index.remove(player_id))
            .collect();
        let waiting = index.len();
        drop(index);

        if !expired.is_empty() {
            warn!("Expired {} stale queue entries", expired.len());
            self.update_stats(|stats| {
                stats.entries_expired += expired.len() as u64;
                stats.players_waiting = waiting;
            });
        }
        Ok(expired)
    }

    /// Current number of queued players
    pub fn queue_len(&self) -> Result<usize, MatchmakingError> {
        Ok(self.lock_index()?.len())
    }

    /// Get current coordinator statistics
    pub fn stats(&self) -> Result<QueueCoordinatorStats, MatchmakingError> {
        self.stats
            .lock()
            .map(|stats| stats.clone())
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })
    }

    fn lock_index(&self) -> Result<std::sync::MutexGuard<'_, SkillIndex>, MatchmakingError> {
        self.index
            .lock()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire queue index lock".to_string(),
            })
    }

    fn update_stats(&self, update: impl FnOnce(&mut QueueCoordinatorStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            update(&mut stats);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generate_connection_id;
    use chrono::Duration;

    fn test_coordinator() -> QueueCoordinator {
        QueueCoordinator::new(MatchmakingSettings::default())
    }

    fn test_player(player_id: &str, subject_id: &str, rating: i32) -> WaitingPlayer {
        WaitingPlayer {
            player_id: player_id.to_string(),
            connection_id: generate_connection_id(),
            subject_id: subject_id.to_string(),
            skill_rating: rating,
            joined_at: current_timestamp(),
            display_name: player_id.to_string(),
        }
    }

    #[test]
    fn test_join_then_duplicate_join_fails() {
        let coordinator = test_coordinator();
        coordinator.join(test_player("p1", "math", 1200)).unwrap();

        let err = coordinator
            .join(test_player("p1", "math", 1200))
            .unwrap_err();
        assert!(matches!(err, MatchmakingError::AlreadyQueued { .. }));
        assert_eq!(coordinator.queue_len().unwrap(), 1);
    }

    #[test]
    fn test_join_does_not_match_synchronously() {
        let coordinator = test_coordinator();
        coordinator.join(test_player("a", "math", 1200)).unwrap();
        coordinator.join(test_player("b", "math", 1250)).unwrap();

        // Both still queued until somebody runs a match attempt
        assert!(coordinator.status("a").unwrap().in_queue);
        assert!(coordinator.status("b").unwrap().in_queue);
    }

    #[test]
    fn test_try_match_removes_both_players() {
        let coordinator = test_coordinator();
        coordinator.join(test_player("a", "math", 1200)).unwrap();
        coordinator.join(test_player("b", "math", 1250)).unwrap();

        let offer = coordinator.try_match("a").unwrap().expect("match expected");
        let ids = [
            offer.player_a.player_id.clone(),
            offer.player_b.player_id.clone(),
        ];
        assert!(ids.contains(&"a".to_string()));
        assert!(ids.contains(&"b".to_string()));
        assert_ne!(offer.player_a.player_id, offer.player_b.player_id);

        assert_eq!(coordinator.queue_len().unwrap(), 0);
        assert!(!coordinator.status("a").unwrap().in_queue);
        assert!(!coordinator.status("b").unwrap().in_queue);

        // A second attempt finds nobody
        assert!(coordinator.try_match("a").unwrap().is_none());
    }

    #[test]
    fn test_try_match_out_of_window_keeps_players_queued() {
        let coordinator = test_coordinator();
        coordinator.join(test_player("a", "math", 1200)).unwrap();
        coordinator.join(test_player("c", "math", 1500)).unwrap();

        assert!(coordinator.try_match("a").unwrap().is_none());
        assert!(coordinator.try_match("c").unwrap().is_none());
        assert_eq!(coordinator.queue_len().unwrap(), 2);
    }

    #[test]
    fn test_try_match_for_unqueued_player() {
        let coordinator = test_coordinator();
        assert!(coordinator.try_match("ghost").unwrap().is_none());
    }

    #[test]
    fn test_leave_requires_membership() {
        let coordinator = test_coordinator();
        let err = coordinator.leave("p1").unwrap_err();
        assert!(matches!(err, MatchmakingError::NotQueued { .. }));

        coordinator.join(test_player("p1", "math", 1200)).unwrap();
        coordinator.leave("p1").unwrap();
        assert_eq!(coordinator.queue_len().unwrap(), 0);
    }

    #[test]
    fn test_leave_by_connection_without_membership() {
        let coordinator = test_coordinator();
        let unknown = generate_connection_id();
        assert!(coordinator.leave_by_connection(&unknown).unwrap().is_none());
        assert_eq!(coordinator.queue_len().unwrap(), 0);
    }

    #[test]
    fn test_disconnect_clears_membership() {
        let coordinator = test_coordinator();
        let player = test_player("p1", "math", 1200);
        let connection_id = player.connection_id;
        coordinator.join(player).unwrap();

        let removed = coordinator.leave_by_connection(&connection_id).unwrap();
        assert_eq!(removed.unwrap().player_id, "p1");
        assert!(!coordinator.status("p1").unwrap().in_queue);

        // Second cleanup for the same connection is a no-op
        assert!(coordinator
            .leave_by_connection(&connection_id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_status_snapshot() {
        let coordinator = test_coordinator();

        let absent = coordinator.status("p1").unwrap();
        assert!(!absent.in_queue);
        assert_eq!(absent.players_in_queue, 0);
        assert_eq!(absent.rating_window, crate::types::RatingWindow::default());

        coordinator.join(test_player("p1", "math", 1200)).unwrap();
        coordinator.join(test_player("p2", "math", 1600)).unwrap();

        let status = coordinator.status("p1").unwrap();
        assert!(status.in_queue);
        assert_eq!(status.subject_id.as_deref(), Some("math"));
        assert_eq!(status.players_in_queue, 2);
        assert_eq!(status.rating_window.min, 1100);
        assert_eq!(status.rating_window.max, 1300);
    }

    #[test]
    fn test_expire_stale_entries() {
        let coordinator = test_coordinator();
        let mut stale = test_player("old", "math", 1200);
        stale.joined_at = current_timestamp() - Duration::seconds(180);
        coordinator.join(stale).unwrap();
        coordinator.join(test_player("fresh", "math", 1250)).unwrap();

        let expired = coordinator.expire_stale().unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].player_id, "old");
        assert!(coordinator.status("fresh").unwrap().in_queue);
        assert_eq!(coordinator.stats().unwrap().entries_expired, 1);
    }

    #[test]
    fn test_expire_disabled_when_timeout_zero() {
        let mut settings = MatchmakingSettings::default();
        settings.queue_timeout_ms = 0;
        let coordinator = QueueCoordinator::new(settings);

        let mut stale = test_player("old", "math", 1200);
        stale.joined_at = current_timestamp() - Duration::days(1);
        coordinator.join(stale).unwrap();

        assert!(coordinator.expire_stale().unwrap().is_empty());
        assert_eq!(coordinator.queue_len().unwrap(), 1);
    }

    #[test]
    fn test_stats_tracking() {
        let coordinator = test_coordinator();
        coordinator.join(test_player("a", "math", 1200)).unwrap();
        coordinator.join(test_player("b", "math", 1250)).unwrap();
        coordinator.try_match("a").unwrap();

        let stats = coordinator.stats().unwrap();
        assert_eq!(stats.players_joined, 2);
        assert_eq!(stats.matches_formed, 1);
        assert_eq!(stats.players_waiting, 0);
    }
}
