//! Skill index: the waiting-player pool
//!
//! Three mutually consistent mappings over the same population: the
//! authoritative `player_id → entry` store, a `subject_id → players` index
//! scoped for candidate scans, and a `connection_id → player_id` index for
//! disconnect resolution. Every mutation updates all three together.

use crate::error::MatchmakingError;
use crate::types::{ConnectionId, PlayerId, SubjectId, WaitingPlayer};
use std::collections::{HashMap, HashSet};

/// A pool entry that preserves insertion order for tie-breaking
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub player: WaitingPlayer,
    /// Monotonic insertion sequence; lower = queued earlier
    pub seq: u64,
}

/// In-memory index over all waiting players
///
/// Not internally synchronized; the queue coordinator owns the only instance
/// and serializes access.
#[derive(Debug, Default)]
pub struct SkillIndex {
    /// Authoritative store
    players: HashMap<PlayerId, QueueEntry>,
    /// Candidate scan scope per subject
    subjects: HashMap<SubjectId, HashSet<PlayerId>>,
    /// Disconnect resolution
    connections: HashMap<ConnectionId, PlayerId>,
    next_seq: u64,
}

impl SkillIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player to all three mappings.
    ///
    /// Fails with `AlreadyQueued` if the player already holds a queue slot;
    /// the index is unchanged in that case.
    pub fn insert(&mut self, player: WaitingPlayer) -> Result<(), MatchmakingError> {
        if self.players.contains_key(&player.player_id) {
            return Err(MatchmakingError::AlreadyQueued {
                player_id: player.player_id.clone(),
            });
        }

        self.subjects
            .entry(player.subject_id.clone())
            .or_default()
            .insert(player.player_id.clone());
        self.connections
            .insert(player.connection_id, player.player_id.clone());

        let seq = self.next_seq;
        self.next_seq += 1;
        self.players
            .insert(player.player_id.clone(), QueueEntry { player, seq });

        Ok(())
    }

    /// Remove a player from all three mappings.
    ///
    /// Idempotent: removing an absent id is a no-op, which tolerates
    /// duplicate disconnect/leave races.
    pub fn remove(&mut self, player_id: &str) -> Option<WaitingPlayer> {
        let entry = self.players.remove(player_id)?;

        if let Some(pool) = self.subjects.get_mut(&entry.player.subject_id) {
            pool.remove(player_id);
            if pool.is_empty() {
                self.subjects.remove(&entry.player.subject_id);
            }
        }
        self.connections.remove(&entry.player.connection_id);

        Some(entry.player)
    }

    /// Look up a queued player by id
    pub fn get(&self, player_id: &str) -> Option<&QueueEntry> {
        self.players.get(player_id)
    }

    /// All queued entries for a subject, the requester included
    pub fn candidates_for<'a>(
        &'a self,
        subject_id: &str,
    ) -> impl Iterator<Item = &'a QueueEntry> {
        self.subjects
            .get(subject_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.players.get(id))
    }

    /// Resolve a connection to its queued player, if any
    pub fn resolve_by_connection(&self, connection_id: &ConnectionId) -> Option<PlayerId> {
        self.connections.get(connection_id).cloned()
    }

    /// Number of players queued for one subject
    pub fn subject_pool_size(&self, subject_id: &str) -> usize {
        self.subjects.get(subject_id).map_or(0, |pool| pool.len())
    }

    /// Total number of queued players
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Players whose wait exceeds `timeout_ms` as of `now`
    pub fn stale_players(&self, now: chrono::DateTime<chrono::Utc>, timeout_ms: u64) -> Vec<PlayerId> {
        self.players
            .values()
            .filter(|entry| entry.player.wait_time_ms(now) > timeout_ms)
            .map(|entry| entry.player.player_id.clone())
            .collect()
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        use std::collections::HashSet as Set;

        // Every player appears in exactly one subject pool and one connection slot
        for (player_id, entry) in &self.players {
            assert_eq!(player_id, &entry.player.player_id);
            let pool = self
                .subjects
                .get(&entry.player.subject_id)
                .unwrap_or_else(|| panic!("missing subject pool for {}", player_id));
            assert!(pool.contains(player_id));
            assert_eq!(
                self.connections.get(&entry.player.connection_id),
                Some(player_id)
            );
        }

        // Nothing in the secondary/tertiary mappings lacks a primary entry
        let mut seen = Set::new();
        for (subject_id, pool) in &self.subjects {
            assert!(!pool.is_empty(), "empty pool retained for {}", subject_id);
            for player_id in pool {
                let entry = self.players.get(player_id).expect("orphaned pool member");
                assert_eq!(&entry.player.subject_id, subject_id);
                assert!(seen.insert(player_id.clone()), "player in two pools");
            }
        }
        assert_eq!(self.connections.len(), self.players.len());
    }
}
