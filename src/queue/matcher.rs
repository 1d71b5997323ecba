//! Opponent selection over the skill index
//!
//! The acceptable rating window starts narrow and relaxes the longer a
//! player waits; among in-window candidates the closest rating wins, with
//! ties going to whoever has waited longer.

use crate::config::MatchmakingSettings;
use crate::queue::index::{QueueEntry, SkillIndex};
use crate::types::{PlayerId, RatingWindow};
use crate::utils::rating_difference;
use chrono::{DateTime, Utc};

/// Trait for opponent selection algorithms
///
/// Seam for swapping the linear scan for a rating-sorted structure if
/// subject pools ever grow large.
pub trait OpponentMatcher: Send + Sync {
    /// Pick the best opponent for `requester` among players queued for the
    /// same subject, or `None` if nobody is in-window.
    fn find_opponent(
        &self,
        index: &SkillIndex,
        requester: &QueueEntry,
        now: DateTime<Utc>,
    ) -> Option<PlayerId>;

    /// The window a player with `skill_rating` gets after waiting `wait_ms`
    fn current_window(&self, skill_rating: i32, wait_ms: u64) -> RatingWindow;
}

/// Default matcher: wait-relaxed window plus closest-rating linear scan
#[derive(Debug, Clone)]
pub struct ClosestRatingMatcher {
    settings: MatchmakingSettings,
}

impl ClosestRatingMatcher {
    pub fn new(settings: MatchmakingSettings) -> Self {
        Self { settings }
    }

    /// Window half-width after `wait_ms` of waiting
    fn range_for_wait(&self, wait_ms: u64) -> i32 {
        let expansions = (wait_ms / self.settings.expansion_interval_ms) as i32;
        let expanded = self.settings.initial_range
            + expansions.saturating_mul(self.settings.range_expansion_step);
        expanded.min(self.settings.max_range)
    }
}

impl OpponentMatcher for ClosestRatingMatcher {
    fn find_opponent(
        &self,
        index: &SkillIndex,
        requester: &QueueEntry,
        now: DateTime<Utc>,
    ) -> Option<PlayerId> {
        let player = &requester.player;
        if index.subject_pool_size(&player.subject_id) < 2 {
            return None;
        }

        let window = self.current_window(player.skill_rating, player.wait_time_ms(now));

        let mut best: Option<&QueueEntry> = None;
        for candidate in index.candidates_for(&player.subject_id) {
            if candidate.player.player_id == player.player_id {
                continue;
            }
            if !window.contains(candidate.player.skill_rating) {
                continue;
            }

            let replace = match best {
                None => true,
                Some(current) => {
                    let candidate_diff =
                        rating_difference(player.skill_rating, candidate.player.skill_rating);
                    let current_diff =
                        rating_difference(player.skill_rating, current.player.skill_rating);

                    // Closest rating wins; ties prefer the longer-waiting
                    // candidate, then insertion order.
                    candidate_diff < current_diff
                        || (candidate_diff == current_diff
                            && (candidate.player.joined_at, candidate.seq)
                                < (current.player.joined_at, current.seq))
                }
            };
            if replace {
                best = Some(candidate);
            }
        }

        best.map(|entry| entry.player.player_id.clone())
    }

    fn current_window(&self, skill_rating: i32, wait_ms: u64) -> RatingWindow {
        RatingWindow::around(skill_rating, self.range_for_wait(wait_ms))
    }
}
