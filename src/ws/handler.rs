//! Matchmaking gateway
//!
//! Maps protocol events from authenticated connections onto queue
//! operations and pushes the resulting server events back out through the
//! session registry. Subject and rating lookups happen here, before any
//! queue lock is taken.

use crate::config::MatchmakingSettings;
use crate::directory::{MatchRecorder, SkillStatsProvider, SubjectDirectory};
use crate::error::MatchmakingError;
use crate::metrics::MetricsCollector;
use crate::queue::QueueCoordinator;
use crate::session::{PlayerIdentity, SessionRegistry};
use crate::types::{ConnectionId, MatchOffer, Subject, WaitingPlayer};
use crate::utils::current_timestamp;
use crate::ws::events::{
    ClientEvent, MatchFoundPayload, OpponentInfo, QueueError, ServerEvent,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The protocol-to-queue bridge shared by all connections
pub struct MatchmakingGateway {
    coordinator: Arc<QueueCoordinator>,
    registry: Arc<SessionRegistry>,
    subjects: Arc<dyn SubjectDirectory>,
    stats: Arc<dyn SkillStatsProvider>,
    recorder: Arc<dyn MatchRecorder>,
    metrics: Arc<MetricsCollector>,
    settings: MatchmakingSettings,
}

impl MatchmakingGateway {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        coordinator: Arc<QueueCoordinator>,
        registry: Arc<SessionRegistry>,
        subjects: Arc<dyn SubjectDirectory>,
        stats: Arc<dyn SkillStatsProvider>,
        recorder: Arc<dyn MatchRecorder>,
        metrics: Arc<MetricsCollector>,
        settings: MatchmakingSettings,
    ) -> Self {
        Self {
            coordinator,
            registry,
            subjects,
            stats,
            recorder,
            metrics,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn coordinator(&self) -> &Arc<QueueCoordinator> {
        &self.coordinator
    }

    /// Dispatch one client event.
    ///
    /// Any failure is reported to the originating connection only; other
    /// connections never see another player's errors.
    pub async fn handle_event(
        &self,
        connection_id: ConnectionId,
        identity: &PlayerIdentity,
        event: ClientEvent,
    ) {
        let result = match event {
            ClientEvent::Join { subject_id } => {
                self.metrics.record_event("join");
                self.handle_join(connection_id, identity, &subject_id).await
            }
            ClientEvent::Leave => {
                self.metrics.record_event("leave");
                self.handle_leave(connection_id, identity)
            }
            ClientEvent::Status => {
                self.metrics.record_event("status");
                self.handle_status(connection_id, identity)
            }
        };

        if let Err(err) = result {
            warn!(
                "Event from player {} on connection {} failed: {}",
                identity.player_id, connection_id, err
            );
            self.send_error(connection_id, QueueError::from(&err));
        }
    }

    /// Report a frame that could not be parsed as a client event
    pub fn handle_malformed(&self, connection_id: ConnectionId) {
        debug!("Malformed frame on connection {}", connection_id);
        self.send_error(connection_id, QueueError::internal());
    }

    /// Clean up when a connection closes, whatever the cause.
    ///
    /// Queue removal is idempotent, so racing against a concurrent match or
    /// explicit leave is harmless.
    pub fn handle_disconnect(&self, connection_id: ConnectionId) {
        if let Err(err) = self.registry.unregister(&connection_id) {
            warn!("Failed to unregister connection {}: {}", connection_id, err);
        }
        match self.coordinator.leave_by_connection(&connection_id) {
            Ok(Some(_)) => self.publish_queue_depth(),
            Ok(None) => {}
            Err(err) => warn!(
                "Queue cleanup for connection {} failed: {}",
                connection_id, err
            ),
        }
        self.metrics.record_connection_closed();
    }

    /// Expire stale queue entries and notify the affected connections
    pub fn sweep_expired(&self) {
        let expired = match self.coordinator.expire_stale() {
            Ok(expired) => expired,
            Err(err) => {
                warn!("Queue expiry sweep failed: {}", err);
                return;
            }
        };
        if expired.is_empty() {
            return;
        }

        self.metrics.record_expired(expired.len());
        self.publish_queue_depth();
        for player in expired {
            info!(
                "Player {} timed out of queue for subject {}",
                player.player_id, player.subject_id
            );
            let _ = self
                .registry
                .send_to(&player.connection_id, ServerEvent::Left);
        }
    }

    async fn handle_join(
        &self,
        connection_id: ConnectionId,
        identity: &PlayerIdentity,
        subject_id: &str,
    ) -> Result<(), MatchmakingError> {
        let subject = self
            .subjects
            .get_subject(subject_id)
            .await
            .map_err(|source| MatchmakingError::InternalError {
                message: format!("subject lookup failed: {}", source),
            })?
            .ok_or_else(|| MatchmakingError::InvalidSubject {
                subject_id: subject_id.to_string(),
            })?;

        let skill_rating = self
            .stats
            .rating_for(&identity.player_id, subject_id)
            .await
            .map_err(|source| MatchmakingError::InternalError {
                message: format!("rating lookup failed: {}", source),
            })?
            .unwrap_or(self.settings.default_rating);

        self.coordinator.join(WaitingPlayer {
            player_id: identity.player_id.clone(),
            connection_id,
            subject_id: subject.id.clone(),
            skill_rating,
            joined_at: current_timestamp(),
            display_name: identity.display_name.clone(),
        })?;
        self.metrics.record_queue_join();
        self.publish_queue_depth();

        let status = self.coordinator.status(&identity.player_id)?;
        let _ = self
            .registry
            .send_to(&connection_id, ServerEvent::Joined(status));

        if let Some(offer) = self.coordinator.try_match(&identity.player_id)? {
            self.deliver_match(offer, subject);
        }
        Ok(())
    }

    fn handle_leave(
        &self,
        connection_id: ConnectionId,
        identity: &PlayerIdentity,
    ) -> Result<(), MatchmakingError> {
        self.coordinator.leave(&identity.player_id)?;
        self.metrics.record_queue_leave();
        self.publish_queue_depth();
        let _ = self.registry.send_to(&connection_id, ServerEvent::Left);
        Ok(())
    }

    fn handle_status(
        &self,
        connection_id: ConnectionId,
        identity: &PlayerIdentity,
    ) -> Result<(), MatchmakingError> {
        let status = self.coordinator.status(&identity.player_id)?;
        let _ = self
            .registry
            .send_to(&connection_id, ServerEvent::StatusUpdate(status));
        Ok(())
    }

    /// Notify both matched connections and hand the pairing to the recorder.
    ///
    /// Recording runs detached; a recorder failure never blocks or unwinds
    /// the match the players were already told about.
    fn deliver_match(&self, offer: MatchOffer, subject: Subject) {
        let now = current_timestamp();
        self.metrics.record_match_formed(
            offer.player_a.wait_time_ms(now),
            offer.player_b.wait_time_ms(now),
        );
        self.publish_queue_depth();

        for (recipient, opponent) in [
            (&offer.player_a, &offer.player_b),
            (&offer.player_b, &offer.player_a),
        ] {
            let payload = MatchFoundPayload {
                match_id: offer.match_id,
                opponent: OpponentInfo {
                    id: opponent.player_id.clone(),
                    username: opponent.display_name.clone(),
                    skill_rating: opponent.skill_rating,
                },
                subject: subject.clone(),
            };
            let delivered = self
                .registry
                .send_to(&recipient.connection_id, ServerEvent::MatchFound(payload))
                .unwrap_or(false);
            if !delivered {
                warn!(
                    "Could not deliver match {} to player {}",
                    offer.match_id, recipient.player_id
                );
            }
        }

        let recorder = Arc::clone(&self.recorder);
        tokio::spawn(async move {
            if let Err(err) = recorder.record(&offer).await {
                warn!("Failed to record match {}: {}", offer.match_id, err);
            }
        });
    }

    fn send_error(&self, connection_id: ConnectionId, error: QueueError) {
        self.metrics.record_error(error.code);
        let _ = self
            .registry
            .send_to(&connection_id, ServerEvent::Error(error));
    }

    fn publish_queue_depth(&self) {
        if let Ok(depth) = self.coordinator.queue_len() {
            self.metrics.set_queue_depth(depth);
        }
    }
}
