//! Formed-match reporting
//!
//! Once both players have been offered a match the engine hands the pairing
//! off to the platform's game service. Reporting runs off the hot path;
//! failures are logged, never surfaced to the matched players.

use crate::error::Result;
use crate::types::{MatchId, MatchOffer};
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

/// Trait for reporting formed matches downstream
#[async_trait]
pub trait MatchRecorder: Send + Sync {
    async fn record(&self, offer: &MatchOffer) -> Result<()>;
}

/// Recorder that only writes to the service log
#[derive(Debug, Default)]
pub struct LoggingMatchRecorder;

impl LoggingMatchRecorder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MatchRecorder for LoggingMatchRecorder {
    async fn record(&self, offer: &MatchOffer) -> Result<()> {
        info!(
            "Recorded match {}: {} vs {} in subject {}",
            offer.match_id, offer.player_a.player_id, offer.player_b.player_id, offer.subject_id
        );
        Ok(())
    }
}

/// Recorder that captures match ids for test assertions
#[derive(Debug, Default)]
pub struct RecordingMatchRecorder {
    recorded: Mutex<Vec<MatchId>>,
}

impl RecordingMatchRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<MatchId> {
        self.recorded
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MatchRecorder for RecordingMatchRecorder {
    async fn record(&self, offer: &MatchOffer) -> Result<()> {
        self.recorded
            .lock()
            .map_err(|_| anyhow::anyhow!("Failed to acquire recorder lock"))?
            .push(offer.match_id);
        Ok(())
    }
}
