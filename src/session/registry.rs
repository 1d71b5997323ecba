//! Live-connection registry
//!
//! Maps connection ids to their authenticated identity and outbound push
//! channel. The writer half of each socket drains the channel, so any task
//! can deliver an event to a specific connection without touching the
//! socket itself.

use crate::error::MatchmakingError;
use crate::session::auth::PlayerIdentity;
use crate::types::ConnectionId;
use crate::ws::events::ServerEvent;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// State held for one live connection
#[derive(Debug, Clone)]
pub struct ConnectionSession {
    pub identity: PlayerIdentity,
    pub sender: UnboundedSender<ServerEvent>,
}

/// Registry of all live connections
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ConnectionId, ConnectionSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authenticated connection and its push channel
    pub fn register(
        &self,
        connection_id: ConnectionId,
        identity: PlayerIdentity,
        sender: UnboundedSender<ServerEvent>,
    ) -> Result<(), MatchmakingError> {
        let mut sessions = self.lock()?;
        sessions.insert(connection_id, ConnectionSession { identity, sender });
        debug!("Registered connection {}", connection_id);
        Ok(())
    }

    /// Remove a connection; idempotent
    pub fn unregister(&self, connection_id: &ConnectionId) -> Result<Option<ConnectionSession>, MatchmakingError> {
        let mut sessions = self.lock()?;
        let removed = sessions.remove(connection_id);
        if removed.is_some() {
            debug!("Unregistered connection {}", connection_id);
        }
        Ok(removed)
    }

    /// Identity behind a connection, if still live
    pub fn identity(&self, connection_id: &ConnectionId) -> Result<Option<PlayerIdentity>, MatchmakingError> {
        let sessions = self.lock()?;
        Ok(sessions.get(connection_id).map(|s| s.identity.clone()))
    }

    /// Push an event to one connection.
    ///
    /// Returns `false` when the connection is gone or its writer has shut
    /// down; losing a race with disconnect is not an error.
    pub fn send_to(
        &self,
        connection_id: &ConnectionId,
        event: ServerEvent,
    ) -> Result<bool, MatchmakingError> {
        let sessions = self.lock()?;
        match sessions.get(connection_id) {
            Some(session) => match session.sender.send(event) {
                Ok(()) => Ok(true),
                Err(_) => {
                    debug!("Dropped event for closing connection {}", connection_id);
                    Ok(false)
                }
            },
            None => Ok(false),
        }
    }

    /// Number of live connections
    pub fn active_connections(&self) -> Result<usize, MatchmakingError> {
        Ok(self.lock()?.len())
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<ConnectionId, ConnectionSession>>, MatchmakingError>
    {
        self.sessions
            .lock()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire session registry lock".to_string(),
            })
    }
}
