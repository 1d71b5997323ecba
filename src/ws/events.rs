//! Wire-format events
//!
//! Every frame is a JSON envelope of the form
//! `{"event": "<name>", "data": { ... }}`; events that carry no payload
//! omit the `data` member.

use crate::error::MatchmakingError;
use crate::types::{MatchId, QueueStatus, Subject, SubjectId};
use serde::{Deserialize, Serialize};

/// Events a client may send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Enter the queue for one subject
    Join { subject_id: SubjectId },
    /// Leave the queue
    Leave,
    /// Request a queue membership snapshot
    Status,
}

/// Events the server pushes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Join confirmed; carries the initial queue snapshot
    Joined(QueueStatus),
    /// Queue membership ended without a match (explicit leave or expiry)
    Left,
    /// Response to a status request
    StatusUpdate(QueueStatus),
    /// A match was formed; sent to each matched connection
    MatchFound(MatchFoundPayload),
    /// An operation failed
    Error(QueueError),
}

/// The opponent as presented to a matched player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpponentInfo {
    pub id: String,
    pub username: String,
    pub skill_rating: i32,
}

/// Payload of a `match_found` event, written from the recipient's
/// perspective
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchFoundPayload {
    pub match_id: MatchId,
    pub opponent: OpponentInfo,
    pub subject: Subject,
}

/// Machine-readable error codes carried by `error` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AlreadyInQueue,
    NotInQueue,
    InvalidSubject,
    AuthenticationRequired,
    InternalError,
}

impl ErrorCode {
    /// Wire spelling, also used as a metrics label
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AlreadyInQueue => "ALREADY_IN_QUEUE",
            ErrorCode::NotInQueue => "NOT_IN_QUEUE",
            ErrorCode::InvalidSubject => "INVALID_SUBJECT",
            ErrorCode::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// Payload of an `error` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueError {
    pub code: ErrorCode,
    pub message: String,
}

impl QueueError {
    pub fn internal() -> Self {
        Self {
            code: ErrorCode::InternalError,
            message: "Internal server error".to_string(),
        }
    }
}

impl From<&MatchmakingError> for QueueError {
    fn from(err: &MatchmakingError) -> Self {
        let code = match err {
            MatchmakingError::AlreadyQueued { .. } => ErrorCode::AlreadyInQueue,
            MatchmakingError::NotQueued { .. } => ErrorCode::NotInQueue,
            MatchmakingError::InvalidSubject { .. } => ErrorCode::InvalidSubject,
            MatchmakingError::AuthenticationRequired { .. } => ErrorCode::AuthenticationRequired,
            MatchmakingError::ConfigurationError { .. } | MatchmakingError::InternalError { .. } => {
                return Self::internal();
            }
        };
        Self {
            code,
            message: err.to_string(),
        }
    }
}
