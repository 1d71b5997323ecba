//! Error types for the matchmaking engine
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Player already in queue: {player_id}")]
    AlreadyQueued { player_id: String },

    #[error("Player not in queue: {player_id}")]
    NotQueued { player_id: String },

    #[error("Unknown subject: {subject_id}")]
    InvalidSubject { subject_id: String },

    #[error("Authentication required: {reason}")]
    AuthenticationRequired { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
