//! Quizmatch - real-time skill-based matchmaking for competitive quizzes
//!
//! This crate pairs players of comparable skill for head-to-head quiz
//! matches over persistent WebSocket connections, with a rating window
//! that relaxes the longer a player waits.

pub mod config;
pub mod directory;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod service;
pub mod session;
pub mod types;
pub mod utils;
pub mod ws;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use queue::{OpponentMatcher, QueueCoordinator};
pub use ws::MatchmakingGateway;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
