//! Configuration management for the quizmatch service
//!
//! This module handles all configuration loading from environment variables,
//! validation, and default values for the matchmaking engine.

pub mod app;

// Re-export commonly used types
pub use app::{
    validate_config, AppConfig, AuthSettings, MatchmakingSettings, ServiceSettings, SubjectEntry,
};
