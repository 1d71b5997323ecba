//! Service orchestration

pub mod app;

// Re-export commonly used types
pub use app::{AppState, ServiceError};
