//! Metrics and health monitoring

pub mod collector;
pub mod health;

// Re-export commonly used types
pub use collector::MetricsCollector;
pub use health::{health_routes, HealthState};
