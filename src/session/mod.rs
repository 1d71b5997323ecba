//! Connection session management
//!
//! Tracks which authenticated player is behind each live connection and
//! provides the push channel used to deliver server events to a specific
//! connection.

pub mod auth;
pub mod registry;

// Re-export commonly used types
pub use auth::{JwtTokenVerifier, PlayerIdentity, StaticTokenVerifier, TokenVerifier};
pub use registry::{ConnectionSession, SessionRegistry};
