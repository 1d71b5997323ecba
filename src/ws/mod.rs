//! WebSocket protocol surface
//!
//! Wire-format event types, the gateway that maps protocol events onto
//! queue operations, and the axum server that carries the persistent
//! connections plus the operational HTTP endpoints.

pub mod events;
pub mod handler;
pub mod server;

// Re-export commonly used types
pub use events::{ClientEvent, ErrorCode, MatchFoundPayload, OpponentInfo, QueueError, ServerEvent};
pub use handler::MatchmakingGateway;
pub use server::{build_router, run_server, ServerState};
