//! Health check and Prometheus metrics endpoints
//!
//! HTTP endpoints for liveness, readiness, Prometheus scraping, and a
//! human-readable stats page. These routes share the axum server with the
//! WebSocket endpoint.

use crate::metrics::collector::MetricsCollector;
use crate::queue::QueueCoordinator;
use crate::session::SessionRegistry;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Shared state for the health endpoints
#[derive(Clone)]
pub struct HealthState {
    pub metrics: Arc<MetricsCollector>,
    pub coordinator: Arc<QueueCoordinator>,
    pub registry: Arc<SessionRegistry>,
    pub started_at: Instant,
}

/// Build the router for all monitoring endpoints
pub fn health_routes(state: HealthState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/alive", get(alive_handler))
        .route("/metrics", get(metrics_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
}

/// Root endpoint handler - shows service information
async fn root_handler() -> impl IntoResponse {
    let info = json!({
        "service": "quizmatch",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/ws",
            "/health",
            "/alive",
            "/metrics",
            "/stats"
        ]
    });

    Json(info)
}

/// Lightweight health check endpoint handler
///
/// Healthy means the queue state is reachable; a poisoned lock is the one
/// internal fault this surface can detect.
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    debug!("Health check requested");

    match state.coordinator.queue_len() {
        Ok(_) => {
            state.metrics.update_health_status(true);
            (
                StatusCode::OK,
                Json(json!({
                    "status": "healthy",
                    "service": "quizmatch",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
        }
        Err(err) => {
            error!("Health check failed: {}", err);
            state.metrics.update_health_status(false);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "quizmatch",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
        }
    }
}

/// Liveness check endpoint handler
async fn alive_handler() -> impl IntoResponse {
    (StatusCode::OK, "Alive")
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<HealthState>) -> impl IntoResponse {
    debug!("Metrics endpoint requested");

    state
        .metrics
        .set_uptime_seconds(state.started_at.elapsed().as_secs());

    let registry = state.metrics.registry();
    let metric_families = registry.gather();
    let encoder = TextEncoder::new();

    match encoder.encode_to_string(&metric_families) {
        Ok(metrics_output) => {
            debug!("Serving {} metric families", metric_families.len());

            Response::builder()
                .status(StatusCode::OK)
                .header("content-type", encoder.format_type())
                .body(metrics_output)
                .unwrap()
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);

            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body("Failed to encode metrics".to_string())
                .unwrap()
        }
    }
}

/// Detailed service statistics endpoint handler (for debugging/human consumption)
async fn stats_handler(State(state): State<HealthState>) -> impl IntoResponse {
    debug!("Stats endpoint requested");

    let queue_stats = state.coordinator.stats();
    let connections = state.registry.active_connections();

    match (queue_stats, connections) {
        (Ok(queue), Ok(connections)) => {
            let stats = json!({
                "service": {
                    "name": "quizmatch",
                    "version": env!("CARGO_PKG_VERSION"),
                    "uptime_seconds": state.started_at.elapsed().as_secs()
                },
                "connections": {
                    "active": connections
                },
                "queue": {
                    "players_waiting": queue.players_waiting,
                    "players_joined": queue.players_joined,
                    "players_left": queue.players_left,
                    "disconnect_removals": queue.disconnect_removals,
                    "entries_expired": queue.entries_expired,
                    "matches_formed": queue.matches_formed
                },
                "timestamp": chrono::Utc::now()
            });

            (StatusCode::OK, Json(stats))
        }
        (queue_stats, connections) => {
            if let Err(e) = queue_stats {
                error!("Failed to get queue stats: {}", e);
            }
            if let Err(e) = connections {
                error!("Failed to get connection count: {}", e);
            }

            let error_response = json!({
                "service": {
                    "name": "quizmatch",
                    "version": env!("CARGO_PKG_VERSION"),
                    "status": "error"
                },
                "error": "Failed to get service stats",
                "timestamp": chrono::Utc::now()
            });

            (StatusCode::SERVICE_UNAVAILABLE, Json(error_response))
        }
    }
}
