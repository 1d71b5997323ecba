//! Axum server carrying the WebSocket endpoint and monitoring routes
//!
//! Each accepted socket is authenticated before any protocol event is
//! processed, then split: a writer task drains the connection's push
//! channel while the read loop feeds frames to the gateway. Cleanup runs
//! exactly once per connection, whichever side closes first.

use crate::error::MatchmakingError;
use crate::metrics::{health_routes, HealthState, MetricsCollector};
use crate::session::{PlayerIdentity, TokenVerifier};
use crate::utils::generate_connection_id;
use crate::ws::events::{ClientEvent, QueueError, ServerEvent};
use crate::ws::handler::MatchmakingGateway;
use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Shared state for the WebSocket endpoint
#[derive(Clone)]
pub struct ServerState {
    pub gateway: Arc<MatchmakingGateway>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub metrics: Arc<MetricsCollector>,
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// Build the full router: WebSocket endpoint plus monitoring routes
pub fn build_router(state: ServerState, health: HealthState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
        .merge(health_routes(health))
}

/// Serve `router` until the shutdown future resolves
pub async fn run_server(
    host: &str,
    port: u16,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid server address")?;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn ws_handler(
    State(state): State<ServerState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let token = extract_token(&query, &headers);
    ws.on_upgrade(move |socket| handle_socket(socket, state, token))
}

/// Bearer token from the `token` query parameter or the Authorization
/// header; the query parameter wins when both are present.
fn extract_token(query: &WsQuery, headers: &HeaderMap) -> Option<String> {
    if let Some(token) = &query.token {
        if !token.is_empty() {
            return Some(token.clone());
        }
    }
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

async fn handle_socket(socket: WebSocket, state: ServerState, token: Option<String>) {
    let identity = match authenticate(&state, token) {
        Ok(identity) => identity,
        Err(err) => {
            state.metrics.record_auth_failure();
            debug!("Handshake rejected: {}", err);
            reject_socket(socket, &err).await;
            return;
        }
    };

    let connection_id = generate_connection_id();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    if let Err(err) = state
        .gateway
        .registry()
        .register(connection_id, identity.clone(), tx)
    {
        warn!("Failed to register connection {}: {}", connection_id, err);
        return;
    }
    state.metrics.record_connection_opened();
    info!(
        "Player {} connected on connection {}",
        identity.player_id, connection_id
    );

    let (mut sink, mut stream) = socket.split();

    // Writer: drains the push channel until the registry entry (the only
    // sender) is dropped.
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    warn!("Failed to serialize server event: {}", err);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    state
                        .gateway
                        .handle_event(connection_id, &identity, event)
                        .await
                }
                Err(err) => {
                    debug!(
                        "Unparseable frame on connection {}: {}",
                        connection_id, err
                    );
                    state.gateway.handle_malformed(connection_id);
                }
            },
            Ok(Message::Binary(_)) => state.gateway.handle_malformed(connection_id),
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                debug!("Connection {} read error: {}", connection_id, err);
                break;
            }
        }
    }

    // Single cleanup point for every exit path of the read loop.
    info!(
        "Player {} disconnected from connection {}",
        identity.player_id, connection_id
    );
    state.gateway.handle_disconnect(connection_id);
    let _ = writer.await;
}

fn authenticate(
    state: &ServerState,
    token: Option<String>,
) -> Result<PlayerIdentity, MatchmakingError> {
    let token = token.ok_or_else(|| MatchmakingError::AuthenticationRequired {
        reason: "Missing bearer token".to_string(),
    })?;
    state.verifier.verify(&token)
}

/// Tell an unauthenticated client why before closing the socket
async fn reject_socket(mut socket: WebSocket, err: &MatchmakingError) {
    let event = ServerEvent::Error(QueueError::from(err));
    if let Ok(text) = serde_json::to_string(&event) {
        let _ = socket.send(Message::Text(text.into())).await;
    }
    let _ = socket.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::AUTHORIZATION;

    fn query(token: Option<&str>) -> WsQuery {
        WsQuery {
            token: token.map(|t| t.to_string()),
        }
    }

    #[test]
    fn test_query_token_preferred() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer header-token".parse().unwrap());

        assert_eq!(
            extract_token(&query(Some("query-token")), &headers),
            Some("query-token".to_string())
        );
    }

    #[test]
    fn test_header_token_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer header-token".parse().unwrap());

        assert_eq!(
            extract_token(&query(None), &headers),
            Some("header-token".to_string())
        );
        // Empty query parameter also falls through
        assert_eq!(
            extract_token(&query(Some("")), &headers),
            Some("header-token".to_string())
        );
    }

    #[test]
    fn test_no_token() {
        let headers = HeaderMap::new();
        assert_eq!(extract_token(&query(None), &headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Basic dXNlcg==".parse().unwrap());
        assert_eq!(extract_token(&query(None), &headers), None);
    }
}
