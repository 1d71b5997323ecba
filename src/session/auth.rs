//! Bearer-token verification for the connection handshake
//!
//! Connections authenticate with an HS256 bearer token minted by the
//! platform's account service. Verification happens once, before any
//! protocol event is accepted; the resulting identity is pinned to the
//! session for its lifetime.

use crate::error::MatchmakingError;
use crate::types::PlayerId;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Authenticated identity pinned to a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub player_id: PlayerId,
    pub display_name: String,
}

/// Claims carried by a platform bearer token
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Player id
    sub: String,
    /// Display name; falls back to the player id when absent
    username: Option<String>,
    /// Expiry (seconds since epoch)
    exp: usize,
}

/// Trait for token verification
///
/// Seam for substituting verification in tests and local development.
pub trait TokenVerifier: Send + Sync {
    /// Verify a bearer token and return the identity it proves
    fn verify(&self, token: &str) -> Result<PlayerIdentity, MatchmakingError>;
}

/// HS256 verifier backed by a shared secret
pub struct JwtTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn verify(&self, token: &str) -> Result<PlayerIdentity, MatchmakingError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |source| {
                debug!("Token verification failed: {}", source);
                MatchmakingError::AuthenticationRequired {
                    reason: "Invalid or expired token".to_string(),
                }
            },
        )?;

        let claims = data.claims;
        if claims.sub.is_empty() {
            return Err(MatchmakingError::AuthenticationRequired {
                reason: "Token has no subject".to_string(),
            });
        }

        let display_name = claims.username.unwrap_or_else(|| claims.sub.clone());
        Ok(PlayerIdentity {
            player_id: claims.sub,
            display_name,
        })
    }
}

/// Fixed-table verifier for tests and local development
#[derive(Debug, Default)]
pub struct StaticTokenVerifier {
    identities: HashMap<String, PlayerIdentity>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as proof of `player_id`
    pub fn with_token(mut self, token: &str, player_id: &str, display_name: &str) -> Self {
        self.identities.insert(
            token.to_string(),
            PlayerIdentity {
                player_id: player_id.to_string(),
                display_name: display_name.to_string(),
            },
        );
        self
    }
}

impl TokenVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Result<PlayerIdentity, MatchmakingError> {
        self.identities
            .get(token)
            .cloned()
            .ok_or_else(|| MatchmakingError::AuthenticationRequired {
                reason: "Unknown token".to_string(),
            })
    }
}
