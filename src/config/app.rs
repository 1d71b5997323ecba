//! Main application configuration
//!
//! This module defines the primary configuration structures for the quizmatch
//! matchmaking engine, including environment variable loading and validation.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub auth: AuthSettings,
    pub matchmaking: MatchmakingSettings,
    /// Quiz subject catalog; overridable per deployment via the config file
    #[serde(default = "default_subjects")]
    pub subjects: Vec<SubjectEntry>,
}

/// One entry of the subject catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectEntry {
    pub id: String,
    pub name: String,
}

fn default_subjects() -> Vec<SubjectEntry> {
    [
        ("general-knowledge", "General Knowledge"),
        ("science", "Science"),
        ("history", "History"),
        ("geography", "Geography"),
        ("sports", "Sports"),
    ]
    .into_iter()
    .map(|(id, name)| SubjectEntry {
        id: id.to_string(),
        name: name.to_string(),
    })
    .collect()
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Host to bind the WebSocket/health server to
    pub host: String,
    /// Port for the WebSocket and health endpoints
    pub port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Token verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Shared secret for HS256 bearer tokens
    pub jwt_secret: String,
}

/// Matchmaking-specific settings
///
/// The window parameters mirror the rating-range relaxation: a player's
/// acceptable window starts at `initial_range` and grows by
/// `range_expansion_step` every `expansion_interval_ms`, capped at
/// `max_range`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchmakingSettings {
    /// Rating window half-width at join time
    pub initial_range: i32,
    /// Window growth per expansion interval
    pub range_expansion_step: i32,
    /// How often the window expands, in milliseconds
    pub expansion_interval_ms: u64,
    /// Upper bound on the window half-width
    pub max_range: i32,
    /// Queue entries older than this are expired; 0 disables the sweep
    pub queue_timeout_ms: u64,
    /// How often the expiry sweep runs, in seconds
    pub sweep_interval_seconds: u64,
    /// Rating assigned to players with no history for a subject
    pub default_rating: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceSettings::default(),
            auth: AuthSettings::default(),
            matchmaking: MatchmakingSettings::default(),
            subjects: default_subjects(),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "quizmatch".to_string(),
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me".to_string(),
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            initial_range: 100,
            range_expansion_step: 50,
            expansion_interval_ms: 10_000,
            max_range: 400,
            queue_timeout_ms: 120_000, // 2 minutes
            sweep_interval_seconds: 5,
            default_rating: 1200,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(host) = env::var("BIND_HOST") {
            config.service.host = host;
        }
        if let Ok(port) = env::var("PORT") {
            config.service.port = port
                .parse()
                .map_err(|_| anyhow!("Invalid PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Auth settings
        if let Ok(secret) = env::var("JWT_SECRET") {
            config.auth.jwt_secret = secret;
        }

        // Matchmaking settings
        if let Ok(range) = env::var("INITIAL_RATING_RANGE") {
            config.matchmaking.initial_range = range
                .parse()
                .map_err(|_| anyhow!("Invalid INITIAL_RATING_RANGE value: {}", range))?;
        }
        if let Ok(step) = env::var("RATING_RANGE_EXPANSION_STEP") {
            config.matchmaking.range_expansion_step = step
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_RANGE_EXPANSION_STEP value: {}", step))?;
        }
        if let Ok(interval) = env::var("RANGE_EXPANSION_INTERVAL_MS") {
            config.matchmaking.expansion_interval_ms = interval
                .parse()
                .map_err(|_| anyhow!("Invalid RANGE_EXPANSION_INTERVAL_MS value: {}", interval))?;
        }
        if let Ok(max) = env::var("MAX_RATING_RANGE") {
            config.matchmaking.max_range = max
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_RATING_RANGE value: {}", max))?;
        }
        if let Ok(timeout) = env::var("QUEUE_TIMEOUT_MS") {
            config.matchmaking.queue_timeout_ms = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid QUEUE_TIMEOUT_MS value: {}", timeout))?;
        }
        if let Ok(interval) = env::var("QUEUE_SWEEP_INTERVAL_SECONDS") {
            config.matchmaking.sweep_interval_seconds = interval
                .parse()
                .map_err(|_| anyhow!("Invalid QUEUE_SWEEP_INTERVAL_SECONDS value: {}", interval))?;
        }
        if let Ok(rating) = env::var("DEFAULT_RATING") {
            config.matchmaking.default_rating = rating
                .parse()
                .map_err(|_| anyhow!("Invalid DEFAULT_RATING value: {}", rating))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get expiry sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.matchmaking.sweep_interval_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.port == 0 {
        return Err(anyhow!("Service port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    if config.auth.jwt_secret.is_empty() {
        return Err(anyhow!("JWT secret cannot be empty"));
    }

    if config.matchmaking.initial_range <= 0 {
        return Err(anyhow!("Initial rating range must be positive"));
    }
    if config.matchmaking.range_expansion_step < 0 {
        return Err(anyhow!("Rating range expansion step cannot be negative"));
    }
    if config.matchmaking.expansion_interval_ms == 0 {
        return Err(anyhow!("Range expansion interval must be greater than 0"));
    }
    if config.matchmaking.max_range < config.matchmaking.initial_range {
        return Err(anyhow!(
            "Max rating range ({}) cannot be smaller than the initial range ({})",
            config.matchmaking.max_range,
            config.matchmaking.initial_range
        ));
    }
    if config.matchmaking.queue_timeout_ms > 0 && config.matchmaking.sweep_interval_seconds == 0 {
        return Err(anyhow!(
            "Queue sweep interval must be greater than 0 when a queue timeout is set"
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for subject in &config.subjects {
        if subject.id.is_empty() {
            return Err(anyhow!("Subject catalog contains an empty id"));
        }
        if !seen.insert(&subject.id) {
            return Err(anyhow!("Duplicate subject id in catalog: {}", subject.id));
        }
    }

    Ok(())
}
