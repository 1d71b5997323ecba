//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the queue
//! coordinator, session registry, gateway, and HTTP server together and
//! owns the background tasks.

use crate::config::AppConfig;
use crate::directory::{
    InMemorySkillStats, LoggingMatchRecorder, MatchRecorder, SkillStatsProvider,
    StaticSubjectDirectory, SubjectDirectory,
};
use crate::metrics::{HealthState, MetricsCollector};
use crate::queue::QueueCoordinator;
use crate::session::{JwtTokenVerifier, SessionRegistry, TokenVerifier};
use crate::ws::handler::MatchmakingGateway;
use crate::ws::server::{build_router, run_server, ServerState};
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Platform collaborators the gateway talks to.
///
/// Production deployments swap these for implementations backed by the
/// platform services.
pub struct Collaborators {
    pub subjects: Arc<dyn SubjectDirectory>,
    pub stats: Arc<dyn SkillStatsProvider>,
    pub recorder: Arc<dyn MatchRecorder>,
}

impl Collaborators {
    /// In-memory collaborators: catalog from config, default ratings, and
    /// log-only match recording.
    pub fn in_memory(config: &AppConfig) -> Self {
        let mut subjects = StaticSubjectDirectory::new();
        for entry in &config.subjects {
            subjects = subjects.with_subject(&entry.id, &entry.name);
        }
        Self {
            subjects: Arc::new(subjects),
            stats: Arc::new(InMemorySkillStats::new()),
            recorder: Arc::new(LoggingMatchRecorder::new()),
        }
    }
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Core matchmaking components
    gateway: Arc<MatchmakingGateway>,
    coordinator: Arc<QueueCoordinator>,
    registry: Arc<SessionRegistry>,

    /// Monitoring
    metrics: Arc<MetricsCollector>,

    /// Handshake authentication
    verifier: Arc<dyn TokenVerifier>,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    /// Shutdown broadcast to background tasks and the server
    shutdown_tx: broadcast::Sender<()>,

    /// Service status
    is_running: Arc<RwLock<bool>>,

    started_at: Instant,
}

impl AppState {
    /// Initialize the application with the given platform collaborators
    pub fn new(config: AppConfig, collaborators: Collaborators) -> Result<Self, ServiceError> {
        info!("Initializing quizmatch matchmaking engine");
        info!(
            "Configuration: service={}, bind={}:{}",
            config.service.name, config.service.host, config.service.port
        );

        let metrics = Arc::new(MetricsCollector::new().map_err(|source| {
            ServiceError::Initialization {
                message: format!("metrics setup failed: {}", source),
            }
        })?);

        let coordinator = Arc::new(QueueCoordinator::new(config.matchmaking.clone()));
        let registry = Arc::new(SessionRegistry::new());
        let verifier: Arc<dyn TokenVerifier> =
            Arc::new(JwtTokenVerifier::new(&config.auth.jwt_secret));

        let gateway = Arc::new(MatchmakingGateway::new(
            Arc::clone(&coordinator),
            Arc::clone(&registry),
            collaborators.subjects,
            collaborators.stats,
            collaborators.recorder,
            Arc::clone(&metrics),
            config.matchmaking.clone(),
        ));

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            gateway,
            coordinator,
            registry,
            metrics,
            verifier,
            background_tasks: Vec::new(),
            shutdown_tx,
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        })
    }

    /// Start the server and background tasks
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting quizmatch service");

        self.background_tasks.push(self.spawn_sweep_task());
        self.background_tasks.push(self.spawn_server_task());

        *self.is_running.write().await = true;
        info!("Service started");
        Ok(())
    }

    /// Stop the server and background tasks
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down quizmatch service");
        *self.is_running.write().await = false;

        if self.shutdown_tx.send(()).is_err() {
            warn!("No running tasks were listening for shutdown");
        }

        let timeout = self.config.shutdown_timeout();
        for task in self.background_tasks.drain(..) {
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!("Background task ended with error: {}", err),
                Err(_) => warn!("Background task did not stop within {:?}", timeout),
            }
        }

        info!("Shutdown complete");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn gateway(&self) -> &Arc<MatchmakingGateway> {
        &self.gateway
    }

    pub fn coordinator(&self) -> &Arc<QueueCoordinator> {
        &self.coordinator
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// One-line operational summary for periodic logging
    pub fn status_line(&self) -> String {
        let waiting = self.coordinator.queue_len().unwrap_or(0);
        let connections = self.registry.active_connections().unwrap_or(0);
        let stats = self.coordinator.stats().unwrap_or_default();
        format!(
            "{} connections, {} waiting, {} matches formed",
            connections, waiting, stats.matches_formed
        )
    }

    /// Periodic queue-timeout sweep
    fn spawn_sweep_task(&self) -> JoinHandle<()> {
        let gateway = Arc::clone(&self.gateway);
        let interval = self.config.sweep_interval();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => gateway.sweep_expired(),
                    _ = shutdown_rx.recv() => {
                        info!("Queue sweep task stopping");
                        break;
                    }
                }
            }
        })
    }

    /// WebSocket plus monitoring HTTP server
    fn spawn_server_task(&self) -> JoinHandle<()> {
        let server_state = ServerState {
            gateway: Arc::clone(&self.gateway),
            verifier: Arc::clone(&self.verifier),
            metrics: Arc::clone(&self.metrics),
        };
        let health_state = HealthState {
            metrics: Arc::clone(&self.metrics),
            coordinator: Arc::clone(&self.coordinator),
            registry: Arc::clone(&self.registry),
            started_at: self.started_at,
        };
        let router = build_router(server_state, health_state);
        let host = self.config.service.host.clone();
        let port = self.config.service.port;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.recv().await;
            };
            if let Err(err) = run_server(&host, port, router, shutdown).await {
                error!("Server task failed: {}", err);
            }
        })
    }
}
