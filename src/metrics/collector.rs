//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the quizmatch matchmaking
//! engine using Prometheus metrics.

use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;

use crate::ws::events::ErrorCode;

/// Main metrics collector for the matchmaking engine
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Connection and protocol metrics
    connection_metrics: ConnectionMetrics,

    /// Queue metrics
    queue_metrics: QueueMetrics,

    /// Match metrics
    match_metrics: MatchMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=healthy)
    pub health_status: IntGauge,
}

/// Connection and protocol metrics
#[derive(Clone)]
pub struct ConnectionMetrics {
    /// Currently open connections
    pub connections_active: IntGauge,

    /// Total connections accepted
    pub connections_total: IntCounter,

    /// Total connections rejected at the handshake
    pub auth_failures_total: IntCounter,

    /// Client events received by kind
    pub events_received_total: IntCounterVec,

    /// Error events emitted by code
    pub errors_emitted_total: IntCounterVec,
}

/// Queue metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Players currently waiting in queue
    pub players_waiting: IntGauge,

    /// Total queue joins
    pub joins_total: IntCounter,

    /// Total explicit leaves
    pub leaves_total: IntCounter,

    /// Total entries expired by the timeout sweep
    pub expired_total: IntCounter,
}

/// Match metrics
#[derive(Clone)]
pub struct MatchMetrics {
    /// Total matches formed
    pub matches_formed_total: IntCounter,

    /// Queue wait before a match, per matched player
    pub match_wait_seconds: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let connection_metrics = ConnectionMetrics::new(&registry)?;
        let queue_metrics = QueueMetrics::new(&registry)?;
        let match_metrics = MatchMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            connection_metrics,
            queue_metrics,
            match_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get connection metrics
    pub fn connection(&self) -> &ConnectionMetrics {
        &self.connection_metrics
    }

    /// Get queue metrics
    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    /// Get match metrics
    pub fn matches(&self) -> &MatchMetrics {
        &self.match_metrics
    }

    pub fn record_connection_opened(&self) {
        self.connection_metrics.connections_total.inc();
        self.connection_metrics.connections_active.inc();
    }

    pub fn record_connection_closed(&self) {
        self.connection_metrics.connections_active.dec();
    }

    pub fn record_auth_failure(&self) {
        self.connection_metrics.auth_failures_total.inc();
    }

    /// Record a client event by kind ("join", "leave", "status")
    pub fn record_event(&self, kind: &str) {
        self.connection_metrics
            .events_received_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn record_error(&self, code: ErrorCode) {
        self.connection_metrics
            .errors_emitted_total
            .with_label_values(&[code.as_str()])
            .inc();
    }

    pub fn record_queue_join(&self) {
        self.queue_metrics.joins_total.inc();
    }

    pub fn record_queue_leave(&self) {
        self.queue_metrics.leaves_total.inc();
    }

    pub fn record_expired(&self, count: usize) {
        self.queue_metrics.expired_total.inc_by(count as u64);
    }

    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_metrics.players_waiting.set(depth as i64);
    }

    /// Record a formed match and both matched players' waits
    pub fn record_match_formed(&self, wait_a_ms: u64, wait_b_ms: u64) {
        self.match_metrics.matches_formed_total.inc();
        self.match_metrics
            .match_wait_seconds
            .observe(wait_a_ms as f64 / 1000.0);
        self.match_metrics
            .match_wait_seconds
            .observe(wait_b_ms as f64 / 1000.0);
    }

    /// Update health status
    pub fn update_health_status(&self, healthy: bool) {
        self.service_metrics
            .health_status
            .set(if healthy { 1 } else { 0 });
    }

    /// Update service uptime
    pub fn set_uptime_seconds(&self, uptime: u64) {
        self.service_metrics.uptime_seconds.set(uptime as i64);
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("quizmatch_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "quizmatch_health_status",
            "Health status (0=unhealthy, 1=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
        })
    }
}

impl ConnectionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let connections_active = IntGauge::new(
            "quizmatch_connections_active",
            "Currently open player connections",
        )?;
        registry.register(Box::new(connections_active.clone()))?;

        let connections_total = IntCounter::new(
            "quizmatch_connections_total",
            "Total player connections accepted",
        )?;
        registry.register(Box::new(connections_total.clone()))?;

        let auth_failures_total = IntCounter::new(
            "quizmatch_auth_failures_total",
            "Connections rejected at the handshake",
        )?;
        registry.register(Box::new(auth_failures_total.clone()))?;

        let events_received_total = IntCounterVec::new(
            Opts::new(
                "quizmatch_events_received_total",
                "Client events received by kind",
            ),
            &["event"],
        )?;
        registry.register(Box::new(events_received_total.clone()))?;

        let errors_emitted_total = IntCounterVec::new(
            Opts::new(
                "quizmatch_errors_emitted_total",
                "Error events emitted by code",
            ),
            &["code"],
        )?;
        registry.register(Box::new(errors_emitted_total.clone()))?;

        Ok(Self {
            connections_active,
            connections_total,
            auth_failures_total,
            events_received_total,
            errors_emitted_total,
        })
    }
}

impl QueueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let players_waiting = IntGauge::new(
            "quizmatch_players_waiting",
            "Players currently waiting in queue",
        )?;
        registry.register(Box::new(players_waiting.clone()))?;

        let joins_total = IntCounter::new("quizmatch_queue_joins_total", "Total queue joins")?;
        registry.register(Box::new(joins_total.clone()))?;

        let leaves_total =
            IntCounter::new("quizmatch_queue_leaves_total", "Total explicit queue leaves")?;
        registry.register(Box::new(leaves_total.clone()))?;

        let expired_total = IntCounter::new(
            "quizmatch_queue_expired_total",
            "Queue entries expired by the timeout sweep",
        )?;
        registry.register(Box::new(expired_total.clone()))?;

        Ok(Self {
            players_waiting,
            joins_total,
            leaves_total,
            expired_total,
        })
    }
}

impl MatchMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let matches_formed_total =
            IntCounter::new("quizmatch_matches_formed_total", "Total matches formed")?;
        registry.register(Box::new(matches_formed_total.clone()))?;

        let match_wait_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "quizmatch_match_wait_seconds",
                "Queue wait before a match, per matched player",
            )
            .buckets(vec![0.5, 1.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
        )?;
        registry.register(Box::new(match_wait_seconds.clone()))?;

        Ok(Self {
            matches_formed_total,
            match_wait_seconds,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}
