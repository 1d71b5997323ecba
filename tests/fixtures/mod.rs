//! Test fixtures and harness helpers for integration testing

use quizmatch::config::MatchmakingSettings;
use quizmatch::directory::{
    InMemorySkillStats, MatchRecorder, RecordingMatchRecorder, SkillStatsProvider,
    StaticSubjectDirectory,
};
use quizmatch::metrics::MetricsCollector;
use quizmatch::queue::QueueCoordinator;
use quizmatch::session::{PlayerIdentity, SessionRegistry};
use quizmatch::types::{ConnectionId, MatchId};
use quizmatch::utils::generate_connection_id;
use quizmatch::ws::{ClientEvent, MatchmakingGateway, ServerEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

/// A complete in-memory matchmaking system
pub struct TestSystem {
    pub gateway: Arc<MatchmakingGateway>,
    pub stats: Arc<InMemorySkillStats>,
    pub recorder: Arc<RecordingMatchRecorder>,
}

/// Create a test system with the default window schedule
pub fn create_test_system() -> TestSystem {
    create_test_system_with(MatchmakingSettings::default())
}

/// Create a test system with custom matchmaking settings
pub fn create_test_system_with(settings: MatchmakingSettings) -> TestSystem {
    let stats = Arc::new(InMemorySkillStats::new());
    let recorder = Arc::new(RecordingMatchRecorder::new());
    let subjects = Arc::new(
        StaticSubjectDirectory::new()
            .with_subject("science", "Science")
            .with_subject("history", "History"),
    );

    let gateway = Arc::new(MatchmakingGateway::new(
        Arc::new(QueueCoordinator::new(settings.clone())),
        Arc::new(SessionRegistry::new()),
        subjects,
        Arc::clone(&stats) as Arc<dyn SkillStatsProvider>,
        Arc::clone(&recorder) as Arc<dyn MatchRecorder>,
        Arc::new(MetricsCollector::new().expect("metrics collector")),
        settings,
    ));

    TestSystem {
        gateway,
        stats,
        recorder,
    }
}

/// A connected test player: registered session plus its event receiver
pub struct TestClient {
    pub connection_id: ConnectionId,
    pub identity: PlayerIdentity,
    rx: UnboundedReceiver<ServerEvent>,
}

impl TestClient {
    /// Register a new connection for `player_id`
    pub fn connect(system: &TestSystem, player_id: &str) -> Self {
        let connection_id = generate_connection_id();
        let identity = PlayerIdentity {
            player_id: player_id.to_string(),
            display_name: player_id.to_string(),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        system
            .gateway
            .registry()
            .register(connection_id, identity.clone(), tx)
            .expect("register connection");

        Self {
            connection_id,
            identity,
            rx,
        }
    }

    pub async fn join(&self, system: &TestSystem, subject_id: &str) {
        system
            .gateway
            .handle_event(
                self.connection_id,
                &self.identity,
                ClientEvent::Join {
                    subject_id: subject_id.to_string(),
                },
            )
            .await;
    }

    pub async fn leave(&self, system: &TestSystem) {
        system
            .gateway
            .handle_event(self.connection_id, &self.identity, ClientEvent::Leave)
            .await;
    }

    pub async fn status(&self, system: &TestSystem) {
        system
            .gateway
            .handle_event(self.connection_id, &self.identity, ClientEvent::Status)
            .await;
    }

    pub fn disconnect(&self, system: &TestSystem) {
        system.gateway.handle_disconnect(self.connection_id);
    }

    /// Next already-delivered event, if any
    pub fn next_event(&mut self) -> Option<ServerEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// All already-delivered events
    pub fn drain_events(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event() {
            events.push(event);
        }
        events
    }
}

/// Wait for the detached recorder task to observe at least `count` matches
pub async fn wait_for_recorded(recorder: &RecordingMatchRecorder, count: usize) -> Vec<MatchId> {
    for _ in 0..100 {
        let recorded = recorder.recorded();
        if recorded.len() >= count {
            return recorded;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    recorder.recorded()
}
