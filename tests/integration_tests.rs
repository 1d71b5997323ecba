//! Integration tests for the quizmatch matchmaking engine
//!
//! These tests validate the entire system working together, including:
//! - Complete queue-to-match workflows over the gateway
//! - Subject isolation and rating-window behavior
//! - Disconnect and queue-timeout cleanup
//! - Error reporting to the originating connection
//! - Concurrent join handling

// Modules for organizing tests
mod fixtures;

use fixtures::{create_test_system, create_test_system_with, wait_for_recorded, TestClient};
use quizmatch::config::MatchmakingSettings;
use quizmatch::ws::{ErrorCode, ServerEvent};
use std::collections::HashSet;
use std::time::Duration;

#[tokio::test]
async fn test_complete_match_workflow() {
    let system = create_test_system();
    system.stats.set_rating("alice", "science", 1200);
    system.stats.set_rating("bob", "science", 1250);

    let mut alice = TestClient::connect(&system, "alice");
    let mut bob = TestClient::connect(&system, "bob");

    alice.join(&system, "science").await;
    match alice.next_event() {
        Some(ServerEvent::Joined(status)) => {
            assert!(status.in_queue);
            assert_eq!(status.subject_id.as_deref(), Some("science"));
            assert_eq!(status.players_in_queue, 1);
        }
        other => panic!("expected joined, got {:?}", other),
    }

    bob.join(&system, "science").await;
    assert!(matches!(bob.next_event(), Some(ServerEvent::Joined(_))));

    // Both sides see the same match from their own perspective
    let (a, b) = match (alice.next_event(), bob.next_event()) {
        (Some(ServerEvent::MatchFound(a)), Some(ServerEvent::MatchFound(b))) => (a, b),
        other => panic!("expected match_found pair, got {:?}", other),
    };
    assert_eq!(a.match_id, b.match_id);
    assert_eq!(a.opponent.id, "bob");
    assert_eq!(a.opponent.username, "bob");
    assert_eq!(a.opponent.skill_rating, 1250);
    assert_eq!(b.opponent.id, "alice");
    assert_eq!(a.subject.id, "science");
    assert_eq!(a.subject.name, "Science");

    // The pairing reaches the recorder exactly once
    let recorded = wait_for_recorded(&system.recorder, 1).await;
    assert_eq!(recorded, vec![a.match_id]);

    // Neither player is still queued
    alice.status(&system).await;
    match alice.next_event() {
        Some(ServerEvent::StatusUpdate(status)) => assert!(!status.in_queue),
        other => panic!("expected status_update, got {:?}", other),
    }
}

#[tokio::test]
async fn test_subjects_are_isolated() {
    let system = create_test_system();

    let mut alice = TestClient::connect(&system, "alice");
    let mut bob = TestClient::connect(&system, "bob");

    alice.join(&system, "science").await;
    bob.join(&system, "history").await;

    // Same default rating, different subjects: both remain queued
    assert!(matches!(alice.next_event(), Some(ServerEvent::Joined(_))));
    assert!(matches!(bob.next_event(), Some(ServerEvent::Joined(_))));
    assert!(alice.next_event().is_none());
    assert!(bob.next_event().is_none());
}

#[tokio::test]
async fn test_out_of_window_players_keep_waiting() {
    let system = create_test_system();
    system.stats.set_rating("alice", "science", 1200);
    system.stats.set_rating("carol", "science", 1600);

    let mut alice = TestClient::connect(&system, "alice");
    let mut carol = TestClient::connect(&system, "carol");

    alice.join(&system, "science").await;
    carol.join(&system, "science").await;
    alice.drain_events();
    carol.drain_events();

    carol.status(&system).await;
    match carol.next_event() {
        Some(ServerEvent::StatusUpdate(status)) => {
            assert!(status.in_queue);
            assert_eq!(status.players_in_queue, 2);
            // 1600 ± 100 at join time
            assert_eq!(status.rating_window.min, 1500);
            assert_eq!(status.rating_window.max, 1700);
        }
        other => panic!("expected status_update, got {:?}", other),
    }
}

#[tokio::test]
async fn test_closest_candidate_wins() {
    let system = create_test_system();
    system.stats.set_rating("alice", "science", 1300);
    system.stats.set_rating("bob", "science", 1180);
    system.stats.set_rating("carol", "science", 1250);

    let mut alice = TestClient::connect(&system, "alice");
    let mut bob = TestClient::connect(&system, "bob");
    let mut carol = TestClient::connect(&system, "carol");

    // Alice and Bob are 120 apart, outside each other's initial window,
    // so both wait.
    alice.join(&system, "science").await;
    assert!(matches!(alice.next_event(), Some(ServerEvent::Joined(_))));
    assert!(alice.next_event().is_none());

    bob.join(&system, "science").await;
    bob.drain_events();
    alice.drain_events();

    // Carol joins and is paired with Alice (diff 50) over Bob (diff 70)
    carol.join(&system, "science").await;
    let events = carol.drain_events();
    match events.last() {
        Some(ServerEvent::MatchFound(found)) => assert_eq!(found.opponent.id, "alice"),
        other => panic!("expected match_found, got {:?}", other),
    }

    // Bob is still waiting
    bob.status(&system).await;
    match bob.next_event() {
        Some(ServerEvent::StatusUpdate(status)) => assert!(status.in_queue),
        other => panic!("expected status_update, got {:?}", other),
    }
}

#[tokio::test]
async fn test_leave_and_error_paths() {
    let system = create_test_system();
    let mut alice = TestClient::connect(&system, "alice");

    // Leave before joining
    alice.leave(&system).await;
    match alice.next_event() {
        Some(ServerEvent::Error(err)) => assert_eq!(err.code, ErrorCode::NotInQueue),
        other => panic!("expected error, got {:?}", other),
    }

    // Unknown subject
    alice.join(&system, "astrology").await;
    match alice.next_event() {
        Some(ServerEvent::Error(err)) => assert_eq!(err.code, ErrorCode::InvalidSubject),
        other => panic!("expected error, got {:?}", other),
    }

    // Double join
    alice.join(&system, "science").await;
    assert!(matches!(alice.next_event(), Some(ServerEvent::Joined(_))));
    alice.join(&system, "science").await;
    match alice.next_event() {
        Some(ServerEvent::Error(err)) => assert_eq!(err.code, ErrorCode::AlreadyInQueue),
        other => panic!("expected error, got {:?}", other),
    }

    // Clean leave
    alice.leave(&system).await;
    assert!(matches!(alice.next_event(), Some(ServerEvent::Left)));
}

#[tokio::test]
async fn test_disconnect_frees_queue_slot() {
    let system = create_test_system();

    let mut alice = TestClient::connect(&system, "alice");
    alice.join(&system, "science").await;
    alice.drain_events();

    alice.disconnect(&system);

    // Bob joins with an identical rating and finds an empty pool
    let mut bob = TestClient::connect(&system, "bob");
    bob.join(&system, "science").await;
    let events = bob.drain_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ServerEvent::Joined(_)));
}

#[tokio::test]
async fn test_queue_timeout_sweep() {
    let settings = MatchmakingSettings {
        queue_timeout_ms: 100,
        ..MatchmakingSettings::default()
    };
    let system = create_test_system_with(settings);

    let mut alice = TestClient::connect(&system, "alice");
    alice.join(&system, "science").await;
    alice.drain_events();

    tokio::time::sleep(Duration::from_millis(150)).await;
    system.gateway.sweep_expired();

    assert!(matches!(alice.next_event(), Some(ServerEvent::Left)));

    alice.status(&system).await;
    match alice.next_event() {
        Some(ServerEvent::StatusUpdate(status)) => assert!(!status.in_queue),
        other => panic!("expected status_update, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_pair_everyone_once() {
    let system = create_test_system();
    let player_count = 20;

    for i in 0..player_count {
        system
            .stats
            .set_rating(&format!("player{}", i), "science", 1200 + i as i32);
    }

    let mut clients: Vec<TestClient> = (0..player_count)
        .map(|i| TestClient::connect(&system, &format!("player{}", i)))
        .collect();

    let mut tasks = Vec::new();
    for client in &clients {
        let gateway = system.gateway.clone();
        let connection_id = client.connection_id;
        let identity = client.identity.clone();
        tasks.push(tokio::spawn(async move {
            gateway
                .handle_event(
                    connection_id,
                    &identity,
                    quizmatch::ws::ClientEvent::Join {
                        subject_id: "science".to_string(),
                    },
                )
                .await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // Every player was either matched exactly once or is still queued;
    // each match id must be announced to exactly two players.
    let mut announcements: std::collections::HashMap<_, Vec<String>> =
        std::collections::HashMap::new();
    let mut still_queued = 0;
    for (i, client) in clients.iter_mut().enumerate() {
        let player_id = format!("player{}", i);
        let found: Vec<_> = client
            .drain_events()
            .into_iter()
            .filter_map(|event| match event {
                ServerEvent::MatchFound(found) => Some(found),
                _ => None,
            })
            .collect();
        assert!(found.len() <= 1, "{} matched twice", player_id);

        if let Some(found) = found.into_iter().next() {
            announcements
                .entry(found.match_id)
                .or_default()
                .push(player_id);
        } else {
            still_queued += 1;
        }
    }

    let match_ids: HashSet<_> = announcements.keys().copied().collect();
    for (match_id, players) in &announcements {
        assert_eq!(players.len(), 2, "match {} announced {:?}", match_id, players);
    }
    assert_eq!(match_ids.len() * 2 + still_queued, player_count);
    assert_eq!(
        system.gateway.coordinator().queue_len().unwrap(),
        still_queued
    );

    let recorded = wait_for_recorded(&system.recorder, match_ids.len()).await;
    assert_eq!(recorded.len(), match_ids.len());
}
