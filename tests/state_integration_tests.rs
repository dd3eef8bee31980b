//! Integration tests for StateManager with engine events
//!
//! These tests verify that the StateManager correctly:
//! - Emits SessionActive events when leaving and re-entering Idle
//! - Supports multiple subscribers
//! - Accepts exactly one concurrent start
//! - Ties publication of a session to the start that acquired it

use muu::models::{PipelineOverride, PlanItem, TaskStatus};
use muu::services::Session;
use muu::{EngineEvent, EngineState, Severity, StateManager};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::{Duration, timeout};

fn plan(names: &[&str]) -> Vec<PlanItem> {
    names
        .iter()
        .map(|name| PlanItem::new(*name, *name, format!("{}Entry", name), PipelineOverride::new()))
        .collect()
}

#[tokio::test]
async fn test_session_active_events_emitted() {
    let state = StateManager::new();
    let mut rx = state.subscribe();

    let generation = state.begin_start().unwrap();
    let event = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");
    assert_eq!(event, EngineEvent::SessionActive(true));

    assert!(state.abort_start(generation));
    let event = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");
    assert_eq!(event, EngineEvent::SessionActive(false));
}

#[tokio::test]
async fn test_multiple_subscribers_receive_events() {
    let state = StateManager::new();
    let mut receivers = vec![state.subscribe(), state.subscribe(), state.subscribe()];

    state.notify(Severity::Info, "hello");

    for rx in &mut receivers {
        let event = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("Timeout waiting for event")
            .expect("Channel closed");
        assert_eq!(
            event,
            EngineEvent::Message {
                severity: Severity::Info,
                text: "hello".to_string()
            }
        );
    }
}

#[test]
fn test_concurrent_starts_accept_one() {
    let state = Arc::new(StateManager::new());
    let accepted = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let state = Arc::clone(&state);
            let accepted = Arc::clone(&accepted);
            std::thread::spawn(move || {
                if state.begin_start().is_some() {
                    accepted.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    assert_eq!(state.generation(), 1);
    assert_eq!(state.state(), EngineState::Starting);
}

#[test]
fn test_publish_moves_to_running_with_plan() {
    let state = StateManager::new();
    let generation = state.begin_start().unwrap();

    state
        .publish_session(generation, Session::default(), plan(&["A", "B"]))
        .unwrap();

    assert_eq!(state.state(), EngineState::Running);
    let snapshot = state.plan_snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].entry, "AEntry");
}

#[test]
fn test_stale_generation_cannot_publish() {
    let state = StateManager::new();
    let first = state.begin_start().unwrap();
    state.begin_stop(None).unwrap();
    state.finish_stop();

    let second = state.begin_start().unwrap();
    assert_ne!(first, second);

    let returned = state.publish_session(first, Session::default(), plan(&["A"]));
    assert!(returned.is_err());
    assert_eq!(state.state(), EngineState::Starting);
    assert!(state.plan_snapshot().is_empty());

    assert!(!state.abort_start(first));
    assert_eq!(state.state(), EngineState::Starting);
}

#[test]
fn test_finish_plan_item_emits_update() {
    let state = StateManager::new();
    let generation = state.begin_start().unwrap();
    state
        .publish_session(generation, Session::default(), plan(&["A"]))
        .unwrap();
    let mut rx = state.subscribe();

    state.finish_plan_item(0, TaskStatus::Failed);

    assert_eq!(
        rx.try_recv().unwrap(),
        EngineEvent::TaskUpdated {
            id: "A".to_string(),
            status: TaskStatus::Failed
        }
    );
    let item = &state.plan_snapshot()[0];
    assert_eq!(item.status, TaskStatus::Failed);
    assert!(item.finished_at.is_some());
}

#[test]
fn test_stop_from_running_returns_session() {
    let state = StateManager::new();
    let generation = state.begin_start().unwrap();
    state
        .publish_session(generation, Session::default(), plan(&["A"]))
        .unwrap();

    let taken = state.begin_stop(Some(generation)).unwrap();
    assert!(taken.is_some());
    assert_eq!(state.state(), EngineState::Stopping);
    assert!(state.start_plan_item(generation, 0).is_none());

    state.finish_stop();
    assert_eq!(state.state(), EngineState::Idle);
    // The last plan stays visible until the next start
    assert_eq!(state.plan_snapshot().len(), 1);
}

#[test]
fn test_events_without_subscribers_are_dropped() {
    let state = StateManager::new();
    state.notify(Severity::Error, "nobody listens");

    let generation = state.begin_start().unwrap();
    assert!(state.abort_start(generation));
    assert_eq!(state.state(), EngineState::Idle);
}
