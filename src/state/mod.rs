// Engine state management
//
// This module provides the StateManager which guards the engine's lifecycle
// state, its backend session and the execution plan behind one
// Arc<RwLock<T>>, and emits change events for observers.

use crate::models::{PipelineOverride, PlanItem, TaskStatus};
use crate::services::TaskerHandle;
use crate::services::session::Session;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Lifecycle state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
}

impl EngineState {
    /// Allowed transitions:
    ///
    /// | from     | to                         |
    /// |----------|----------------------------|
    /// | Idle     | Starting                   |
    /// | Starting | Running, Stopping, Idle    |
    /// | Running  | Stopping                   |
    /// | Stopping | Idle                       |
    pub fn can_transition_to(self, next: EngineState) -> bool {
        use EngineState::*;
        matches!(
            (self, next),
            (Idle, Starting)
                | (Starting, Running)
                | (Starting, Stopping)
                | (Starting, Idle)
                | (Running, Stopping)
                | (Stopping, Idle)
        )
    }

    /// Any state other than Idle holds or is acquiring a session
    pub fn is_active(self) -> bool {
        self != EngineState::Idle
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Success,
    Info,
}

/// Events emitted to observers (best effort, dropped when nobody listens)
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// The engine left Idle (`true`) or returned to it (`false`)
    SessionActive(bool),

    /// User-facing notification
    Message { severity: Severity, text: String },

    /// A plan item changed status
    TaskUpdated { id: String, status: TaskStatus },
}

/// Everything guarded by the state lock
#[derive(Debug, Default)]
struct EngineSlot {
    state: EngineState,
    /// Incremented on every accepted start
    generation: u64,
    session: Option<Session>,
    plan: Vec<PlanItem>,
}

/// Work handed out for one plan item
pub struct PlanStep {
    pub index: usize,
    pub entry: String,
    pub pipeline_override: PipelineOverride,
    pub tasker: Arc<dyn TaskerHandle>,
}

/// Thread-safe engine state with event emission
///
/// All lifecycle transitions are made here under one write lock, so checks
/// like "still Starting for this generation" and the following transition
/// are atomic. Callers never hold the lock while calling the backend.
pub struct StateManager {
    slot: Arc<RwLock<EngineSlot>>,
    events_tx: broadcast::Sender<EngineEvent>,
}

impl StateManager {
    /// Create a new StateManager with a broadcast buffer of 100 events
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(100);
        Self {
            slot: Arc::new(RwLock::new(EngineSlot::default())),
            events_tx,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, EngineSlot> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EngineSlot> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate the slot and emit the events implied by any state change
    fn update<F, R>(&self, update_fn: F) -> R
    where
        F: FnOnce(&mut EngineSlot) -> R,
    {
        let mut slot = self.write();
        let old_state = slot.state;

        let result = update_fn(&mut slot);

        if let Some(event) = Self::detect_changes(old_state, slot.state) {
            let _ = self.events_tx.send(event);
        }
        result
    }

    fn detect_changes(old: EngineState, new: EngineState) -> Option<EngineEvent> {
        match (old.is_active(), new.is_active()) {
            (false, true) => Some(EngineEvent::SessionActive(true)),
            (true, false) => Some(EngineEvent::SessionActive(false)),
            _ => None,
        }
    }

    fn transition(slot: &mut EngineSlot, next: EngineState) -> bool {
        if !slot.state.can_transition_to(next) {
            tracing::warn!("Rejected engine transition {} -> {}", slot.state, next);
            return false;
        }
        tracing::debug!("Engine {} -> {}", slot.state, next);
        slot.state = next;
        true
    }

    pub fn state(&self) -> EngineState {
        self.read().state
    }

    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Idle → Starting. Returns the new generation, or `None` when the
    /// engine is not Idle.
    pub fn begin_start(&self) -> Option<u64> {
        self.update(|slot| {
            if slot.state != EngineState::Idle {
                return None;
            }
            Self::transition(slot, EngineState::Starting);
            slot.generation += 1;
            slot.plan.clear();
            Some(slot.generation)
        })
    }

    /// Starting → Idle after a failed acquisition for `generation`.
    ///
    /// Does nothing if a stop (or a newer start) already took over.
    pub fn abort_start(&self, generation: u64) -> bool {
        self.update(|slot| {
            slot.generation == generation
                && slot.state == EngineState::Starting
                && Self::transition(slot, EngineState::Idle)
        })
    }

    /// Starting → Running, storing the session and plan for `generation`.
    ///
    /// If the engine is no longer Starting for this generation the session
    /// is handed back so the caller can release it.
    pub fn publish_session(
        &self,
        generation: u64,
        session: Session,
        plan: Vec<PlanItem>,
    ) -> Result<(), Session> {
        self.update(|slot| {
            if slot.generation != generation || slot.state != EngineState::Starting {
                return Err(session);
            }
            Self::transition(slot, EngineState::Running);
            slot.session = Some(session);
            slot.plan = plan;
            Ok(())
        })
    }

    /// Mark plan item `index` Running and hand out what is needed to post it.
    ///
    /// Returns `None` once the engine is no longer Running for `generation`.
    pub fn start_plan_item(&self, generation: u64, index: usize) -> Option<PlanStep> {
        let step = {
            let mut slot = self.write();
            if slot.generation != generation || slot.state != EngineState::Running {
                return None;
            }
            let tasker = slot.session.as_ref()?.tasker()?;
            let item = slot.plan.get_mut(index)?;
            item.mark_started();
            let _ = self.events_tx.send(EngineEvent::TaskUpdated {
                id: item.id.clone(),
                status: item.status,
            });
            PlanStep {
                index,
                entry: item.entry.clone(),
                pipeline_override: item.pipeline_override.clone(),
                tasker,
            }
        };
        Some(step)
    }

    /// Record the outcome of plan item `index`
    pub fn finish_plan_item(&self, index: usize, status: TaskStatus) {
        let mut slot = self.write();
        if let Some(item) = slot.plan.get_mut(index) {
            item.mark_finished(status);
            let _ = self.events_tx.send(EngineEvent::TaskUpdated {
                id: item.id.clone(),
                status,
            });
        }
    }

    /// Running/Starting → Stopping, taking the session out.
    ///
    /// With `Some(generation)` only that generation is stopped. Returns
    /// `None` when there is nothing to stop; otherwise the caller must tear
    /// down the returned session (if any) and call
    /// [`finish_stop`](Self::finish_stop).
    pub fn begin_stop(&self, generation: Option<u64>) -> Option<Option<Session>> {
        self.update(|slot| {
            if generation.is_some_and(|g| g != slot.generation) {
                return None;
            }
            if !matches!(slot.state, EngineState::Running | EngineState::Starting) {
                return None;
            }
            Self::transition(slot, EngineState::Stopping);
            Some(slot.session.take())
        })
    }

    /// Stopping → Idle
    pub fn finish_stop(&self) {
        self.update(|slot| {
            if slot.state == EngineState::Stopping {
                Self::transition(slot, EngineState::Idle);
            }
        });
    }

    pub fn plan_snapshot(&self) -> Vec<PlanItem> {
        self.read().plan.clone()
    }

    /// Send a user-facing notification
    pub fn notify(&self, severity: Severity, text: impl Into<String>) {
        let _ = self.events_tx.send(EngineEvent::Message {
            severity,
            text: text.into(),
        });
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events_tx.subscribe()
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            events_tx: self.events_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_transition_table() {
        use EngineState::*;
        assert!(Idle.can_transition_to(Starting));
        assert!(!Idle.can_transition_to(Running));
        assert!(Starting.can_transition_to(Idle));
        assert!(!Running.can_transition_to(Idle));
        assert!(!Stopping.can_transition_to(Starting));
    }

    #[test]
    fn test_begin_start_only_from_idle() {
        let manager = StateManager::new();
        let mut rx = manager.subscribe();

        assert_eq!(manager.begin_start(), Some(1));
        assert_eq!(manager.begin_start(), None);
        assert_eq!(manager.state(), EngineState::Starting);
        assert_eq!(drain(&mut rx), vec![EngineEvent::SessionActive(true)]);
    }

    #[test]
    fn test_abort_start_ignores_other_generations() {
        let manager = StateManager::new();
        let generation = manager.begin_start().unwrap();

        assert!(!manager.abort_start(generation + 1));
        assert_eq!(manager.state(), EngineState::Starting);
        assert!(manager.abort_start(generation));
        assert_eq!(manager.state(), EngineState::Idle);
    }

    #[test]
    fn test_publish_after_stop_returns_session() {
        let manager = StateManager::new();
        let generation = manager.begin_start().unwrap();

        assert!(matches!(manager.begin_stop(None), Some(None)));
        manager.finish_stop();

        let result = manager.publish_session(generation, Session::default(), Vec::new());
        assert!(result.is_err());
        assert_eq!(manager.state(), EngineState::Idle);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let manager = StateManager::new();
        let mut rx = manager.subscribe();
        assert!(manager.begin_stop(None).is_none());

        manager.begin_start().unwrap();
        assert!(manager.begin_stop(None).is_some());
        assert!(manager.begin_stop(None).is_none());
        manager.finish_stop();
        manager.finish_stop();

        assert_eq!(
            drain(&mut rx),
            vec![
                EngineEvent::SessionActive(true),
                EngineEvent::SessionActive(false)
            ]
        );
    }

    #[test]
    fn test_begin_stop_for_stale_generation() {
        let manager = StateManager::new();
        let generation = manager.begin_start().unwrap();
        assert!(manager.begin_stop(Some(generation + 1)).is_none());
        assert!(manager.begin_stop(Some(generation)).is_some());
    }

    #[test]
    fn test_start_plan_item_requires_running() {
        let manager = StateManager::new();
        let generation = manager.begin_start().unwrap();
        assert!(manager.start_plan_item(generation, 0).is_none());
    }

    #[test]
    fn test_clone_shares_state() {
        let manager1 = StateManager::new();
        let manager2 = manager1.clone();
        manager1.begin_start();
        assert_eq!(manager2.state(), EngineState::Starting);
    }
}
