use super::backend::AutomationBackend;
use super::session::Session;
use super::task_list::build_task_list;
use crate::config::ConfigStore;
use crate::metrics::Metrics;
use crate::models::{PlanItem, TaskStatus};
use crate::schema::LoadedInterface;
use crate::state::{EngineEvent, EngineState, Severity, StateManager};
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Lifecycle controller for backend sessions and the task queue.
///
/// [`start`](Self::start) returns immediately; acquisition and execution run
/// on a blocking worker of the injected runtime. [`stop`](Self::stop) blocks
/// until every handle of the current session has been released.
///
/// Cloning is cheap and all clones drive the same engine.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    backend: Arc<dyn AutomationBackend>,
    schema: Arc<LoadedInterface>,
    config: Arc<ConfigStore>,
    state: StateManager,
    metrics: Metrics,
    runtime: Handle,
    app_dir: Utf8PathBuf,
}

impl Engine {
    pub fn new(
        backend: Arc<dyn AutomationBackend>,
        schema: Arc<LoadedInterface>,
        config: Arc<ConfigStore>,
        runtime: Handle,
        app_dir: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                backend,
                schema,
                config,
                state: StateManager::new(),
                metrics: Metrics::new(),
                runtime,
                app_dir: app_dir.into(),
            }),
        }
    }

    /// Acquire a session and run the checked tasks. No-op unless Idle.
    pub fn start(&self) {
        let Some(generation) = self.inner.state.begin_start() else {
            info!("Engine is already running ({})", self.inner.state.state());
            return;
        };

        info!("Engine starting (session {})", generation);
        let inner = Arc::clone(&self.inner);
        self.inner
            .runtime
            .spawn_blocking(move || inner.run_session(generation));
    }

    /// Stop the current session. No-op unless Starting or Running.
    pub fn stop(&self) {
        self.inner.stop(None);
    }

    pub fn state(&self) -> EngineState {
        self.inner.state.state()
    }

    /// True in any state other than Idle
    pub fn is_running(&self) -> bool {
        self.inner.state.state().is_active()
    }

    /// The current plan with per-item status
    pub fn tasks(&self) -> Vec<PlanItem> {
        self.inner.state.plan_snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.state.subscribe()
    }

    pub fn backend_version(&self) -> String {
        self.inner.backend.version()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    pub fn app_dir(&self) -> &Utf8Path {
        &self.inner.app_dir
    }
}

impl EngineInner {
    fn run_session(&self, generation: u64) {
        let interface = &self.schema.interface;
        let config = self.config.snapshot();

        let state = &self.state;
        let mut on_warning = |text: String| state.notify(Severity::Warning, text);
        let acquired = Session::acquire(
            self.backend.as_ref(),
            interface,
            &config,
            &self.app_dir,
            &mut on_warning,
        );

        let session = match acquired {
            Ok(session) => session,
            Err(e) => {
                error!("Engine start failed: {}", e);
                self.metrics.record_acquisition_failure();
                self.state.notify(Severity::Error, e.to_string());
                self.state.abort_start(generation);
                return;
            }
        };

        let plan = build_task_list(interface, &config);
        let total = plan.len();
        if let Err(session) = self.state.publish_session(generation, session, plan) {
            info!("Engine start aborted (stopped during acquisition)");
            self.metrics.record_session_discarded();
            session.rollback();
            return;
        }

        self.metrics.record_session_started();
        info!("Engine running {} tasks", total);

        let completed = self.run_plan(generation);
        if completed == total {
            self.state.notify(Severity::Success, "All tasks finished");
        }

        self.stop(Some(generation));
    }

    /// Post plan items in order until the plan ends or the engine leaves
    /// Running. Failed items do not stop the queue. Returns the number of
    /// items that were run.
    fn run_plan(&self, generation: u64) -> usize {
        let mut index = 0;
        while let Some(step) = self.state.start_plan_item(generation, index) {
            info!("Running task {} ({})", index + 1, step.entry);
            let started = Instant::now();
            let status = match step.tasker.post_task(&step.entry, &step.pipeline_override) {
                TaskStatus::Succeeded => TaskStatus::Succeeded,
                _ => TaskStatus::Failed,
            };
            self.metrics.record_task(status.is_success(), started.elapsed());
            info!("Task {} {}", step.entry, status);

            self.state.finish_plan_item(step.index, status);
            index += 1;
        }
        index
    }

    fn stop(&self, generation: Option<u64>) {
        let Some(session) = self.state.begin_stop(generation) else {
            return;
        };

        info!("Engine stopping");
        if let Some(session) = session {
            session.teardown();
        }
        self.state.finish_stop();

        self.metrics.log_summary();
        info!("Engine stopped");
    }
}
