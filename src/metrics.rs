// Engine metrics module
//
// Lightweight counters for sessions and task outcomes, logged when a
// session ends.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Engine metrics
///
/// Uses atomic operations so the lifecycle worker can record outcomes
/// without taking the state lock.
#[derive(Debug)]
pub struct Metrics {
    /// Sessions that reached Running
    pub sessions_started: AtomicUsize,

    /// Start attempts that failed during acquisition
    pub acquisition_failures: AtomicUsize,

    /// Acquisitions discarded because a stop or newer start took over
    pub sessions_discarded: AtomicUsize,

    pub tasks_succeeded: AtomicUsize,

    pub tasks_failed: AtomicUsize,

    /// Total time spent in posted tasks, in milliseconds
    pub total_task_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            sessions_started: AtomicUsize::new(0),
            acquisition_failures: AtomicUsize::new(0),
            sessions_discarded: AtomicUsize::new(0),
            tasks_succeeded: AtomicUsize::new(0),
            tasks_failed: AtomicUsize::new(0),
            total_task_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_acquisition_failure(&self) {
        self.acquisition_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_discarded(&self) {
        self.sessions_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one finished task and how long it ran
    pub fn record_task(&self, succeeded: bool, duration: Duration) {
        if succeeded {
            self.tasks_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.total_task_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average task time in milliseconds over all finished tasks
    pub fn avg_task_time_ms(&self) -> f64 {
        let total = self.total_task_time_ms.load(Ordering::Relaxed);
        let count = self.tasks_succeeded.load(Ordering::Relaxed)
            + self.tasks_failed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Engine Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Sessions: {} started, {} failed to acquire, {} discarded",
            self.sessions_started.load(Ordering::Relaxed),
            self.acquisition_failures.load(Ordering::Relaxed),
            self.sessions_discarded.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Tasks: {} succeeded, {} failed",
            self.tasks_succeeded.load(Ordering::Relaxed),
            self.tasks_failed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Total task time: {:.2}s (avg: {:.2}ms per task)",
            self.total_task_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_task_time_ms()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
