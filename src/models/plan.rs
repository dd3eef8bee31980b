use super::interface::PipelineOverride;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Completion status of a backend job (bundle load, connect, task).
///
/// Also used as the lifecycle status of a [`PlanItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_success(self) -> bool {
        self == TaskStatus::Succeeded
    }

    pub fn is_done(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One entry of the execution plan handed to the lifecycle controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanItem {
    /// Id of the originating config task
    pub id: String,
    pub name: String,
    pub entry: String,
    pub pipeline_override: PipelineOverride,
    pub status: TaskStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PlanItem {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        entry: impl Into<String>,
        pipeline_override: PipelineOverride,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entry: entry.into(),
            pipeline_override,
            status: TaskStatus::Pending,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn mark_started(&mut self) {
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_finished(&mut self, status: TaskStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }
}
