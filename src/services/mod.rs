//! Services module - resolution logic and the execution lifecycle.
//!
//! # Components
//!
//! - [`options`]: walks the active option tree of a task; defaults, the
//!   expected option set and override compilation are all derived from it
//! - [`overrides`]: merges case and input fragments into one pipeline
//!   override per task, substituting `{input}` placeholders
//! - [`task_list`]: turns the checked tasks of a config into [`PlanItem`]s
//! - [`content`]: resolves welcome/description text from a URL, a file or inline text
//! - [`backend`]: capability traits of the automation backend
//! - [`session`]: acquires and releases the backend handles of one run
//! - [`Engine`]: start/stop state machine that runs the plan
//!
//! Everything except [`Engine`] and [`ContentReader`] is synchronous and free
//! of shared state.
//!
//! [`PlanItem`]: crate::models::PlanItem

pub mod backend;
pub mod content;
pub mod engine;
pub mod options;
pub mod overrides;
pub mod session;
pub mod task_list;

pub use backend::{
    AdbParams, AgentHandle, AutomationBackend, BackendError, ControllerHandle, DesktopWindow,
    InputMethod, ResourceHandle, ScreencapMethod, TaskerHandle, UnknownMethod, Win32Params,
};
pub use content::ContentReader;
pub use engine::Engine;
pub use options::{
    InputValue, Selection, ValueSource, default_option_values, expected_option_values,
    walk_options,
};
pub use overrides::{compile_task_override, merge_override};
pub use session::{AcquisitionError, Session};
pub use task_list::build_task_list;
