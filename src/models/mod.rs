//! Data models for muu.
//!
//! - [`Interface`]: the validated project schema (controllers, resources, tasks, options)
//! - [`InterfaceConfig`]: the user's persisted choices against an interface
//! - [`PlanItem`]: one resolved task ready for the lifecycle controller
//! - [`AppSettings`]: file locations and logging switches
//!
//! The interface is immutable after load. The config is owned by
//! [`ConfigStore`](crate::config::ConfigStore) and rewritten wholesale on save.

pub mod config;
pub mod interface;
pub mod plan;
pub mod settings;

pub use config::{
    ConfigAdb, ConfigController, ConfigTask, ConfigTaskOption, ConfigWin32, InterfaceConfig,
    OptionValues,
};
pub use interface::{
    Agent, Case, ChoiceOption, Controller, ControllerKind, DisplayOption, Input, InputKind,
    Interface, OptionDef, OptionKind, PipelineOverride, Resource, Task, Win32Settings,
};
pub use plan::{PlanItem, TaskStatus};
pub use settings::AppSettings;
