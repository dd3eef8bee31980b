// muu - configuration resolution and execution lifecycle core for
// image-recognition automation projects
//
// This is the library crate containing schema validation, option resolution,
// config persistence and the engine. The binary crate (main.rs) resolves the
// execution plan of a project directory and prints it.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod schema;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::{ConfigManager, ConfigStore};
pub use models::{AppSettings, Interface, InterfaceConfig, PlanItem, TaskStatus};
pub use schema::{LoadedInterface, SchemaError};
pub use services::Engine;
pub use state::{EngineEvent, EngineState, Severity, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
