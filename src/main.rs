//! muu - resolve the execution plan of an automation project.
//!
//! # Overview
//!
//! The binary loads a project directory (the first argument, or the directory
//! of the executable) and prints the plan the engine would run. It
//! initializes:
//! - App settings ([`ConfigManager::load_settings`]) from `config/settings.yaml` and `MUU_*`
//! - Logging (file rotation + optional console output)
//! - Tokio runtime for remote content
//! - The validated schema ([`LoadedInterface`]) and the synced config ([`ConfigStore`])
//!
//! No automation backend is linked, so nothing is executed.
//!
//! # Execution Flow
//!
//! 1. Resolve the app directory and load settings
//! 2. Initialize logging → `<log_dir>/muu.<date>`
//! 3. Create tokio runtime with 2 worker threads
//! 4. Load `interface.json` (fatal on schema errors)
//! 5. Load, sync and persist `interface_config.json`
//! 6. Print the welcome text and the plan as JSON

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use muu::services::{ContentReader, build_task_list};
use muu::{APP_NAME, ConfigManager, ConfigStore, LoadedInterface, VERSION};
use std::time::Duration;

fn app_dir() -> Result<Utf8PathBuf> {
    if let Some(arg) = std::env::args().nth(1) {
        return Ok(Utf8PathBuf::from(arg));
    }

    let exe = std::env::current_exe().context("Failed to locate executable")?;
    let exe = Utf8PathBuf::try_from(exe).context("Executable path is not valid UTF-8")?;
    Ok(exe
        .parent()
        .map(|dir| dir.to_path_buf())
        .unwrap_or_else(|| Utf8PathBuf::from(".")))
}

fn main() -> Result<()> {
    let app_dir = app_dir()?;
    let config_manager = ConfigManager::new(&app_dir)?;
    let settings = config_manager.load_settings()?;
    let config_manager = config_manager.with_config_file(&settings.config_file);

    let _guard = muu::logging::setup_logging(
        &config_manager.resolve(&settings.log_dir),
        "muu",
        settings.debug_mode,
        settings.console_log,
    )?;

    tracing::info!("Starting {} v{} in {}", APP_NAME, VERSION, app_dir);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("muu-worker")
        .build()?;

    let interface_path = config_manager.resolve(&settings.interface_file);
    let schema = LoadedInterface::load_from_file(&interface_path).map_err(|e| {
        tracing::error!("Failed to load interface: {}", e);
        e
    })?;

    tracing::info!(
        "Loaded interface {} - controllers: {}, resources: {}, tasks: {}, options: {}",
        schema.interface.name,
        schema.interface.controllers.len(),
        schema.interface.resources.len(),
        schema.interface.tasks.len(),
        schema.interface.options.len()
    );

    let store = ConfigStore::open(config_manager, &schema.interface)?;
    let plan = build_task_list(&schema.interface, &store.snapshot());

    if let Some(welcome) = &schema.interface.welcome {
        let lang = schema.languages().first().copied().unwrap_or_default();
        let text = schema.resolve_string(welcome, lang);
        let reader = ContentReader::new(
            schema.base_path(),
            Duration::from_secs(settings.content_timeout_secs),
        );
        let content = runtime.block_on(reader.read(text));
        if !content.is_empty() {
            println!("{}", content);
        }
    }

    let json = serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?;
    println!("{}", json);

    runtime.shutdown_timeout(Duration::from_secs(5));
    tracing::info!("Resolved {} tasks", plan.len());

    Ok(())
}
