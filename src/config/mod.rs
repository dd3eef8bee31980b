//! Persistent configuration.
//!
//! - [`ConfigManager`]: file locations, app settings and raw load/save of
//!   the interface config
//! - [`sync`]: default generation and reconciliation against the schema
//! - [`ConfigStore`]: the live config shared by the rest of the app

pub mod store;
pub mod sync;

pub use store::ConfigStore;
pub use sync::{default_config, sync_config};

use crate::models::{AppSettings, InterfaceConfig};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Why a stored interface config could not be used
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(Utf8PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Prefix of environment variables that override `settings.yaml`
pub const ENV_PREFIX: &str = "MUU";

/// Configuration manager for the files muu keeps next to its executable.
///
/// - `config/settings.yaml`: [`AppSettings`], optional, overridable by `MUU_*` variables
/// - `interface_config.json`: the user's [`InterfaceConfig`]
#[derive(Debug, Clone)]
pub struct ConfigManager {
    app_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a manager rooted at `app_dir`, creating `app_dir/config` if needed
    pub fn new<P: AsRef<Utf8Path>>(app_dir: P) -> Result<Self> {
        let app_dir = app_dir.as_ref().to_path_buf();
        let settings_dir = app_dir.join("config");

        if !settings_dir.exists() {
            fs::create_dir_all(&settings_dir).with_context(|| {
                format!("Failed to create config directory: {}", settings_dir)
            })?;
        }

        Ok(Self {
            settings_path: settings_dir.join("settings.yaml"),
            config_path: app_dir.join(AppSettings::default().config_file),
            app_dir,
        })
    }

    /// Use `file_name` (relative to the app directory) for the interface config
    pub fn with_config_file(mut self, file_name: &str) -> Self {
        self.config_path = self.app_dir.join(file_name);
        self
    }

    /// Load app settings from `settings.yaml` layered with `MUU_*` variables.
    ///
    /// A missing settings file yields the defaults.
    pub fn load_settings(&self) -> Result<AppSettings> {
        let settings = ::config::Config::builder()
            .add_source(
                ::config::File::new(self.settings_path.as_str(), ::config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize::<AppSettings>()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    pub fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Load the stored interface config
    pub fn load_interface_config(&self) -> Result<InterfaceConfig, ConfigError> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let contents = fs::read_to_string(&self.config_path).map_err(|source| ConfigError::Read {
            path: self.config_path.clone(),
            source,
        })?;

        let config =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: self.config_path.clone(),
                source,
            })?;

        tracing::info!("Loaded interface config from {}", self.config_path);
        Ok(config)
    }

    /// Rewrite the interface config in full (pretty JSON, temp file then rename)
    pub fn save_interface_config(&self, config: &InterfaceConfig) -> Result<()> {
        let json = serde_json::to_vec_pretty(config)
            .context("Failed to serialize interface config to JSON")?;

        atomic_write(&self.config_path, &json)
            .with_context(|| format!("Failed to write interface config: {}", self.config_path))?;

        tracing::info!("Saved interface config to {}", self.config_path);
        Ok(())
    }

    pub fn app_dir(&self) -> &Utf8Path {
        &self.app_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }

    /// Resolve a settings path against the app directory
    pub fn resolve(&self, path: &str) -> Utf8PathBuf {
        self.app_dir.join(path)
    }
}

fn atomic_write(path: &Utf8Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("path has no parent"))?;
    let tmp_path = parent.join(format!(
        ".{}.tmp-{}-{}",
        path.file_name().unwrap_or("config"),
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    ));

    {
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}
