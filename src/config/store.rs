use super::{ConfigManager, default_config, sync_config};
use crate::models::{Interface, InterfaceConfig};
use anyhow::Result;
use std::sync::{PoisonError, RwLock};
use tracing::{info, warn};

/// Owner of the live interface config.
///
/// Every mutation goes through [`update`](Self::update) or
/// [`save`](Self::save) and is written to disk in full.
#[derive(Debug)]
pub struct ConfigStore {
    manager: ConfigManager,
    config: RwLock<InterfaceConfig>,
}

impl ConfigStore {
    /// Load the stored config and reconcile it with `interface`.
    ///
    /// A missing, unreadable or corrupt file is replaced by a fresh default
    /// config. The file is only rewritten when something changed.
    pub fn open(manager: ConfigManager, interface: &Interface) -> Result<Self> {
        let config = match manager.load_interface_config() {
            Ok(mut config) => {
                if sync_config(interface, &mut config) {
                    info!("Interface config out of date, rewriting");
                    manager.save_interface_config(&config)?;
                }
                config
            }
            Err(e) => {
                warn!("{}; generating default config", e);
                let config = default_config(interface);
                manager.save_interface_config(&config)?;
                config
            }
        };

        Ok(Self {
            manager,
            config: RwLock::new(config),
        })
    }

    pub fn snapshot(&self) -> InterfaceConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the config wholesale and persist it
    pub fn save(&self, config: InterfaceConfig) -> Result<()> {
        let mut guard = self.config.write().unwrap_or_else(PoisonError::into_inner);
        self.manager.save_interface_config(&config)?;
        *guard = config;
        Ok(())
    }

    /// Apply an edit, reconcile against `interface` and persist
    pub fn update<F>(&self, interface: &Interface, edit: F) -> Result<()>
    where
        F: FnOnce(&mut InterfaceConfig),
    {
        let mut guard = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let mut config = guard.clone();
        edit(&mut config);
        sync_config(interface, &mut config);
        self.manager.save_interface_config(&config)?;
        *guard = config;
        Ok(())
    }

    /// Reconcile against `interface`, persisting only when something changed
    pub fn resync(&self, interface: &Interface) -> Result<bool> {
        let mut guard = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let mut config = guard.clone();
        if !sync_config(interface, &mut config) {
            return Ok(false);
        }
        self.manager.save_interface_config(&config)?;
        *guard = config;
        Ok(true)
    }

    pub fn manager(&self) -> &ConfigManager {
        &self.manager
    }
}
