//! Backend session acquisition and teardown.
//!
//! A [`Session`] owns every backend handle needed to run tasks: the loaded
//! resource, the connected controller, the optional agent client with its
//! child process, and the task runner bound to both. Handles are created in
//! that order. If any step fails, everything created so far is released
//! before the error is returned.

use super::backend::{
    AdbParams, AgentHandle, AutomationBackend, BackendError, ControllerHandle, DesktopWindow,
    InputMethod, ResourceHandle, ScreencapMethod, TaskerHandle, UnknownMethod, Win32Params,
};
use crate::models::{Agent, Controller, ControllerKind, Interface, InterfaceConfig, Win32Settings};
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::process::{Child, Command};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("Failed to create resource: {0}")]
    Resource(#[source] BackendError),

    #[error("Failed to load bundle: {0}")]
    BundleLoad(Utf8PathBuf),

    #[error("Unsupported controller type: {0:?}")]
    UnsupportedControllerType(String),

    #[error("Adb controller selected but no adb settings are configured")]
    MissingAdbSettings,

    #[error("Failed to serialize adb config: {0}")]
    AdbConfig(#[from] serde_json::Error),

    #[error("No Win32 controller declared in the interface")]
    NoWin32Controller,

    #[error("Failed to find any desktop windows")]
    NoDesktopWindows,

    #[error("Invalid {field} regex: {source}")]
    InvalidWindowRegex {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("No desktop window matches the configured class and window regexes")]
    NoMatchingWindow,

    #[error(transparent)]
    Method(#[from] UnknownMethod),

    #[error("Failed to create controller: {0}")]
    Controller(#[source] BackendError),

    #[error("Failed to connect {0} controller")]
    ConnectFailed(ControllerKind),

    #[error("Failed to create agent client: {0}")]
    Agent(#[source] BackendError),

    #[error("Failed to bind resource to agent client")]
    AgentBindFailed,

    #[error("Failed to start agent child process {exec}: {source}")]
    AgentSpawn {
        exec: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect to agent server")]
    AgentConnectFailed,

    #[error("Failed to create tasker: {0}")]
    Tasker(#[source] BackendError),

    #[error("Failed to bind resource to tasker")]
    TaskerBindResource,

    #[error("Failed to bind controller to tasker")]
    TaskerBindController,
}

/// Directory of device-side helper binaries, relative to the app directory
const AGENT_BINARY_DIR: [&str; 2] = ["share", "MaaAgentBinary"];

/// Backend handles of one engine run
#[derive(Default)]
pub struct Session {
    tasker: Option<Arc<dyn TaskerHandle>>,
    agent: Option<Box<dyn AgentHandle>>,
    resource: Option<Box<dyn ResourceHandle>>,
    controller: Option<Box<dyn ControllerHandle>>,
    agent_child: Option<Child>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("tasker", &self.tasker.is_some())
            .field("agent", &self.agent.is_some())
            .field("resource", &self.resource.is_some())
            .field("controller", &self.controller.is_some())
            .field("agent_child", &self.agent_child.as_ref().map(Child::id))
            .finish()
    }
}

impl Session {
    /// Create and bind every handle for `config`.
    ///
    /// Non-fatal problems (such as a resource without bundles) are reported
    /// through `on_warning`.
    pub fn acquire(
        backend: &dyn AutomationBackend,
        interface: &Interface,
        config: &InterfaceConfig,
        app_dir: &Utf8Path,
        on_warning: &mut dyn FnMut(String),
    ) -> Result<Session, AcquisitionError> {
        let mut session = Session::default();
        match session.acquire_steps(backend, interface, config, app_dir, on_warning) {
            Ok(()) => Ok(session),
            Err(e) => {
                warn!("Session acquisition failed, rolling back: {}", e);
                session.rollback();
                Err(e)
            }
        }
    }

    fn acquire_steps(
        &mut self,
        backend: &dyn AutomationBackend,
        interface: &Interface,
        config: &InterfaceConfig,
        app_dir: &Utf8Path,
        on_warning: &mut dyn FnMut(String),
    ) -> Result<(), AcquisitionError> {
        let bundles = interface
            .find_resource(&config.resource)
            .map(|r| r.paths.as_slice())
            .unwrap_or_default();
        if bundles.is_empty() {
            let message = format!("No resource bundles found for resource: {}", config.resource);
            warn!("{}", message);
            on_warning(message);
        }

        let resource = self
            .resource
            .insert(backend.new_resource().map_err(AcquisitionError::Resource)?);
        load_bundles(&**resource, bundles, app_dir)?;

        let kind = ControllerKind::parse(&config.controller.kind).ok_or_else(|| {
            AcquisitionError::UnsupportedControllerType(config.controller.kind.clone())
        })?;
        let controller = match kind {
            ControllerKind::Adb => backend
                .new_adb_controller(&adb_params(config, app_dir)?)
                .map_err(AcquisitionError::Controller)?,
            ControllerKind::Win32 => {
                let definition = win32_controller(interface, config)?;
                let settings = definition.win32.clone().unwrap_or_default();
                let params = win32_params(&backend.find_desktop_windows(), &settings)?;
                backend
                    .new_win32_controller(&params)
                    .map_err(AcquisitionError::Controller)?
            }
        };
        let controller = self.controller.insert(controller);
        if !controller.post_connect().is_success() {
            return Err(AcquisitionError::ConnectFailed(kind));
        }
        info!("Connected {} controller {}", kind, config.controller.name);

        if let Some(agent) = &interface.agent {
            self.start_agent(backend, agent, app_dir)?;
        }

        let tasker: Arc<dyn TaskerHandle> =
            Arc::from(backend.new_tasker().map_err(AcquisitionError::Tasker)?);
        self.tasker = Some(Arc::clone(&tasker));

        if let Some(resource) = &self.resource
            && !tasker.bind_resource(&**resource)
        {
            return Err(AcquisitionError::TaskerBindResource);
        }
        if let Some(controller) = &self.controller
            && !tasker.bind_controller(&**controller)
        {
            return Err(AcquisitionError::TaskerBindController);
        }

        Ok(())
    }

    fn start_agent(
        &mut self,
        backend: &dyn AutomationBackend,
        definition: &Agent,
        app_dir: &Utf8Path,
    ) -> Result<(), AcquisitionError> {
        let agent = self.agent.insert(
            backend
                .new_agent(&definition.identifier)
                .map_err(AcquisitionError::Agent)?,
        );

        let Some(resource) = &self.resource else {
            return Err(AcquisitionError::AgentBindFailed);
        };
        if !agent.bind_resource(&**resource) {
            return Err(AcquisitionError::AgentBindFailed);
        }

        let identifier = agent
            .identifier()
            .unwrap_or_else(|| definition.identifier.clone());
        let child = Command::new(&definition.child_exec)
            .args(&definition.child_args)
            .arg(&identifier)
            .current_dir(app_dir)
            .spawn()
            .map_err(|source| AcquisitionError::AgentSpawn {
                exec: definition.child_exec.clone(),
                source,
            })?;
        debug!("Spawned agent child {} (pid {})", definition.child_exec, child.id());
        self.agent_child = Some(child);

        if !agent.connect() {
            return Err(AcquisitionError::AgentConnectFailed);
        }
        info!("Agent {} connected", identifier);
        Ok(())
    }

    pub fn tasker(&self) -> Option<Arc<dyn TaskerHandle>> {
        self.tasker.clone()
    }

    /// Release a partially built session: child process, agent, resource,
    /// controller, then task runner.
    pub fn rollback(mut self) {
        self.kill_agent_child();
        if let Some(agent) = self.agent.take() {
            agent.destroy();
        }
        if let Some(resource) = self.resource.take() {
            resource.destroy();
        }
        if let Some(controller) = self.controller.take() {
            controller.destroy();
        }
        if let Some(tasker) = self.tasker.take() {
            tasker.destroy();
        }
    }

    /// Stop a running session: the task runner is stopped first, then
    /// agent, resource and controller are destroyed and the child is reaped.
    pub fn teardown(mut self) {
        if let Some(tasker) = self.tasker.take() {
            if tasker.is_running() {
                debug!("Stopping running task");
                tasker.post_stop();
            }
            tasker.destroy();
        }
        if let Some(agent) = self.agent.take() {
            agent.destroy();
        }
        if let Some(resource) = self.resource.take() {
            resource.destroy();
        }
        if let Some(controller) = self.controller.take() {
            controller.destroy();
        }
        self.kill_agent_child();
    }

    fn kill_agent_child(&mut self) {
        if let Some(mut child) = self.agent_child.take() {
            if let Err(e) = child.kill() {
                warn!("Failed to kill agent child process: {}", e);
            }
            let _ = child.wait();
        }
    }
}

// A session dropped without `teardown` (engine dropped while running) must
// not leave the agent child behind. Backend handles are left to the backend.
impl Drop for Session {
    fn drop(&mut self) {
        self.kill_agent_child();
    }
}

/// Post every bundle (joined to `app_dir`) in order, stopping at the first failure
fn load_bundles(
    resource: &dyn ResourceHandle,
    bundles: &[String],
    app_dir: &Utf8Path,
) -> Result<(), AcquisitionError> {
    for bundle in bundles {
        let path = app_dir.join(bundle);
        if !resource.post_bundle(path.as_str()).is_success() {
            return Err(AcquisitionError::BundleLoad(path));
        }
        debug!("Loaded bundle {}", path);
    }
    Ok(())
}

fn adb_params(config: &InterfaceConfig, app_dir: &Utf8Path) -> Result<AdbParams, AcquisitionError> {
    let adb = config
        .adb
        .as_ref()
        .ok_or(AcquisitionError::MissingAdbSettings)?;
    let agent_path = AGENT_BINARY_DIR
        .iter()
        .fold(app_dir.to_path_buf(), |path, part| path.join(part));

    Ok(AdbParams {
        adb_path: adb.adb_path.clone(),
        address: adb.address.clone(),
        config: serde_json::to_string(&adb.config)?,
        agent_path,
    })
}

/// The configured controller when it is a Win32 one, else the first Win32 controller
fn win32_controller<'a>(
    interface: &'a Interface,
    config: &InterfaceConfig,
) -> Result<&'a Controller, AcquisitionError> {
    interface
        .find_controller(&config.controller.name)
        .filter(|c| c.kind == ControllerKind::Win32)
        .or_else(|| interface.first_controller_of(ControllerKind::Win32))
        .ok_or(AcquisitionError::NoWin32Controller)
}

fn win32_params(
    windows: &[DesktopWindow],
    settings: &Win32Settings,
) -> Result<Win32Params, AcquisitionError> {
    let window = select_window(windows, settings)?;
    let params = Win32Params {
        handle: window.handle,
        screencap: settings.screencap.parse::<ScreencapMethod>()?,
        mouse: settings.mouse.parse::<InputMethod>()?,
        keyboard: settings.keyboard.parse::<InputMethod>()?,
    };
    debug!(
        "Selected window {:?} ({}) screencap={} mouse={} keyboard={}",
        window.window_name, window.class_name, params.screencap, params.mouse, params.keyboard
    );
    Ok(params)
}

/// First window whose class and title match both regexes
fn select_window<'a>(
    windows: &'a [DesktopWindow],
    settings: &Win32Settings,
) -> Result<&'a DesktopWindow, AcquisitionError> {
    if windows.is_empty() {
        return Err(AcquisitionError::NoDesktopWindows);
    }
    let class_re = Regex::new(&settings.class_regex).map_err(|source| {
        AcquisitionError::InvalidWindowRegex {
            field: "class",
            source,
        }
    })?;
    let window_re = Regex::new(&settings.window_regex).map_err(|source| {
        AcquisitionError::InvalidWindowRegex {
            field: "window",
            source,
        }
    })?;

    windows
        .iter()
        .find(|w| class_re.is_match(&w.class_name) && window_re.is_match(&w.window_name))
        .ok_or(AcquisitionError::NoMatchingWindow)
}
