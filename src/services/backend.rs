//! Capability interface of the automation backend.
//!
//! The backend does screen capture, input injection and pipeline execution.
//! muu only drives it through these traits; a real binding implements them
//! over the vendor library and tests implement them with fakes.
//!
//! Every call blocks until the backend has finished the job and returns its
//! [`TaskStatus`]. Callers run them on blocking threads, never while holding
//! the engine state lock.

use crate::models::{PipelineOverride, TaskStatus};
use camino::Utf8PathBuf;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Opaque failure reported by the backend when a handle cannot be created
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} method: {name}")]
pub struct UnknownMethod {
    pub kind: &'static str,
    pub name: String,
}

/// Loaded resource bundles
#[cfg_attr(test, mockall::automock)]
pub trait ResourceHandle: Send + Sync {
    fn post_bundle(&self, path: &str) -> TaskStatus;
    fn destroy(&self);
}

/// Device or window connection
#[cfg_attr(test, mockall::automock)]
pub trait ControllerHandle: Send + Sync {
    fn post_connect(&self) -> TaskStatus;
    fn destroy(&self);
}

/// Client side of an out-of-process custom recognition/action server
pub trait AgentHandle: Send + Sync {
    fn bind_resource(&self, resource: &dyn ResourceHandle) -> bool;
    /// Identifier the child process must be started with
    fn identifier(&self) -> Option<String>;
    fn connect(&self) -> bool;
    fn destroy(&self);
}

/// Task runner bound to one resource and one controller
pub trait TaskerHandle: Send + Sync {
    fn bind_resource(&self, resource: &dyn ResourceHandle) -> bool;
    fn bind_controller(&self, controller: &dyn ControllerHandle) -> bool;
    /// Run one pipeline entry to completion
    fn post_task(&self, entry: &str, pipeline_override: &PipelineOverride) -> TaskStatus;
    /// Ask the running task to stop and wait for it
    fn post_stop(&self) -> TaskStatus;
    fn is_running(&self) -> bool;
    fn destroy(&self);
}

pub trait AutomationBackend: Send + Sync {
    fn new_resource(&self) -> Result<Box<dyn ResourceHandle>, BackendError>;
    fn new_adb_controller(
        &self,
        params: &AdbParams,
    ) -> Result<Box<dyn ControllerHandle>, BackendError>;
    fn find_desktop_windows(&self) -> Vec<DesktopWindow>;
    fn new_win32_controller(
        &self,
        params: &Win32Params,
    ) -> Result<Box<dyn ControllerHandle>, BackendError>;
    fn new_agent(&self, identifier: &str) -> Result<Box<dyn AgentHandle>, BackendError>;
    fn new_tasker(&self) -> Result<Box<dyn TaskerHandle>, BackendError>;
    fn version(&self) -> String;
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdbParams {
    pub adb_path: String,
    pub address: String,
    /// Free-form backend config, serialized as JSON
    pub config: String,
    /// Directory holding the device-side helper binaries
    pub agent_path: Utf8PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopWindow {
    pub handle: u64,
    pub class_name: String,
    pub window_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Win32Params {
    pub handle: u64,
    pub screencap: ScreencapMethod,
    pub mouse: InputMethod,
    pub keyboard: InputMethod,
}

/// Win32 screen capture method. An empty name selects the backend default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreencapMethod {
    #[default]
    Default,
    Gdi,
    FramePool,
    DxgiDesktopDup,
    DxgiDesktopDupWindow,
    PrintWindow,
    ScreenDc,
}

impl ScreencapMethod {
    const NAMES: [(&'static str, ScreencapMethod); 6] = [
        ("GDI", ScreencapMethod::Gdi),
        ("FramePool", ScreencapMethod::FramePool),
        ("DXGI_DesktopDup", ScreencapMethod::DxgiDesktopDup),
        ("DXGI_DesktopDup_Window", ScreencapMethod::DxgiDesktopDupWindow),
        ("PrintWindow", ScreencapMethod::PrintWindow),
        ("ScreenDC", ScreencapMethod::ScreenDc),
    ];
}

impl FromStr for ScreencapMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(ScreencapMethod::Default);
        }
        Self::NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, method)| *method)
            .ok_or_else(|| UnknownMethod {
                kind: "screencap",
                name: s.to_string(),
            })
    }
}

impl fmt::Display for ScreencapMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Self::NAMES
            .iter()
            .find(|(_, method)| method == self)
            .map_or("Default", |(name, _)| *name);
        f.write_str(name)
    }
}

/// Win32 mouse or keyboard input method. An empty name selects the backend default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMethod {
    #[default]
    Default,
    Seize,
    SendMessage,
    PostMessage,
    LegacyEvent,
    PostThreadMessage,
    SendMessageWithCursorPos,
    PostMessageWithCursorPos,
}

impl InputMethod {
    const NAMES: [(&'static str, InputMethod); 7] = [
        ("Seize", InputMethod::Seize),
        ("SendMessage", InputMethod::SendMessage),
        ("PostMessage", InputMethod::PostMessage),
        ("LegacyEvent", InputMethod::LegacyEvent),
        ("PostThreadMessage", InputMethod::PostThreadMessage),
        ("SendMessageWithCursorPos", InputMethod::SendMessageWithCursorPos),
        ("PostMessageWithCursorPos", InputMethod::PostMessageWithCursorPos),
    ];
}

impl FromStr for InputMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(InputMethod::Default);
        }
        Self::NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, method)| *method)
            .ok_or_else(|| UnknownMethod {
                kind: "input",
                name: s.to_string(),
            })
    }
}

impl fmt::Display for InputMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Self::NAMES
            .iter()
            .find(|(_, method)| method == self)
            .map_or("Default", |(name, _)| *name);
        f.write_str(name)
    }
}
