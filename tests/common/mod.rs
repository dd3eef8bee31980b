//! Shared fixtures for integration tests: a sample schema and an in-memory
//! automation backend that counts live handles.

#![allow(dead_code)]

use camino::Utf8PathBuf;
use muu::models::{PipelineOverride, TaskStatus};
use muu::services::{
    AdbParams, AgentHandle, AutomationBackend, BackendError, ControllerHandle, DesktopWindow,
    ResourceHandle, TaskerHandle, Win32Params,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Sample project: one Adb and one Win32 controller, a select with a nested
/// input, a switch and two tasks.
pub const SAMPLE_INTERFACE: &str = r#"{
    "interface_version": 2,
    "name": "Sample",
    "controller": [
        {"name": "Emulator", "type": "Adb"},
        {"name": "Desktop", "type": "Win32",
         "win32": {"class_regex": "^Game$", "window_regex": "Sample", "screencap": "GDI"}}
    ],
    "resource": [
        {"name": "Official", "path": ["resource/base"]}
    ],
    "task": [
        {"name": "Run", "entry": "RunEntry", "default_check": true,
         "option": ["Diff"],
         "pipeline_override": {"RunEntry": {"enabled": true}}},
        {"name": "Collect", "entry": "CollectEntry", "default_check": true,
         "option": ["Fast"]}
    ],
    "option": {
        "Diff": {
            "type": "select",
            "cases": [
                {"name": "Easy", "pipeline_override": {"RunEntry": {"level": 1}}},
                {"name": "Hard", "option": ["Sub"],
                 "pipeline_override": {"RunEntry": {"level": 3}}}
            ]
        },
        "Sub": {
            "type": "input",
            "inputs": [{"name": "x", "default": "5", "pipeline_type": "int"}],
            "pipeline_override": {"RunEntry": {"repeat": "{x}"}}
        },
        "Fast": {
            "type": "switch",
            "cases": [
                {"name": "Yes", "pipeline_override": {"CollectEntry": {"fast": true}}},
                {"name": "No", "pipeline_override": {"CollectEntry": {"fast": false}}}
            ]
        }
    }
}"#;

pub fn create_app_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let app_dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, app_dir)
}

/// Write `SAMPLE_INTERFACE` to `interface.json` under `app_dir`
pub fn write_sample_interface(app_dir: &Utf8PathBuf) -> Utf8PathBuf {
    write_interface(app_dir, SAMPLE_INTERFACE)
}

pub fn write_interface(app_dir: &Utf8PathBuf, text: &str) -> Utf8PathBuf {
    let path = app_dir.join("interface.json");
    std::fs::write(&path, text).unwrap();
    path
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Counters shared by the fake backend and every handle it creates
#[derive(Debug, Default)]
pub struct Counters {
    /// Handles created and not yet destroyed
    pub live: AtomicIsize,
    /// Calls to `new_resource`, i.e. acquisition attempts
    pub acquisitions: AtomicUsize,
    /// Acquisitions that returned (successfully or not)
    pub acquisitions_done: AtomicUsize,
    pub stops: AtomicUsize,
}

impl Counters {
    pub fn live(&self) -> isize {
        self.live.load(Ordering::SeqCst)
    }

    fn created(&self) {
        self.live.fetch_add(1, Ordering::SeqCst);
    }

    fn destroyed(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Configurable in-memory backend
pub struct FakeBackend {
    pub counters: Arc<Counters>,
    /// Delay inside `new_resource`, to widen the acquisition window
    pub acquire_delay: Duration,
    /// Delay inside each `post_task`
    pub task_delay: Duration,
    pub fail_connect: bool,
    pub fail_tasker: bool,
    pub windows: Vec<DesktopWindow>,
    /// Status per entry; entries not listed succeed
    pub statuses: HashMap<String, TaskStatus>,
    /// Entries and overrides posted, in order
    pub posted: Arc<Mutex<Vec<(String, PipelineOverride)>>>,
    pub bundles: Arc<Mutex<Vec<String>>>,
    pub adb_params: Arc<Mutex<Option<AdbParams>>>,
    pub win32_params: Arc<Mutex<Option<Win32Params>>>,
    /// Result of the agent client's `connect`
    pub agent_connects: bool,
    /// Identifier reported by the agent client; `None` keeps the declared one
    pub agent_identifier: Option<String>,
    /// File the agent child writes once started; `connect` waits for it
    pub agent_ready_file: Option<Utf8PathBuf>,
    /// Agent client calls, in order
    pub agent_calls: Arc<Mutex<Vec<String>>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            acquire_delay: Duration::ZERO,
            task_delay: Duration::ZERO,
            fail_connect: false,
            fail_tasker: false,
            windows: Vec::new(),
            statuses: HashMap::new(),
            posted: Arc::new(Mutex::new(Vec::new())),
            bundles: Arc::new(Mutex::new(Vec::new())),
            adb_params: Arc::new(Mutex::new(None)),
            win32_params: Arc::new(Mutex::new(None)),
            agent_connects: true,
            agent_identifier: None,
            agent_ready_file: None,
            agent_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl FakeBackend {
    pub fn posted_entries(&self) -> Vec<String> {
        self.posted
            .lock()
            .unwrap()
            .iter()
            .map(|(entry, _)| entry.clone())
            .collect()
    }
}

impl AutomationBackend for FakeBackend {
    fn new_resource(&self) -> Result<Box<dyn ResourceHandle>, BackendError> {
        self.counters.acquisitions.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.acquire_delay);
        self.counters.created();
        Ok(Box::new(FakeResource {
            counters: Arc::clone(&self.counters),
            bundles: Arc::clone(&self.bundles),
        }))
    }

    fn new_adb_controller(
        &self,
        params: &AdbParams,
    ) -> Result<Box<dyn ControllerHandle>, BackendError> {
        *self.adb_params.lock().unwrap() = Some(params.clone());
        self.counters.created();
        Ok(Box::new(FakeController {
            counters: Arc::clone(&self.counters),
            fail_connect: self.fail_connect,
        }))
    }

    fn find_desktop_windows(&self) -> Vec<DesktopWindow> {
        self.windows.clone()
    }

    fn new_win32_controller(
        &self,
        params: &Win32Params,
    ) -> Result<Box<dyn ControllerHandle>, BackendError> {
        *self.win32_params.lock().unwrap() = Some(params.clone());
        self.counters.created();
        Ok(Box::new(FakeController {
            counters: Arc::clone(&self.counters),
            fail_connect: self.fail_connect,
        }))
    }

    fn new_agent(&self, identifier: &str) -> Result<Box<dyn AgentHandle>, BackendError> {
        self.agent_calls
            .lock()
            .unwrap()
            .push(format!("new {}", identifier));
        self.counters.created();
        Ok(Box::new(FakeAgent {
            counters: Arc::clone(&self.counters),
            connects: self.agent_connects,
            identifier: self.agent_identifier.clone(),
            ready_file: self.agent_ready_file.clone(),
            calls: Arc::clone(&self.agent_calls),
        }))
    }

    fn new_tasker(&self) -> Result<Box<dyn TaskerHandle>, BackendError> {
        let result: Result<Box<dyn TaskerHandle>, BackendError> = if self.fail_tasker {
            Err(BackendError::new("tasker unavailable"))
        } else {
            self.counters.created();
            Ok(Box::new(FakeTasker {
                counters: Arc::clone(&self.counters),
                task_delay: self.task_delay,
                statuses: self.statuses.clone(),
                posted: Arc::clone(&self.posted),
                running: AtomicBool::new(false),
                stop_requested: AtomicBool::new(false),
            }))
        };
        self.counters.acquisitions_done.fetch_add(1, Ordering::SeqCst);
        result
    }

    fn version(&self) -> String {
        "fake-1.0".to_string()
    }
}

struct FakeResource {
    counters: Arc<Counters>,
    bundles: Arc<Mutex<Vec<String>>>,
}

impl ResourceHandle for FakeResource {
    fn post_bundle(&self, path: &str) -> TaskStatus {
        self.bundles.lock().unwrap().push(path.to_string());
        TaskStatus::Succeeded
    }

    fn destroy(&self) {
        self.counters.destroyed();
    }
}

struct FakeController {
    counters: Arc<Counters>,
    fail_connect: bool,
}

impl ControllerHandle for FakeController {
    fn post_connect(&self) -> TaskStatus {
        if self.fail_connect {
            TaskStatus::Failed
        } else {
            TaskStatus::Succeeded
        }
    }

    fn destroy(&self) {
        self.counters.destroyed();
    }
}

struct FakeAgent {
    counters: Arc<Counters>,
    connects: bool,
    identifier: Option<String>,
    ready_file: Option<Utf8PathBuf>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeAgent {
    fn child_started(&self) -> bool {
        self.ready_file.as_ref().is_some_and(|path| path.exists())
    }

    fn record(&self, call: &str) {
        let call = if self.child_started() {
            format!("{} after spawn", call)
        } else {
            call.to_string()
        };
        self.calls.lock().unwrap().push(call);
    }
}

impl AgentHandle for FakeAgent {
    fn bind_resource(&self, _resource: &dyn ResourceHandle) -> bool {
        self.record("bind");
        true
    }

    fn identifier(&self) -> Option<String> {
        self.identifier.clone()
    }

    fn connect(&self) -> bool {
        // A real client blocks until the child's server is listening
        if self.ready_file.is_some() {
            wait_until(Duration::from_secs(5), || self.child_started());
        }
        self.record("connect");
        self.connects
    }

    fn destroy(&self) {
        self.counters.destroyed();
    }
}

struct FakeTasker {
    counters: Arc<Counters>,
    task_delay: Duration,
    statuses: HashMap<String, TaskStatus>,
    posted: Arc<Mutex<Vec<(String, PipelineOverride)>>>,
    running: AtomicBool,
    stop_requested: AtomicBool,
}

impl TaskerHandle for FakeTasker {
    fn bind_resource(&self, _resource: &dyn ResourceHandle) -> bool {
        true
    }

    fn bind_controller(&self, _controller: &dyn ControllerHandle) -> bool {
        true
    }

    fn post_task(&self, entry: &str, pipeline_override: &PipelineOverride) -> TaskStatus {
        self.running.store(true, Ordering::SeqCst);
        self.posted
            .lock()
            .unwrap()
            .push((entry.to_string(), pipeline_override.clone()));

        let deadline = Instant::now() + self.task_delay;
        while Instant::now() < deadline {
            if self.stop_requested.load(Ordering::SeqCst) {
                self.running.store(false, Ordering::SeqCst);
                return TaskStatus::Failed;
            }
            std::thread::sleep(Duration::from_millis(2));
        }

        self.running.store(false, Ordering::SeqCst);
        self.statuses
            .get(entry)
            .copied()
            .unwrap_or(TaskStatus::Succeeded)
    }

    fn post_stop(&self) -> TaskStatus {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
        self.stop_requested.store(true, Ordering::SeqCst);
        TaskStatus::Succeeded
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn destroy(&self) {
        self.counters.destroyed();
    }
}
