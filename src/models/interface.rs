use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;

/// Per-entry pipeline override document.
///
/// Maps a pipeline entry name to the properties that replace the entry's
/// defaults when a task is posted. Both levels keep declaration order so
/// compiled documents are deterministic.
pub type PipelineOverride = IndexMap<String, Map<String, Value>>;

/// Validated project interface (schema v2).
///
/// Produced once by [`crate::schema::parse_interface`] and never mutated
/// afterwards. Every cross-reference inside it (resource → controller,
/// task → resource/option, case → option, default case) is known to resolve.
#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub label: Option<String>,
    pub title: Option<String>,
    pub icon: Option<String>,
    pub version: Option<String>,
    pub github: Option<String>,
    pub contact: Option<String>,
    pub license: Option<String>,
    pub welcome: Option<String>,
    pub description: Option<String>,
    pub mirrorchyan_rid: Option<String>,
    pub mirrorchyan_multiplatform: bool,

    /// Language code → translation file path (relative to the schema file)
    pub languages: IndexMap<String, String>,

    pub controllers: Vec<Controller>,
    pub resources: Vec<Resource>,
    pub agent: Option<Agent>,
    pub tasks: Vec<Task>,
    pub options: IndexMap<String, OptionDef>,
}

impl Interface {
    pub fn find_controller(&self, name: &str) -> Option<&Controller> {
        self.controllers.iter().find(|c| c.name == name)
    }

    pub fn find_resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn find_task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// First declared controller of the given kind
    pub fn first_controller_of(&self, kind: ControllerKind) -> Option<&Controller> {
        self.controllers.iter().find(|c| c.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerKind {
    Adb,
    Win32,
}

impl ControllerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ControllerKind::Adb => "Adb",
            ControllerKind::Win32 => "Win32",
        }
    }

    /// Parse the exact (case-sensitive) type name used in schema and config files
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Adb" => Some(ControllerKind::Adb),
            "Win32" => Some(ControllerKind::Win32),
            _ => None,
        }
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Screen scaling requested by a controller. At most one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayOption {
    ShortSide(i64),
    LongSide(i64),
    Raw,
}

#[derive(Debug, Clone)]
pub struct Controller {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub kind: ControllerKind,
    pub display: Option<DisplayOption>,
    pub win32: Option<Win32Settings>,
}

/// Window matching and input method names for a Win32 controller.
///
/// The regexes and method names are kept as written; they are compiled and
/// parsed when a session is acquired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Win32Settings {
    pub class_regex: String,
    pub window_regex: String,
    pub mouse: String,
    pub keyboard: String,
    pub screencap: String,
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    /// Bundle paths, relative to the application directory
    pub paths: Vec<String>,
    pub controllers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub child_exec: String,
    pub child_args: Vec<String>,
    pub identifier: String,
}

#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub label: Option<String>,
    pub entry: String,
    pub default_check: bool,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub resources: Vec<String>,
    pub pipeline_override: Option<PipelineOverride>,
    pub options: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OptionDef {
    pub label: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub kind: OptionKind,
    /// Option-level fragment; only consulted for input options
    pub pipeline_override: Option<PipelineOverride>,
}

#[derive(Debug, Clone)]
pub enum OptionKind {
    Select(ChoiceOption),
    Switch(ChoiceOption),
    Input(Vec<Input>),
}

impl OptionKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionKind::Select(_) => "select",
            OptionKind::Switch(_) => "switch",
            OptionKind::Input(_) => "input",
        }
    }
}

/// Cases of a select or switch option
#[derive(Debug, Clone)]
pub struct ChoiceOption {
    pub cases: Vec<Case>,
    pub default_case: Option<String>,
}

impl ChoiceOption {
    pub fn find_case(&self, name: &str) -> Option<&Case> {
        self.cases.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Case {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    /// Nested option references activated while this case is selected
    pub options: Vec<String>,
    pub pipeline_override: Option<PipelineOverride>,
}

#[derive(Debug, Clone)]
pub struct Input {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub default: String,
    pub kind: InputKind,
    pub verify: Option<Regex>,
    pub pattern_msg: Option<String>,
}

impl Input {
    /// Value used when neither a stored value nor an explicit default exists
    pub fn fallback_value(&self) -> &'static str {
        match self.kind {
            InputKind::Bool => "false",
            InputKind::Int => "0",
            InputKind::String => "",
        }
    }

    /// Check a user-entered value against the declared pattern, if any
    pub fn accepts(&self, value: &str) -> bool {
        self.verify.as_ref().is_none_or(|re| re.is_match(value))
    }
}

/// How an input value is typed when substituted into an override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputKind {
    #[default]
    String,
    Bool,
    Int,
}

impl InputKind {
    /// Map a `pipeline_type` value; unknown or empty types are plain strings
    pub fn from_pipeline_type(value: &str) -> Self {
        match value {
            "bool" => InputKind::Bool,
            "int" => InputKind::Int,
            _ => InputKind::String,
        }
    }
}
