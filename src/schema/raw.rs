//! Serde mirror of the on-disk schema.
//!
//! Type discriminators stay as text here so the validator can report them
//! with their position instead of failing inside serde.

use crate::models::PipelineOverride;
use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct VersionProbe {
    #[serde(default)]
    pub interface_version: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawInterface {
    pub interface_version: i64,
    pub languages: IndexMap<String, String>,
    pub name: String,
    pub label: Option<String>,
    pub title: Option<String>,
    pub icon: Option<String>,
    pub mirrorchyan_rid: Option<String>,
    pub mirrorchyan_multiplatform: bool,
    pub github: Option<String>,
    pub version: Option<String>,
    pub contact: Option<String>,
    pub license: Option<String>,
    pub welcome: Option<String>,
    pub description: Option<String>,
    pub controller: Vec<RawController>,
    pub resource: Vec<RawResource>,
    pub agent: Option<RawAgent>,
    pub task: Vec<RawTask>,
    pub option: IndexMap<String, RawOption>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawController {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub display_short_side: Option<i64>,
    pub display_long_side: Option<i64>,
    pub display_raw: bool,
    pub win32: Option<RawWin32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawWin32 {
    pub class_regex: String,
    pub window_regex: String,
    pub mouse: String,
    pub keyboard: String,
    pub screencap: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawResource {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub path: Vec<String>,
    pub controller: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawAgent {
    pub child_exec: String,
    pub child_args: Vec<String>,
    pub identifier: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawTask {
    pub name: String,
    pub label: Option<String>,
    pub entry: String,
    pub default_check: bool,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub resource: Vec<String>,
    pub pipeline_override: Option<PipelineOverride>,
    pub option: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawOption {
    #[serde(rename = "type")]
    pub kind: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub cases: Vec<RawCase>,
    pub inputs: Vec<RawInput>,
    pub pipeline_override: Option<PipelineOverride>,
    pub default_case: String,
}

impl RawOption {
    /// An omitted type means `select`
    pub fn type_name(&self) -> &str {
        if self.kind.is_empty() {
            "select"
        } else {
            &self.kind
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawCase {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub option: Vec<String>,
    pub pipeline_override: Option<PipelineOverride>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawInput {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub default: String,
    pub pipeline_type: String,
    pub verify: String,
    pub pattern_msg: Option<String>,
}
