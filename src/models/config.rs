use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User configuration persisted as `interface_config.json`.
///
/// Mirrors the user's choices against the loaded interface. It is stored
/// independently of the schema and may drift from it; see
/// [`crate::config::sync_config`] for reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    #[serde(default)]
    pub controller: ConfigController,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adb: Option<ConfigAdb>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win32: Option<ConfigWin32>,

    #[serde(default)]
    pub resource: String,

    #[serde(default)]
    pub task: Vec<ConfigTask>,
}

impl InterfaceConfig {
    pub fn find_task(&self, id: &str) -> Option<&ConfigTask> {
        self.task.iter().find(|t| t.id == id)
    }

    pub fn find_task_mut(&mut self, id: &str) -> Option<&mut ConfigTask> {
        self.task.iter_mut().find(|t| t.id == id)
    }
}

/// Selected controller, by name and type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigController {
    #[serde(default)]
    pub name: String,

    /// `"Adb"` or `"Win32"`; kept as text so a hand-edited file still loads
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Connection settings for an Adb controller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigAdb {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub adb_path: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,

    /// Free-form backend configuration forwarded as JSON
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
}

/// Win32 controller settings. Window selection comes from the interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigWin32 {}

/// One stored option value. Input values use `option.input` keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigTaskOption {
    pub name: String,
    pub value: String,
}

impl ConfigTaskOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigTask {
    pub id: String,
    pub name: String,
    pub checked: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub option: Vec<ConfigTaskOption>,
}

impl ConfigTask {
    /// Stored values keyed by option name; the first occurrence of a key wins
    pub fn option_values(&self) -> OptionValues {
        let mut values = OptionValues::new();
        for opt in &self.option {
            values
                .entry(opt.name.clone())
                .or_insert_with(|| opt.value.clone());
        }
        values
    }

    pub fn option_value(&self, name: &str) -> Option<&str> {
        self.option
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.value.as_str())
    }

    /// Set (or append) a stored option value
    pub fn set_option(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.option.iter_mut().find(|o| o.name == name) {
            Some(existing) => existing.value = value,
            None => self.option.push(ConfigTaskOption::new(name, value)),
        }
    }
}

/// Ordered option values keyed by option name or `option.input`
pub type OptionValues = IndexMap<String, String>;
