use serde::{Deserialize, Serialize};

/// Application settings from `config/settings.yaml` and `MUU_*` variables.
///
/// All paths are relative to the application directory unless absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_interface_file")]
    pub interface_file: String,

    #[serde(default = "default_config_file")]
    pub config_file: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default)]
    pub debug_mode: bool,

    #[serde(default = "default_console_log")]
    pub console_log: bool,

    /// Timeout for fetching remote description text
    #[serde(default = "default_content_timeout")]
    pub content_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            interface_file: default_interface_file(),
            config_file: default_config_file(),
            log_dir: default_log_dir(),
            debug_mode: false,
            console_log: default_console_log(),
            content_timeout_secs: default_content_timeout(),
        }
    }
}

fn default_interface_file() -> String {
    "interface.json".to_string()
}

fn default_config_file() -> String {
    "interface_config.json".to_string()
}

fn default_log_dir() -> String {
    "log".to_string()
}

fn default_console_log() -> bool {
    true
}

fn default_content_timeout() -> u64 {
    10
}
