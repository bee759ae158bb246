//! Settings loading.

use crate::error::ConfigError;
use serde::Deserialize;
use std::{collections::HashMap, path::Path, time::Duration};

fn default_command_prefix() -> String {
    ".".to_string()
}

fn default_admin_command_prefix() -> String {
    "'".to_string()
}

fn default_max_in_flight() -> usize {
    64
}

fn default_timeout_secs() -> u64 {
    300
}

/// Dispatch settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Prefix of text commands.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Prefix of admin commands (private messages only).
    #[serde(default = "default_admin_command_prefix")]
    pub admin_command_prefix: String,
    /// Module names that `load_init` skips, compared case-insensitively.
    #[serde(default)]
    pub disabled_modules: Vec<String>,
    /// Lower-cased module name → dynamic command names to ignore.
    #[serde(default)]
    pub dynamic_commands_disabled: HashMap<String, Vec<String>>,
    /// Background task limits.
    #[serde(default)]
    pub tasks: TaskSettings,
}

/// Limits for background listener and command tasks.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSettings {
    /// Maximum concurrently running tasks; extra submissions are dropped.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// Per-task timeout in seconds. `0` disables the timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TaskSettings {
    /// Per-task timeout, if enabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            admin_command_prefix: default_admin_command_prefix(),
            disabled_modules: Vec::new(),
            dynamic_commands_disabled: HashMap::new(),
            tasks: TaskSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Whether `module` is disabled.
    pub fn is_module_disabled(&self, module: &str) -> bool {
        self.disabled_modules
            .iter()
            .any(|name| name.eq_ignore_ascii_case(module))
    }

    /// Whether dynamic command `command` of `module` is disabled.
    pub fn is_dynamic_command_disabled(&self, module: &str, command: &str) -> bool {
        self.dynamic_commands_disabled
            .get(&module.to_lowercase())
            .is_some_and(|names| names.iter().any(|name| name == command))
    }
}
