//! Application configuration types

use commander_tools::{BuiltinsConfig, TerminalConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub terminal: TerminalConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Tool exposure configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Registered but refused by the dispatcher and hidden from listings
    #[serde(default)]
    pub disabled: Vec<String>,
}

/// Filesystem sandbox configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Whitelist entries; empty means the home directory
    #[serde(default)]
    pub allowed_directories: Vec<String>,
}

/// Command blocklist configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// JSON file persisting the blocklist; in-memory defaults when unset
    #[serde(default)]
    pub blocklist_file: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Additional log file, appended to
    #[serde(default)]
    pub file: Option<String>,
}

impl AppConfig {
    /// Settings for the built-in tools.
    pub fn builtins(&self) -> BuiltinsConfig {
        let home = dirs::home_dir();
        BuiltinsConfig {
            terminal: self.terminal.clone(),
            allowed_directories: self.sandbox.allowed_directories.clone(),
            blocklist_file: self
                .commands
                .blocklist_file
                .as_deref()
                .map(|p| expand_home(p, home.as_deref())),
        }
    }

    /// Log file path, if configured.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.logging
            .file
            .as_deref()
            .map(|p| expand_home(p, dirs::home_dir().as_deref()))
    }
}

/// Expand a leading `~` against `home`.
pub fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if path == "~" => home.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    }
}
