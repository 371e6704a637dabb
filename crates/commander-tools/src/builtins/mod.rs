//! Builtins - Built-in tools for Commander
//!
//! This module provides the core set of built-in tools:
//! - Terminal tools: execute_command, read_output, force_terminate,
//!   list_sessions, list_completed_sessions
//! - Process tools: list_processes, kill_process
//! - Command tools: block_command, unblock_command, list_blocked_commands
//! - File tools: read_file, write_file, list_directory, get_file_info,
//!   create_directory, move_file, list_allowed_directories

mod commands;
mod file;
mod process;
mod terminal;

pub use commands::{BlockCommandTool, ListBlockedCommandsTool, UnblockCommandTool};
pub use file::{
    CreateDirectoryTool, GetFileInfoTool, ListAllowedDirectoriesTool, ListDirectoryTool,
    MoveFileTool, ReadFileTool, WriteFileTool,
};
pub use process::{
    terminate_process, KillOutcome, KillProcessTool, ListProcessesTool, ProcessInfo,
};
pub use terminal::{
    ExecuteCommandTool, ForceTerminateTool, ListCompletedSessionsTool, ListSessionsTool,
    ReadOutputTool,
};

use crate::error::Result;
use crate::gate::{CommandGate, JsonFileStore};
use crate::registry::ToolRegistry;
use crate::sandbox::PathSandbox;
use crate::terminal::{TerminalConfig, TerminalManager};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for built-in tools
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuiltinsConfig {
    /// Terminal session manager settings
    pub terminal: TerminalConfig,
    /// Sandbox whitelist entries (empty = home directory)
    pub allowed_directories: Vec<String>,
    /// JSON file holding the command blocklist (in-memory defaults when unset)
    pub blocklist_file: Option<PathBuf>,
}

/// Shared services the built-in tools operate on
#[derive(Debug, Clone)]
pub struct Builtins {
    /// Terminal session manager
    pub manager: Arc<TerminalManager>,
    /// Command blocklist
    pub gate: Arc<CommandGate>,
    /// Filesystem allow-list
    pub sandbox: Arc<PathSandbox>,
}

impl Builtins {
    /// Build the services from configuration.
    ///
    /// Fails only when the home or working directory cannot be determined.
    pub fn from_config(config: &BuiltinsConfig) -> Result<Self> {
        let gate = Arc::new(match &config.blocklist_file {
            Some(path) => CommandGate::with_store(JsonFileStore::new(path)),
            None => CommandGate::default(),
        });
        let sandbox = Arc::new(PathSandbox::from_env(&config.allowed_directories)?);
        let manager = Arc::new(TerminalManager::new(gate.clone(), config.terminal.clone()));

        Ok(Self {
            manager,
            gate,
            sandbox,
        })
    }
}

/// Register all built-in tools over existing services
pub fn register_builtins(registry: &mut ToolRegistry, builtins: &Builtins) {
    // Terminal tools
    registry.register(Arc::new(ExecuteCommandTool::new(builtins.manager.clone())));
    registry.register(Arc::new(ReadOutputTool::new(builtins.manager.clone())));
    registry.register(Arc::new(ForceTerminateTool::new(builtins.manager.clone())));
    registry.register(Arc::new(ListSessionsTool::new(builtins.manager.clone())));
    registry.register(Arc::new(ListCompletedSessionsTool::new(
        builtins.manager.clone(),
    )));

    // Process tools
    registry.register(Arc::new(ListProcessesTool::new()));
    registry.register(Arc::new(KillProcessTool::new()));

    // Command blocklist tools
    registry.register(Arc::new(BlockCommandTool::new(builtins.gate.clone())));
    registry.register(Arc::new(UnblockCommandTool::new(builtins.gate.clone())));
    registry.register(Arc::new(ListBlockedCommandsTool::new(builtins.gate.clone())));

    // File tools
    registry.register(Arc::new(ReadFileTool::new(builtins.sandbox.clone())));
    registry.register(Arc::new(WriteFileTool::new(builtins.sandbox.clone())));
    registry.register(Arc::new(ListDirectoryTool::new(builtins.sandbox.clone())));
    registry.register(Arc::new(GetFileInfoTool::new(builtins.sandbox.clone())));
    registry.register(Arc::new(CreateDirectoryTool::new(builtins.sandbox.clone())));
    registry.register(Arc::new(MoveFileTool::new(builtins.sandbox.clone())));
    registry.register(Arc::new(ListAllowedDirectoriesTool::new(
        builtins.sandbox.clone(),
    )));
}

/// Build services from `config` and register all built-in tools
pub fn register_builtins_with_config(
    registry: &mut ToolRegistry,
    config: &BuiltinsConfig,
) -> Result<Builtins> {
    let builtins = Builtins::from_config(config)?;
    register_builtins(registry, &builtins);
    Ok(builtins)
}
