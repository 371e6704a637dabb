//! Application wiring
//!
//! Loads configuration, installs logging and builds the tool registry the
//! protocol layer dispatches into.

pub mod config;
pub mod loader;
pub mod telemetry;

pub use self::config::AppConfig;
pub use loader::load_config;

use anyhow::{Context, Result};
use commander_tools::{register_builtins_with_config, Builtins, ToolRegistry};
use tracing::{info, warn};

/// Registry plus the services behind it
pub struct App {
    pub registry: ToolRegistry,
    pub builtins: Builtins,
}

impl App {
    /// Build the registry from configuration.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut registry = ToolRegistry::new();
        let builtins = register_builtins_with_config(&mut registry, &config.builtins())
            .context("Failed to initialise built-in tools")?;
        for name in &config.tools.disabled {
            if !registry.disable(name) {
                warn!(tool = %name, "Cannot disable unknown tool");
            }
        }

        info!(
            tools = registry.list_enabled().len(),
            allowed_dirs = builtins.sandbox.allowed_directories().len(),
            blocked_commands = builtins.gate.list().len(),
            "Tool registry ready"
        );
        Ok(Self { registry, builtins })
    }
}
