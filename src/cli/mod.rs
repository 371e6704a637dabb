//! CLI module for Commander
//!
//! Provides commands that drive the tool registry directly:
//! - `tools` / `call`: inspect and invoke any registered tool
//! - `exec`: run a command and follow its output until it finishes
//! - `check-path`, `dirs`: sandbox inspection
//! - `block`, `unblock`, `blocked`: blocklist administration

use crate::app::{self, App};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

pub mod exec;

/// Commander CLI
#[derive(Parser, Debug)]
#[command(name = "commander")]
#[command(about = "Sandboxed command execution and file access tools")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered tools and their parameters
    Tools {
        /// Print full JSON definitions
        #[arg(long)]
        json: bool,
        /// Include tools disabled in the configuration
        #[arg(long)]
        all: bool,
    },
    /// Invoke a tool with JSON input
    Call {
        /// Tool name
        tool: String,
        /// JSON object passed as input
        #[arg(default_value = "{}")]
        input: String,
    },
    /// Run a command and follow its output until it exits
    Exec {
        /// Command line, run through the shell
        command: String,
        /// How long the first call waits before switching to polling
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Check whether a path is inside the sandbox
    CheckPath {
        /// Path to validate
        path: String,
    },
    /// Add a command to the blocklist
    Block {
        /// Command name
        command: String,
    },
    /// Remove a command from the blocklist
    Unblock {
        /// Command name
        command: String,
    },
    /// Show the blocklist
    Blocked,
    /// Show the allowed directories
    Dirs,
}

/// Run the CLI command
pub async fn run(cli: Cli, config: &app::AppConfig) -> Result<()> {
    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    let app = App::new(config)?;
    match command {
        Commands::Tools { json, all } => list_tools(&app, json, all),
        Commands::Call { tool, input } => {
            let input: serde_json::Value =
                serde_json::from_str(&input).context("Tool input must be valid JSON")?;
            let result = app.registry.call(&tool, input).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Commands::Exec {
            command,
            timeout_ms,
        } => exec::run(&app, &command, timeout_ms).await,
        Commands::CheckPath { path } => {
            match app.builtins.sandbox.validate(&path) {
                Ok(resolved) => println!("allowed: {}", resolved.display()),
                Err(e) => println!("denied: {}", e),
            }
            Ok(())
        }
        Commands::Block { command } => {
            if app.builtins.gate.block(&command) {
                println!("blocked: {}", command);
            } else {
                println!("already blocked: {}", command);
            }
            Ok(())
        }
        Commands::Unblock { command } => {
            if app.builtins.gate.unblock(&command) {
                println!("unblocked: {}", command);
            } else {
                println!("not blocked: {}", command);
            }
            Ok(())
        }
        Commands::Blocked => {
            for command in app.builtins.gate.list() {
                println!("{}", command);
            }
            Ok(())
        }
        Commands::Dirs => {
            for dir in app.builtins.sandbox.allowed_directories() {
                println!("{}", dir.display());
            }
            Ok(())
        }
    }
}

fn list_tools(app: &App, json: bool, all: bool) -> Result<()> {
    let mut definitions = if all {
        app.registry.list_definitions()
    } else {
        app.registry.list_enabled()
    };
    definitions.sort_by(|a, b| a.name.cmp(&b.name));

    if json {
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }

    for def in definitions {
        println!(
            "{:<26} [{:<7}] [{:<6}] {}{}",
            def.name,
            def.category.as_str(),
            def.risk_level.as_str(),
            def.description,
            if def.enabled { "" } else { " (disabled)" }
        );
    }
    Ok(())
}
