//! Commander Tools - sandboxed command execution and file access
//!
//! This crate provides the tool system for Commander:
//! - Terminal: bounded-time command execution with resumable sessions
//! - Gate: command blocklist consulted before anything is spawned
//! - Sandbox: allow-list validation for every filesystem path
//! - Process tools: system process listing and SIGTERM/SIGKILL termination
//! - Registry: tool registration, discovery and invocation
//! - Builtins: the tools exposing all of the above

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builtins;
pub mod error;
pub mod gate;
pub mod registry;
pub mod sandbox;
pub mod terminal;

pub use builtins::{register_builtins, register_builtins_with_config, Builtins, BuiltinsConfig};
pub use error::{Error, Result};
pub use gate::{BlocklistStore, CommandGate, JsonFileStore, DEFAULT_BLOCKED_COMMANDS};
pub use registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult, ToolRegistry};
pub use sandbox::PathSandbox;
pub use terminal::{
    ActiveSessionInfo, CompletedSession, CompletedSessionInfo, ExecutionResult, ReadOutput,
    SessionStore, TerminalConfig, TerminalManager,
};
