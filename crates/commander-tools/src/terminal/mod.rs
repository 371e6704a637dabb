//! Terminal session manager
//!
//! Runs shell commands as child processes with bounded-time execution:
//! - `execute` returns within its timeout, leaving slow commands running
//! - `read_output` drains new output or reports the final summary once
//! - `force_terminate` interrupts, then kills after a grace period
//! - `list_active` / `list_completed` snapshot the session store

pub mod config;
pub mod constants;
mod manager;
mod process;
mod session;
mod store;

#[cfg(test)]
mod tests;

pub use config::TerminalConfig;
pub use manager::TerminalManager;
pub use session::{
    ActiveSessionInfo, CompletedSession, CompletedSessionInfo, ExecutionResult, ReadOutput,
};
pub use store::SessionStore;
