//! Terminal session manager

use super::config::TerminalConfig;
use super::constants::{EXIT_DRAIN_TIMEOUT_MS, FORCE_KILLED_EXIT_CODE, KILL_WAIT_MS};
use super::process::{self, ExitWatch};
use super::session::{
    ActiveSessionInfo, CompletedSession, CompletedSessionInfo, ExecutionResult, ReadOutput,
    Session,
};
use super::store::SessionStore;
use crate::error::{Error, Result};
use crate::gate::CommandGate;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Spawns shell commands and tracks them as sessions.
///
/// `execute` returns within its timeout whether or not the command has
/// finished; an unfinished command stays queryable through `read_output`
/// and can be cancelled with `force_terminate`.
#[derive(Debug, Clone)]
pub struct TerminalManager {
    store: Arc<SessionStore>,
    gate: Arc<CommandGate>,
    config: TerminalConfig,
}

impl TerminalManager {
    /// Create a manager with its own session store.
    #[must_use]
    pub fn new(gate: Arc<CommandGate>, config: TerminalConfig) -> Self {
        let store = Arc::new(SessionStore::new(config.max_completed_sessions));
        Self::with_store(store, gate, config)
    }

    /// Create a manager over an existing session store.
    #[must_use]
    pub fn with_store(
        store: Arc<SessionStore>,
        gate: Arc<CommandGate>,
        config: TerminalConfig,
    ) -> Self {
        Self {
            store,
            gate,
            config,
        }
    }

    /// Session store backing this manager.
    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Command gate consulted before spawning.
    #[must_use]
    pub fn gate(&self) -> &Arc<CommandGate> {
        &self.gate
    }

    /// Manager configuration.
    #[must_use]
    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    /// Run `command` through the shell, waiting at most `timeout`.
    ///
    /// The returned output counts as a read: a following `read_output` only
    /// reports what the process writes after this call returns. Dropping the
    /// returned future leaves the command running as an ordinary session.
    pub async fn execute(&self, command: &str, timeout: Option<Duration>) -> Result<ExecutionResult> {
        let command = command.trim();
        if command.is_empty() {
            return Err(Error::InvalidInput("command must not be empty".to_string()));
        }
        if !self.gate.is_allowed(command) {
            warn!(command = %command, "Command blocked");
            return Err(Error::CommandBlocked(command.to_string()));
        }
        if let Some(max) = self.config.max_active_sessions {
            if self.store.active_count() >= max {
                return Err(Error::InvalidInput(format!(
                    "too many active sessions (limit {})",
                    max
                )));
            }
        }

        let timeout = self.config.timeout(timeout);
        let (pid, handle) = process::spawn_shell(command, self.config.shell.as_deref())?;
        let mut watch = handle.watch();
        self.store.insert(Session::new(pid, command, handle));
        // finalises the session even if this future is dropped mid-wait
        self.spawn_completion_watcher(pid, watch.clone());
        info!(pid = %pid, command = %command, timeout_ms = timeout.as_millis() as u64, "Command started");

        let deadline = Instant::now() + timeout;
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let exit_code = loop {
            tokio::select! {
                code = watch.wait_exit() => break Some(code),
                _ = tokio::time::sleep_until(deadline) => break None,
                _ = ticker.tick() => {
                    if let Some(bytes) = self.store.drain(pid).filter(|n| *n > 0) {
                        debug!(pid = %pid, bytes, "Output drained");
                    }
                }
            }
        };

        match exit_code {
            Some(code) => {
                watch
                    .wait_output_closed(Duration::from_millis(EXIT_DRAIN_TIMEOUT_MS))
                    .await;
                let completed = self.complete(pid, code);
                Ok(ExecutionResult {
                    pid,
                    output: completed.map(|c| c.output).unwrap_or_default(),
                    still_running: false,
                    exit_code: Some(code),
                })
            }
            None => {
                let output = self.store.mark_blocked(pid);
                match output {
                    Some(output) => {
                        info!(pid = %pid, "Command still running after timeout");
                        Ok(ExecutionResult {
                            pid,
                            output,
                            still_running: true,
                            exit_code: None,
                        })
                    }
                    // finalised concurrently (e.g. force terminated)
                    None => {
                        let completed = self.store.completed_snapshot(pid);
                        Ok(ExecutionResult {
                            pid,
                            output: completed
                                .as_ref()
                                .map(|c| c.output.clone())
                                .unwrap_or_default(),
                            still_running: false,
                            exit_code: completed.map(|c| c.exit_code),
                        })
                    }
                }
            }
        }
    }

    /// New output of an active session, or the summary of a completed one.
    pub fn read_output(&self, pid: u32) -> Result<ReadOutput> {
        self.store.read(pid)
    }

    /// Interrupt an active session, escalating to a kill after the grace
    /// period. Returns `false` if `pid` is not an active session.
    pub async fn force_terminate(&self, pid: u32) -> bool {
        let Some((kill_switch, mut watch)) = self.store.begin_termination(pid) else {
            return false;
        };
        info!(pid = %pid, "Terminating session");

        let mut exit_code = watch.exit_code();
        if exit_code.is_none() && process::interrupt(pid) {
            exit_code = tokio::time::timeout(self.config.grace_period(), watch.wait_exit())
                .await
                .ok();
        }

        let exit_code = match exit_code {
            Some(code) => code,
            None => {
                warn!(pid = %pid, "Process ignored interrupt, killing");
                process::kill(pid, kill_switch);
                tokio::time::timeout(Duration::from_millis(KILL_WAIT_MS), watch.wait_exit())
                    .await
                    .unwrap_or(FORCE_KILLED_EXIT_CODE)
            }
        };

        watch
            .wait_output_closed(Duration::from_millis(EXIT_DRAIN_TIMEOUT_MS))
            .await;
        self.complete(pid, exit_code);
        true
    }

    /// Snapshot of the active sessions.
    #[must_use]
    pub fn list_active(&self) -> Vec<ActiveSessionInfo> {
        self.store.active()
    }

    /// Snapshot of the retained completed sessions, oldest first.
    #[must_use]
    pub fn list_completed(&self) -> Vec<CompletedSessionInfo> {
        self.store.completed()
    }

    /// Finalise `pid`, or return the record another task already made.
    fn complete(&self, pid: u32, exit_code: i32) -> Option<CompletedSession> {
        match self.store.finalize(pid, exit_code) {
            Some(completed) => {
                info!(pid = %pid, exit_code = completed.exit_code, "Command completed");
                Some(completed)
            }
            None => self.store.completed_snapshot(pid),
        }
    }

    fn spawn_completion_watcher(&self, pid: u32, mut watch: ExitWatch) {
        let manager = self.clone();
        tokio::spawn(async move {
            let code = watch.wait_exit().await;
            watch
                .wait_output_closed(Duration::from_millis(EXIT_DRAIN_TIMEOUT_MS))
                .await;
            if manager.store.finalize(pid, code).is_some() {
                info!(pid = %pid, exit_code = code, "Command completed");
            }
        });
    }
}
