//! Session records

use super::process::ProcessHandle;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

/// A spawned child not yet known to have exited.
#[derive(Debug)]
pub(crate) struct Session {
    pub pid: u32,
    pub command: String,
    pub handle: ProcessHandle,
    /// Output since the last read.
    buffered: Vec<u8>,
    /// Everything the child has produced so far.
    full_output: Vec<u8>,
    pub is_blocked: bool,
    pub started_at: DateTime<Utc>,
    pub started: Instant,
}

impl Session {
    pub fn new(pid: u32, command: impl Into<String>, handle: ProcessHandle) -> Self {
        Self {
            pid,
            command: command.into(),
            handle,
            buffered: Vec::new(),
            full_output: Vec::new(),
            is_blocked: false,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Non-blocking drain of whatever the child has written so far.
    /// Returns the number of bytes pulled in.
    pub fn drain(&mut self) -> usize {
        let mut chunk = Vec::new();
        self.handle.try_drain(&mut chunk);
        if !chunk.is_empty() {
            self.full_output.extend_from_slice(&chunk);
            self.buffered.extend_from_slice(&chunk);
        }
        chunk.len()
    }

    /// Take the buffered output as text.
    ///
    /// An incomplete UTF-8 sequence at the end stays buffered for the next
    /// read instead of being mangled.
    pub fn take_buffered(&mut self) -> String {
        let cut = utf8_boundary(&self.buffered);
        let rest = self.buffered.split_off(cut);
        let taken = std::mem::replace(&mut self.buffered, rest);
        String::from_utf8_lossy(&taken).into_owned()
    }

    pub fn full_output(&self) -> String {
        String::from_utf8_lossy(&self.full_output).into_owned()
    }

    pub fn runtime_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Freeze into a completed record.
    pub fn complete(mut self, exit_code: i32) -> CompletedSession {
        self.drain();
        CompletedSession {
            pid: self.pid,
            command: self.command,
            output: String::from_utf8_lossy(&self.full_output).into_owned(),
            exit_code,
            started_at: self.started_at,
            ended_at: Utc::now(),
        }
    }

    pub fn info(&self) -> ActiveSessionInfo {
        ActiveSessionInfo {
            pid: self.pid,
            command: self.command.clone(),
            is_blocked: self.is_blocked,
            runtime_ms: self.runtime_ms(),
        }
    }
}

/// Length of the longest prefix that doesn't end inside a UTF-8 sequence.
fn utf8_boundary(bytes: &[u8]) -> usize {
    match std::str::from_utf8(bytes) {
        Ok(_) => bytes.len(),
        // error_len None means the input ended mid-sequence
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => bytes.len(),
    }
}

/// Immutable record of a finished or force-terminated process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedSession {
    /// Process id
    pub pid: u32,
    /// Command line as submitted
    pub command: String,
    /// Everything the process wrote to stdout and stderr
    pub output: String,
    /// Exit code; negative signal number or -9 when killed
    pub exit_code: i32,
    /// Spawn time
    pub started_at: DateTime<Utc>,
    /// Time the exit was recorded
    pub ended_at: DateTime<Utc>,
}

impl CompletedSession {
    /// Wall-clock runtime in seconds.
    #[must_use]
    pub fn runtime_secs(&self) -> f64 {
        (self.ended_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// Listing entry without the output.
    #[must_use]
    pub fn info(&self) -> CompletedSessionInfo {
        CompletedSessionInfo {
            pid: self.pid,
            command: self.command.clone(),
            exit_code: self.exit_code,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }
}

/// Store entry: either still running or finished.
#[derive(Debug)]
pub(crate) enum SessionRecord {
    Active(Session),
    Completed(CompletedSession),
}

/// Snapshot of an active session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveSessionInfo {
    /// Process id
    pub pid: u32,
    /// Command line
    pub command: String,
    /// Whether the execution timeout elapsed while it was running
    pub is_blocked: bool,
    /// Time since spawn
    pub runtime_ms: u64,
}

/// Snapshot of a completed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedSessionInfo {
    /// Process id
    pub pid: u32,
    /// Command line
    pub command: String,
    /// Exit code
    pub exit_code: i32,
    /// Spawn time
    pub started_at: DateTime<Utc>,
    /// Completion time
    pub ended_at: DateTime<Utc>,
}

/// Result of [`execute`](super::TerminalManager::execute).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Process id, usable with `read_output` and `force_terminate`
    pub pid: u32,
    /// Output collected before returning
    pub output: String,
    /// The timeout elapsed and the process keeps running in the background
    pub still_running: bool,
    /// Exit code when the process finished within the timeout
    pub exit_code: Option<i32>,
}

/// Result of [`read_output`](super::TerminalManager::read_output).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutput {
    /// Output produced since the previous read
    NewOutput(String),
    /// Still running, nothing new
    NoNewOutput,
    /// The process finished; this consumed its record
    Completed(CompletedSession),
}

impl std::fmt::Display for ReadOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NewOutput(output) => write!(f, "{}", output),
            Self::NoNewOutput => write!(f, "No new output available"),
            Self::Completed(c) => write!(
                f,
                "Process completed with exit code {}\nRuntime: {:.2}s\nFinal output:\n{}",
                c.exit_code,
                c.runtime_secs(),
                c.output
            ),
        }
    }
}
