//! Defaults for the terminal session manager

// ── Time Constants ─────────────────────────────────────────────────────────

/// Execution timeout when the caller gives none.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
/// Upper bound for caller-supplied timeouts.
pub const MAX_TIMEOUT_MS: u64 = 10 * 60 * 1000; // 10 minutes
/// Interval between output drains while waiting.
pub const POLL_INTERVAL_MS: u64 = 100;
/// Time a process gets to exit after an interrupt.
pub const GRACE_PERIOD_MS: u64 = 500;
/// How long to wait for pipes to close once the child has exited.
pub const EXIT_DRAIN_TIMEOUT_MS: u64 = 250;
/// How long to wait for the exit after an unconditional kill.
pub const KILL_WAIT_MS: u64 = 5000;

// ── Size Constants ─────────────────────────────────────────────────────────

/// Completed sessions kept before FIFO eviction.
pub const MAX_COMPLETED_SESSIONS: usize = 100;
/// Read buffer size per output stream.
pub const READ_CHUNK_BYTES: usize = 4096;

// ── Exit Codes ─────────────────────────────────────────────────────────────

/// Recorded when a force-terminated process reports no exit code.
pub const FORCE_KILLED_EXIT_CODE: i32 = -9;
