//! Error types for commander-tools

use thiserror::Error;

/// Tool error type
#[derive(Debug, Error)]
pub enum Error {
    /// The command's base token is on the blocklist
    #[error("command not allowed: {0}")]
    CommandBlocked(String),

    /// The OS refused to create the child process
    #[error("failed to spawn process: {0}")]
    SpawnFailed(String),

    /// No active or completed session for this pid
    #[error("no session found for PID {0}")]
    SessionNotFound(u32),

    /// Path resolved outside the allowed directories
    #[error("access denied - {path} is outside the allowed directories: {}", .allowed.join(", "))]
    AccessDenied {
        /// The path as resolved by the validator
        path: String,
        /// The effective allow-list at the time of the check
        allowed: Vec<String>,
    },

    /// Tool not found
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Tool execution failed
    #[error("execution failed: {0}")]
    Execution(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error is an expected outcome that should be reported to
    /// the caller as a failed result instead of aborting the call.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CommandBlocked(_) | Self::SessionNotFound(_) | Self::AccessDenied { .. }
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
