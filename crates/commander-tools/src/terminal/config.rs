//! Terminal session manager configuration

use super::constants::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the terminal session manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Timeout used when the caller gives none.
    pub default_timeout_ms: u64,
    /// Upper bound for caller-supplied timeouts.
    pub max_timeout_ms: u64,
    /// Interval between non-blocking output drains.
    pub poll_interval_ms: u64,
    /// Time between the interrupt and the unconditional kill.
    pub grace_period_ms: u64,
    /// Completed sessions retained before the oldest is evicted.
    pub max_completed_sessions: usize,
    /// Cap on concurrently running sessions. `None` means unlimited.
    pub max_active_sessions: Option<usize>,
    /// Shell used to run command lines (`/bin/sh` or `cmd` when unset).
    pub shell: Option<String>,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            max_timeout_ms: MAX_TIMEOUT_MS,
            poll_interval_ms: POLL_INTERVAL_MS,
            grace_period_ms: GRACE_PERIOD_MS,
            max_completed_sessions: MAX_COMPLETED_SESSIONS,
            max_active_sessions: None,
            shell: None,
        }
    }
}

impl TerminalConfig {
    /// Effective execution timeout for a request.
    #[must_use]
    pub fn timeout(&self, requested: Option<Duration>) -> Duration {
        let requested = requested.unwrap_or(Duration::from_millis(self.default_timeout_ms));
        requested.min(Duration::from_millis(self.max_timeout_ms))
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub(crate) fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_defaults_and_clamps() {
        let config = TerminalConfig {
            default_timeout_ms: 1000,
            max_timeout_ms: 5000,
            ..TerminalConfig::default()
        };
        assert_eq!(config.timeout(None), Duration::from_millis(1000));
        assert_eq!(
            config.timeout(Some(Duration::from_millis(200))),
            Duration::from_millis(200)
        );
        assert_eq!(
            config.timeout(Some(Duration::from_secs(60))),
            Duration::from_millis(5000)
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let config: TerminalConfig =
            serde_json::from_value(serde_json::json!({"grace_period_ms": 50})).unwrap();
        assert_eq!(config.grace_period_ms, 50);
        assert_eq!(config.max_completed_sessions, MAX_COMPLETED_SESSIONS);
    }
}
