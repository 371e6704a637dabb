//! Command gate - blocklist consulted before any process is spawned
//!
//! Commands are keyed by the lower-cased first whitespace-delimited token of
//! the command line, so `SUDO apt install` and `sudo ls` share the key `sudo`.
//! Mutations are written through a [`BlocklistStore`] when one is attached.

mod store;


pub use store::{BlocklistStore, JsonFileStore};

#[cfg(test)]
pub use store::MockBlocklistStore;

use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

/// Commands blocked when no blocklist has been persisted yet.
pub const DEFAULT_BLOCKED_COMMANDS: &[&str] = &[
    "format", "mount", "umount", "mkfs", "fdisk", "dd",
    "sudo", "su", "passwd", "adduser", "useradd", "usermod", "groupadd",
];

/// Extract the gate key from a command line.
#[must_use]
pub fn base_command(command: &str) -> Option<String> {
    command
        .split_whitespace()
        .next()
        .map(|token| token.to_lowercase())
}

/// Mutable set of blocked command names.
pub struct CommandGate {
    blocked: RwLock<BTreeSet<String>>,
    store: Option<Box<dyn BlocklistStore>>,
}

impl CommandGate {
    /// Create an in-memory gate with no persistence.
    #[must_use]
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            blocked: RwLock::new(to_keys(commands)),
            store: None,
        }
    }

    /// Create a gate backed by `store`, loading its current contents.
    ///
    /// A store that has nothing yet is seeded with
    /// [`DEFAULT_BLOCKED_COMMANDS`]; a store that fails to load falls back to
    /// the defaults without overwriting it.
    pub fn with_store(store: impl BlocklistStore + 'static) -> Self {
        let gate = Self {
            blocked: RwLock::new(BTreeSet::new()),
            store: Some(Box::new(store)),
        };
        gate.reload();
        gate
    }

    /// Re-read the blocklist from the attached store.
    pub fn reload(&self) {
        let Some(store) = &self.store else {
            return;
        };

        let commands = match store.load() {
            Ok(Some(commands)) => to_keys(commands),
            Ok(None) => {
                let defaults = to_keys(DEFAULT_BLOCKED_COMMANDS);
                info!(count = defaults.len(), "Seeding default command blocklist");
                self.persist(&defaults);
                defaults
            }
            Err(e) => {
                warn!(error = %e, "Failed to load command blocklist, using defaults");
                to_keys(DEFAULT_BLOCKED_COMMANDS)
            }
        };

        *self.write() = commands;
    }

    /// Whether `command` may be executed.
    #[must_use]
    pub fn is_allowed(&self, command: &str) -> bool {
        match base_command(command) {
            Some(base) => !self.read().contains(&base),
            None => true,
        }
    }

    /// Block a command. Returns `false` if it was already blocked.
    pub fn block(&self, command: &str) -> bool {
        let Some(key) = base_command(command) else {
            return false;
        };

        let snapshot = {
            let mut blocked = self.write();
            if !blocked.insert(key.clone()) {
                return false;
            }
            blocked.clone()
        };

        info!(command = %key, "Command blocked");
        self.persist(&snapshot);
        true
    }

    /// Unblock a command. Returns `false` if it was not blocked.
    pub fn unblock(&self, command: &str) -> bool {
        let Some(key) = base_command(command) else {
            return false;
        };

        let snapshot = {
            let mut blocked = self.write();
            if !blocked.remove(&key) {
                return false;
            }
            blocked.clone()
        };

        info!(command = %key, "Command unblocked");
        self.persist(&snapshot);
        true
    }

    /// Blocked commands, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.read().iter().cloned().collect()
    }

    fn persist(&self, blocked: &BTreeSet<String>) {
        if let Some(store) = &self.store {
            let commands: Vec<String> = blocked.iter().cloned().collect();
            if let Err(e) = store.save(&commands) {
                warn!(error = %e, "Failed to persist command blocklist");
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeSet<String>> {
        self.blocked.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeSet<String>> {
        self.blocked.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CommandGate {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKED_COMMANDS)
    }
}

impl std::fmt::Debug for CommandGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandGate")
            .field("blocked", &*self.read())
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

fn to_keys<I, S>(commands: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    commands
        .into_iter()
        .filter_map(|c| base_command(c.as_ref()))
        .collect()
}
