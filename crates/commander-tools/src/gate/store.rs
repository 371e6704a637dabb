//! Blocklist persistence

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the command blocklist lives between runs.
#[cfg_attr(test, mockall::automock)]
pub trait BlocklistStore: Send + Sync {
    /// Load the persisted blocklist, `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<Vec<String>>>;

    /// Replace the persisted blocklist.
    fn save(&self, commands: &[String]) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlocklistFile {
    #[serde(default)]
    blocked_commands: Vec<String>,
    /// Keys owned by other components sharing the file.
    #[serde(flatten)]
    other: serde_json::Map<String, serde_json::Value>,
}

/// JSON file store: `{"blockedCommands": [...]}`.
///
/// Other top-level keys in the file are preserved on save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<Option<BlocklistFile>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

impl BlocklistStore for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<String>>> {
        Ok(self.read_file()?.map(|file| file.blocked_commands))
    }

    fn save(&self, commands: &[String]) -> Result<()> {
        // an unreadable file is replaced rather than blocking the save
        let mut file = self.read_file().ok().flatten().unwrap_or_default();
        file.blocked_commands = commands.to_vec();
        file.blocked_commands.sort();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        debug!(path = %self.path.display(), count = commands.len(), "Blocklist saved");
        Ok(())
    }
}
