use super::{path_schema, sandboxed_path};
use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult};
use crate::sandbox::PathSandbox;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Default maximum entries for directory listing
const DEFAULT_MAX_ENTRIES: u64 = 1000;

/// Tool for listing directory contents
pub struct ListDirectoryTool {
    definition: ToolDefinition,
    sandbox: Arc<PathSandbox>,
}

impl ListDirectoryTool {
    /// Create a new directory listing tool
    #[must_use]
    pub fn new(sandbox: Arc<PathSandbox>) -> Self {
        let mut parameters = path_schema("Path to the directory to list");
        parameters["properties"]["max_entries"] = serde_json::json!({
            "type": "integer",
            "description": "Maximum entries to return",
            "default": DEFAULT_MAX_ENTRIES
        });

        let definition = ToolDefinition::new(
            "list_directory",
            "List files and directories in a path, marked [FILE] or [DIR]. \
             Only works within allowed directories",
        )
        .with_category(ToolCategory::File)
        .with_risk_level(RiskLevel::Low)
        .with_parameters(parameters);

        Self {
            definition,
            sandbox,
        }
    }
}

#[async_trait::async_trait]
impl Tool for ListDirectoryTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let dir_path = sandboxed_path(&self.sandbox, &input, "path")?;

        let max_entries = input
            .get("max_entries")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_MAX_ENTRIES) as usize;

        debug!(path = %dir_path.display(), "Listing directory");

        let mut entries = Vec::new();
        let mut truncated = false;
        let mut dir = tokio::fs::read_dir(&dir_path).await.map_err(Error::Io)?;
        while let Some(entry) = dir.next_entry().await.map_err(Error::Io)? {
            if entries.len() >= max_entries {
                truncated = true;
                break;
            }
            // follows symlinks, so a link to a directory lists as [DIR]
            let is_dir = tokio::fs::metadata(entry.path())
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
        }
        entries.sort();

        let listing = if entries.is_empty() {
            format!("Directory {} is empty", dir_path.display())
        } else {
            entries
                .iter()
                .map(|(name, is_dir)| {
                    format!("{} {}", if *is_dir { "[DIR]" } else { "[FILE]" }, name)
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let entries: Vec<_> = entries
            .into_iter()
            .map(|(name, is_dir)| serde_json::json!({ "name": name, "is_dir": is_dir }))
            .collect();

        Ok(ToolResult::success(
            serde_json::json!({
                "path": dir_path.display().to_string(),
                "listing": listing,
                "entries": entries,
                "count": entries.len(),
                "truncated": truncated
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}

/// Tool that reports the effective allow-list
pub struct ListAllowedDirectoriesTool {
    definition: ToolDefinition,
    sandbox: Arc<PathSandbox>,
}

impl ListAllowedDirectoriesTool {
    /// Create a new allowed directories tool
    #[must_use]
    pub fn new(sandbox: Arc<PathSandbox>) -> Self {
        let definition = ToolDefinition::new(
            "list_allowed_directories",
            "List the directories this server may access",
        )
        .with_category(ToolCategory::Config)
        .with_risk_level(RiskLevel::Low)
        .with_parameters(serde_json::json!({"type": "object", "properties": {}}));

        Self {
            definition,
            sandbox,
        }
    }
}

#[async_trait::async_trait]
impl Tool for ListAllowedDirectoriesTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let directories: Vec<String> = self
            .sandbox
            .allowed_directories()
            .iter()
            .map(|d| d.display().to_string())
            .collect();

        Ok(ToolResult::success(
            serde_json::json!({ "directories": directories }),
            start.elapsed().as_millis() as u64,
        ))
    }
}
