use super::{path_schema, sandboxed_path};
use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult};
use crate::sandbox::PathSandbox;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Tool that creates a directory, including missing parents
pub struct CreateDirectoryTool {
    definition: ToolDefinition,
    sandbox: Arc<PathSandbox>,
}

impl CreateDirectoryTool {
    /// Create a new directory creation tool
    #[must_use]
    pub fn new(sandbox: Arc<PathSandbox>) -> Self {
        let definition = ToolDefinition::new(
            "create_directory",
            "Create a directory or make sure it exists, including parents. \
             Only works within allowed directories",
        )
        .with_category(ToolCategory::File)
        .with_risk_level(RiskLevel::Medium)
        .with_parameters(path_schema("Directory to create"));

        Self {
            definition,
            sandbox,
        }
    }
}

#[async_trait::async_trait]
impl Tool for CreateDirectoryTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let dir_path = sandboxed_path(&self.sandbox, &input, "path")?;

        tokio::fs::create_dir_all(&dir_path)
            .await
            .map_err(Error::Io)?;
        info!(path = %dir_path.display(), "Directory created");

        Ok(ToolResult::success(
            serde_json::json!({
                "path": dir_path.display().to_string(),
                "message": format!("Successfully created directory {}", dir_path.display())
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}

/// Tool that moves or renames a file or directory
pub struct MoveFileTool {
    definition: ToolDefinition,
    sandbox: Arc<PathSandbox>,
}

impl MoveFileTool {
    /// Create a new move tool
    #[must_use]
    pub fn new(sandbox: Arc<PathSandbox>) -> Self {
        let definition = ToolDefinition::new(
            "move_file",
            "Move or rename a file or directory. Both paths must be within allowed directories",
        )
        .with_category(ToolCategory::File)
        .with_risk_level(RiskLevel::Medium)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "source": {
                    "type": "string",
                    "description": "Existing path"
                },
                "destination": {
                    "type": "string",
                    "description": "New path; must not exist"
                }
            },
            "required": ["source", "destination"]
        }));

        Self {
            definition,
            sandbox,
        }
    }
}

#[async_trait::async_trait]
impl Tool for MoveFileTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let source = sandboxed_path(&self.sandbox, &input, "source")?;
        let destination = sandboxed_path(&self.sandbox, &input, "destination")?;

        if tokio::fs::try_exists(&destination).await.map_err(Error::Io)? {
            return Err(Error::InvalidInput(format!(
                "destination already exists: {}",
                destination.display()
            )));
        }

        tokio::fs::rename(&source, &destination)
            .await
            .map_err(Error::Io)?;
        info!(
            source = %source.display(),
            destination = %destination.display(),
            "Path moved"
        );

        Ok(ToolResult::success(
            serde_json::json!({
                "source": source.display().to_string(),
                "destination": destination.display().to_string(),
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}
