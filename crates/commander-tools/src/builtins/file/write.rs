use super::{sandboxed_path, str_param};
use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult};
use crate::sandbox::PathSandbox;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Tool for writing file contents
pub struct WriteFileTool {
    definition: ToolDefinition,
    sandbox: Arc<PathSandbox>,
}

impl WriteFileTool {
    /// Create a new file write tool
    #[must_use]
    pub fn new(sandbox: Arc<PathSandbox>) -> Self {
        let definition = ToolDefinition::new(
            "write_file",
            "Completely replace file contents. Only works within allowed directories",
        )
        .with_category(ToolCategory::File)
        .with_risk_level(RiskLevel::Medium)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                },
                "append": {
                    "type": "boolean",
                    "description": "Append to file instead of overwriting",
                    "default": false
                },
                "create_dirs": {
                    "type": "boolean",
                    "description": "Create parent directories if they don't exist",
                    "default": false
                }
            },
            "required": ["path", "content"]
        }));

        Self {
            definition,
            sandbox,
        }
    }
}

#[async_trait::async_trait]
impl Tool for WriteFileTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let file_path = sandboxed_path(&self.sandbox, &input, "path")?;
        let content = str_param(&input, "content")?;

        let append = input
            .get("append")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let create_dirs = input
            .get("create_dirs")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        debug!(path = %file_path.display(), append, "Writing file");

        if create_dirs {
            if let Some(parent) = file_path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(Error::Io)?;
            }
        }

        if append {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&file_path)
                .await
                .map_err(Error::Io)?;
            file.write_all(content.as_bytes())
                .await
                .map_err(Error::Io)?;
        } else {
            tokio::fs::write(&file_path, content)
                .await
                .map_err(Error::Io)?;
        }

        Ok(ToolResult::success(
            serde_json::json!({
                "path": file_path.display().to_string(),
                "bytes_written": content.len(),
                "append": append,
                "message": format!("Successfully wrote to {}", file_path.display())
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}
