use super::{path_schema, sandboxed_path};
use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult};
use crate::sandbox::PathSandbox;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Default read limit
const DEFAULT_MAX_BYTES: u64 = 1_048_576;

/// Tool for reading file contents
pub struct ReadFileTool {
    definition: ToolDefinition,
    sandbox: Arc<PathSandbox>,
}

impl ReadFileTool {
    /// Create a new file read tool
    #[must_use]
    pub fn new(sandbox: Arc<PathSandbox>) -> Self {
        let mut parameters = path_schema("Path to the file to read");
        parameters["properties"]["max_bytes"] = serde_json::json!({
            "type": "integer",
            "description": "Maximum bytes to read (default: 1MB)",
            "default": DEFAULT_MAX_BYTES
        });

        let definition = ToolDefinition::new(
            "read_file",
            "Read the complete contents of a file. Only works within allowed directories",
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
impl Tool for ReadFileTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let file_path = sandboxed_path(&self.sandbox, &input, "path")?;

        let max_bytes = input
            .get("max_bytes")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_MAX_BYTES);

        debug!(path = %file_path.display(), max_bytes, "Reading file");

        let file = tokio::fs::File::open(&file_path).await.map_err(Error::Io)?;
        let mut contents = Vec::new();
        // one extra byte tells us whether the file was cut short
        file.take(max_bytes.saturating_add(1))
            .read_to_end(&mut contents)
            .await
            .map_err(Error::Io)?;

        let truncated = contents.len() as u64 > max_bytes;
        if truncated {
            contents.truncate(max_bytes as usize);
        }

        Ok(ToolResult::success(
            serde_json::json!({
                "path": file_path.display().to_string(),
                "content": String::from_utf8_lossy(&contents),
                "size": contents.len(),
                "truncated": truncated
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}
