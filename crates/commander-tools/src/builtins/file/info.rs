use super::{path_schema, sandboxed_path};
use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult};
use crate::sandbox::PathSandbox;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::debug;

/// Tool for file and directory metadata
pub struct GetFileInfoTool {
    definition: ToolDefinition,
    sandbox: Arc<PathSandbox>,
}

impl GetFileInfoTool {
    /// Create a new file info tool
    #[must_use]
    pub fn new(sandbox: Arc<PathSandbox>) -> Self {
        let definition = ToolDefinition::new(
            "get_file_info",
            "Retrieve metadata about a file or directory: size, type, permissions, \
             timestamps. Only works within allowed directories",
        )
        .with_category(ToolCategory::File)
        .with_risk_level(RiskLevel::Low)
        .with_parameters(path_schema("Path to inspect"));

        Self {
            definition,
            sandbox,
        }
    }
}

#[async_trait::async_trait]
impl Tool for GetFileInfoTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let path = sandboxed_path(&self.sandbox, &input, "path")?;
        debug!(path = %path.display(), "Reading metadata");

        let link = tokio::fs::symlink_metadata(&path).await.map_err(Error::Io)?;
        let metadata = tokio::fs::metadata(&path).await.map_err(Error::Io)?;

        let file_type = if link.file_type().is_symlink() {
            "symlink"
        } else if metadata.is_dir() {
            "directory"
        } else {
            "file"
        };

        Ok(ToolResult::success(
            serde_json::json!({
                "path": path.display().to_string(),
                "type": file_type,
                "size": metadata.len(),
                "size_human": human_size(metadata.len()),
                "permissions": permissions(&metadata),
                "readonly": metadata.permissions().readonly(),
                "created": timestamp(metadata.created()),
                "modified": timestamp(metadata.modified()),
                "accessed": timestamp(metadata.accessed()),
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}

fn timestamp(time: std::io::Result<SystemTime>) -> Option<String> {
    time.ok()
        .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
}

#[cfg(unix)]
fn permissions(metadata: &std::fs::Metadata) -> Option<String> {
    use std::os::unix::fs::PermissionsExt;
    Some(format!("{:03o}", metadata.permissions().mode() & 0o777))
}

#[cfg(not(unix))]
fn permissions(_metadata: &std::fs::Metadata) -> Option<String> {
    None
}

pub(super) fn human_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.2} KB", b / KB)
    } else {
        format!("{} bytes", bytes)
    }
}
