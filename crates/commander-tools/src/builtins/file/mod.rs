//! File tools - sandboxed read, write, list and metadata
//!
//! Every tool resolves its path through [`PathSandbox::validate`] before
//! touching the filesystem.

mod info;
mod list;
mod manage;
mod read;
mod write;

pub use info::GetFileInfoTool;
pub use list::{ListAllowedDirectoriesTool, ListDirectoryTool};
pub use manage::{CreateDirectoryTool, MoveFileTool};
pub use read::ReadFileTool;
pub use write::WriteFileTool;

use crate::error::{Error, Result};
use crate::sandbox::PathSandbox;
use std::path::PathBuf;

fn str_param<'a>(input: &'a serde_json::Value, name: &str) -> Result<&'a str> {
    input
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::InvalidInput(format!("Missing '{}' parameter", name)))
}

/// Read the `path` parameter and admit it through the sandbox.
fn sandboxed_path(sandbox: &PathSandbox, input: &serde_json::Value, name: &str) -> Result<PathBuf> {
    sandbox.validate(str_param(input, name)?)
}

fn path_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "path": {
                "type": "string",
                "description": description
            }
        },
        "required": ["path"]
    })
}
