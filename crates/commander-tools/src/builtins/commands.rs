//! Command blocklist tools

use crate::error::{Error, Result};
use crate::gate::CommandGate;
use crate::registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult};
use std::sync::Arc;
use std::time::Instant;

fn command_param(input: &serde_json::Value) -> Result<&str> {
    input
        .get("command")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::InvalidInput("Missing 'command' parameter".to_string()))
}

fn command_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "command": {
                "type": "string",
                "description": description
            }
        },
        "required": ["command"]
    })
}

/// Add a command to the blocklist
pub struct BlockCommandTool {
    definition: ToolDefinition,
    gate: Arc<CommandGate>,
}

impl BlockCommandTool {
    /// Create a new block command tool
    #[must_use]
    pub fn new(gate: Arc<CommandGate>) -> Self {
        let definition = ToolDefinition::new("block_command", "Add a command to the blocklist")
            .with_category(ToolCategory::Config)
            .with_risk_level(RiskLevel::Medium)
            .with_parameters(command_schema("Command name to block"));

        Self { definition, gate }
    }
}

#[async_trait::async_trait]
impl Tool for BlockCommandTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let command = command_param(&input)?;

        let changed = self.gate.block(command);
        let message = if changed {
            format!("Command '{}' is now blocked", command.trim())
        } else {
            format!("Command '{}' was already blocked", command.trim())
        };

        Ok(ToolResult::success(
            serde_json::json!({ "changed": changed, "message": message }),
            start.elapsed().as_millis() as u64,
        ))
    }
}

/// Remove a command from the blocklist
pub struct UnblockCommandTool {
    definition: ToolDefinition,
    gate: Arc<CommandGate>,
}

impl UnblockCommandTool {
    /// Create a new unblock command tool
    #[must_use]
    pub fn new(gate: Arc<CommandGate>) -> Self {
        let definition =
            ToolDefinition::new("unblock_command", "Remove a command from the blocklist")
                .with_category(ToolCategory::Config)
                .with_risk_level(RiskLevel::High)
                .with_parameters(command_schema("Command name to unblock"));

        Self { definition, gate }
    }
}

#[async_trait::async_trait]
impl Tool for UnblockCommandTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let command = command_param(&input)?;

        let changed = self.gate.unblock(command);
        let message = if changed {
            format!("Command '{}' is now allowed", command.trim())
        } else {
            format!("Command '{}' was not blocked", command.trim())
        };

        Ok(ToolResult::success(
            serde_json::json!({ "changed": changed, "message": message }),
            start.elapsed().as_millis() as u64,
        ))
    }
}

/// Show the blocklist
pub struct ListBlockedCommandsTool {
    definition: ToolDefinition,
    gate: Arc<CommandGate>,
}

impl ListBlockedCommandsTool {
    /// Create a new list blocked commands tool
    #[must_use]
    pub fn new(gate: Arc<CommandGate>) -> Self {
        let definition =
            ToolDefinition::new("list_blocked_commands", "List all blocked commands")
                .with_category(ToolCategory::Config)
                .with_risk_level(RiskLevel::Low)
                .with_parameters(serde_json::json!({"type": "object", "properties": {}}));

        Self { definition, gate }
    }
}

#[async_trait::async_trait]
impl Tool for ListBlockedCommandsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let commands = self.gate.list();

        Ok(ToolResult::success(
            serde_json::json!({ "count": commands.len(), "commands": commands }),
            start.elapsed().as_millis() as u64,
        ))
    }
}
