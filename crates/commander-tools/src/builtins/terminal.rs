//! Terminal tools - execute commands and manage their sessions

use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult};
use crate::terminal::{ReadOutput, TerminalManager};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

pub(super) fn pid_param(input: &serde_json::Value) -> Result<u32> {
    input
        .get("pid")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| Error::InvalidInput("Missing or invalid 'pid' parameter".to_string()))
}

pub(super) fn pid_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "pid": {
                "type": "integer",
                "description": description
            }
        },
        "required": ["pid"]
    })
}

/// Run a shell command with a bounded wait
pub struct ExecuteCommandTool {
    definition: ToolDefinition,
    manager: Arc<TerminalManager>,
}

impl ExecuteCommandTool {
    /// Create a new execute tool
    #[must_use]
    pub fn new(manager: Arc<TerminalManager>) -> Self {
        let definition = ToolDefinition::new(
            "execute_command",
            "Execute a shell command. Returns within the timeout; a command still \
             running by then keeps running and its output can be fetched with read_output",
        )
        .with_category(ToolCategory::Exec)
        .with_risk_level(RiskLevel::High)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Command line to run through the shell"
                },
                "timeout_ms": {
                    "type": "integer",
                    "description": "How long to wait before returning (default: 1000)"
                }
            },
            "required": ["command"]
        }));

        Self {
            definition,
            manager,
        }
    }
}

#[async_trait::async_trait]
impl Tool for ExecuteCommandTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();

        let command = input
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidInput("Missing 'command' parameter".to_string()))?;
        let timeout = input
            .get("timeout_ms")
            .and_then(|v| v.as_u64())
            .map(Duration::from_millis);

        let result = self.manager.execute(command, timeout).await?;
        let message = if result.still_running {
            format!(
                "Command started with PID {}\nInitial output:\n{}\n\nCommand is still running. \
                 Use read_output to get more output.",
                result.pid, result.output
            )
        } else {
            format!(
                "Command completed with PID {}\nOutput:\n{}",
                result.pid, result.output
            )
        };

        Ok(ToolResult::success(
            serde_json::json!({
                "pid": result.pid,
                "output": result.output,
                "still_running": result.still_running,
                "exit_code": result.exit_code,
                "message": message,
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}

/// Read new output of a session
pub struct ReadOutputTool {
    definition: ToolDefinition,
    manager: Arc<TerminalManager>,
}

impl ReadOutputTool {
    /// Create a new read output tool
    #[must_use]
    pub fn new(manager: Arc<TerminalManager>) -> Self {
        let definition = ToolDefinition::new(
            "read_output",
            "Read new output from a running command, or the final summary of a finished one",
        )
        .with_category(ToolCategory::Exec)
        .with_risk_level(RiskLevel::Low)
        .with_parameters(pid_schema("PID returned by execute_command"));

        Self {
            definition,
            manager,
        }
    }
}

#[async_trait::async_trait]
impl Tool for ReadOutputTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let pid = pid_param(&input)?;

        let output = match self.manager.read_output(pid) {
            Ok(read) => {
                let (status, exit_code) = match &read {
                    ReadOutput::NewOutput(_) => ("running", None),
                    ReadOutput::NoNewOutput => ("running", None),
                    ReadOutput::Completed(c) => ("completed", Some(c.exit_code)),
                };
                serde_json::json!({
                    "pid": pid,
                    "status": status,
                    "exit_code": exit_code,
                    "output": read.to_string(),
                })
            }
            Err(Error::SessionNotFound(_)) => serde_json::json!({
                "pid": pid,
                "status": "not_found",
                "output": format!("No session found for PID {}", pid),
            }),
            Err(e) => return Err(e),
        };

        Ok(ToolResult::success(output, start.elapsed().as_millis() as u64))
    }
}

/// Interrupt and, if needed, kill a running session
pub struct ForceTerminateTool {
    definition: ToolDefinition,
    manager: Arc<TerminalManager>,
}

impl ForceTerminateTool {
    /// Create a new force terminate tool
    #[must_use]
    pub fn new(manager: Arc<TerminalManager>) -> Self {
        let definition = ToolDefinition::new(
            "force_terminate",
            "Stop a running command: interrupt first, kill if it does not exit",
        )
        .with_category(ToolCategory::Exec)
        .with_risk_level(RiskLevel::Medium)
        .with_parameters(pid_schema("PID of the session to terminate"));

        Self {
            definition,
            manager,
        }
    }
}

#[async_trait::async_trait]
impl Tool for ForceTerminateTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let pid = pid_param(&input)?;

        let terminated = self.manager.force_terminate(pid).await;
        let message = if terminated {
            format!("Successfully terminated session {}", pid)
        } else {
            format!("No active session found for PID {}", pid)
        };
        debug!(pid = %pid, terminated, "Force terminate handled");

        Ok(ToolResult::success(
            serde_json::json!({
                "pid": pid,
                "terminated": terminated,
                "message": message,
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}

/// List running sessions
pub struct ListSessionsTool {
    definition: ToolDefinition,
    manager: Arc<TerminalManager>,
}

impl ListSessionsTool {
    /// Create a new list sessions tool
    #[must_use]
    pub fn new(manager: Arc<TerminalManager>) -> Self {
        let definition = ToolDefinition::new("list_sessions", "List all active command sessions")
            .with_category(ToolCategory::Exec)
            .with_risk_level(RiskLevel::Low)
            .with_parameters(serde_json::json!({"type": "object", "properties": {}}));

        Self {
            definition,
            manager,
        }
    }
}

#[async_trait::async_trait]
impl Tool for ListSessionsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let sessions = self.manager.list_active();

        Ok(ToolResult::success(
            serde_json::json!({
                "count": sessions.len(),
                "sessions": sessions,
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}

/// List finished sessions that have not been read yet
pub struct ListCompletedSessionsTool {
    definition: ToolDefinition,
    manager: Arc<TerminalManager>,
}

impl ListCompletedSessionsTool {
    /// Create a new list completed sessions tool
    #[must_use]
    pub fn new(manager: Arc<TerminalManager>) -> Self {
        let definition = ToolDefinition::new(
            "list_completed_sessions",
            "List finished commands whose output has not been read yet",
        )
        .with_category(ToolCategory::Exec)
        .with_risk_level(RiskLevel::Low)
        .with_parameters(serde_json::json!({"type": "object", "properties": {}}));

        Self {
            definition,
            manager,
        }
    }
}

#[async_trait::async_trait]
impl Tool for ListCompletedSessionsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let sessions = self.manager.list_completed();

        Ok(ToolResult::success(
            serde_json::json!({
                "count": sessions.len(),
                "sessions": sessions,
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}
