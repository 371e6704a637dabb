//! Process tools - inspect and kill system processes
//!
//! Unlike the terminal tools these act on any process visible to the
//! current user, not only on sessions started by this crate.

use super::terminal::{pid_param, pid_schema};
use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, Signal, System, UpdateKind};
use tracing::{debug, info, warn};

/// Time a process gets to exit after SIGTERM before it is killed
const TERMINATE_GRACE: Duration = Duration::from_millis(500);

/// One row of the process table
#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    /// Process id
    pub pid: u32,
    /// Command line, or the process name when the command line is unreadable
    pub command: String,
    /// CPU usage in percent of one core
    pub cpu_percent: f32,
    /// Resident memory in percent of total memory
    pub memory_percent: f32,
}

/// Snapshot the process table, sorted by pid.
///
/// Blocks for `MINIMUM_CPU_UPDATE_INTERVAL` so CPU usage has two samples.
fn snapshot() -> Vec<ProcessInfo> {
    let refresh = ProcessRefreshKind::nothing()
        .with_cpu()
        .with_memory()
        .with_cmd(UpdateKind::OnlyIfNotSet);
    let mut system = System::new();
    system.refresh_memory();
    system.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh);
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    system.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh);

    let total_memory = system.total_memory();
    let mut processes: Vec<ProcessInfo> = system
        .processes()
        .values()
        .map(|process| {
            let cmd = process.cmd();
            let command = if cmd.is_empty() {
                process.name().to_string_lossy().to_string()
            } else {
                cmd.iter()
                    .map(|arg| arg.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            let memory_percent = if total_memory == 0 {
                0.0
            } else {
                (process.memory() as f64 / total_memory as f64 * 100.0) as f32
            };
            ProcessInfo {
                pid: process.pid().as_u32(),
                command,
                cpu_percent: process.cpu_usage(),
                memory_percent,
            }
        })
        .collect();
    processes.sort_by_key(|p| p.pid);
    processes
}

fn refresh_one(system: &mut System, pid: Pid) -> bool {
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing(),
    );
    system.process(pid).is_some()
}

/// Outcome of [`terminate_process`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    /// No such process
    NotFound,
    /// Exited after SIGTERM
    Terminated,
    /// Still present after the grace period and killed
    Killed,
}

/// Send SIGTERM to `pid`, then SIGKILL if it is still there after the
/// grace period.
pub async fn terminate_process(pid: u32, grace: Duration) -> Result<KillOutcome> {
    let target = Pid::from_u32(pid);
    let mut system = System::new();
    if !refresh_one(&mut system, target) {
        return Ok(KillOutcome::NotFound);
    }
    let Some(process) = system.process(target) else {
        return Ok(KillOutcome::NotFound);
    };

    // platforms without SIGTERM go straight to kill
    match process.kill_with(Signal::Term) {
        Some(true) => {}
        Some(false) => {
            if !refresh_one(&mut system, target) {
                return Ok(KillOutcome::Terminated);
            }
            return Err(Error::Execution(format!(
                "Failed to signal process {}",
                pid
            )));
        }
        None => debug!(pid = %pid, "SIGTERM unsupported, killing"),
    }

    tokio::time::sleep(grace).await;
    if !refresh_one(&mut system, target) {
        return Ok(KillOutcome::Terminated);
    }

    warn!(pid = %pid, "Process ignored SIGTERM, killing");
    match system.process(target) {
        Some(process) if !process.kill() => Err(Error::Execution(format!(
            "Failed to kill process {}",
            pid
        ))),
        _ => Ok(KillOutcome::Killed),
    }
}

/// List running processes
pub struct ListProcessesTool {
    definition: ToolDefinition,
}

impl ListProcessesTool {
    /// Create a new list processes tool
    #[must_use]
    pub fn new() -> Self {
        let definition = ToolDefinition::new(
            "list_processes",
            "List running processes with PID, command line, CPU and memory usage",
        )
        .with_category(ToolCategory::Process)
        .with_risk_level(RiskLevel::Low)
        .with_parameters(serde_json::json!({"type": "object", "properties": {}}));

        Self { definition }
    }
}

impl Default for ListProcessesTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Tool for ListProcessesTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let processes = tokio::task::spawn_blocking(snapshot)
            .await
            .map_err(|e| Error::Execution(format!("process snapshot failed: {}", e)))?;

        let listing = if processes.is_empty() {
            "No processes found".to_string()
        } else {
            processes
                .iter()
                .map(|p| {
                    format!(
                        "PID: {}, Command: {}, CPU: {:.1}%, Memory: {:.1}%",
                        p.pid, p.command, p.cpu_percent, p.memory_percent
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        Ok(ToolResult::success(
            serde_json::json!({
                "count": processes.len(),
                "processes": processes,
                "output": listing,
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}

/// Kill an arbitrary process by PID
pub struct KillProcessTool {
    definition: ToolDefinition,
}

impl KillProcessTool {
    /// Create a new kill process tool
    #[must_use]
    pub fn new() -> Self {
        let definition = ToolDefinition::new(
            "kill_process",
            "Terminate a process by PID: SIGTERM first, SIGKILL if it is still running \
             after half a second",
        )
        .with_category(ToolCategory::Process)
        .with_risk_level(RiskLevel::High)
        .with_parameters(pid_schema("PID of the process to terminate"));

        Self { definition }
    }
}

impl Default for KillProcessTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Tool for KillProcessTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let pid = pid_param(&input)?;
        if pid == 0 || pid == std::process::id() {
            return Err(Error::InvalidInput(format!("refusing to kill PID {}", pid)));
        }

        let outcome = terminate_process(pid, TERMINATE_GRACE).await?;
        let message = match outcome {
            KillOutcome::NotFound => format!("No process found with PID {}", pid),
            KillOutcome::Terminated | KillOutcome::Killed => {
                info!(pid = %pid, outcome = ?outcome, "Process terminated");
                format!("Successfully terminated process {}", pid)
            }
        };

        Ok(ToolResult::success(
            serde_json::json!({
                "pid": pid,
                "terminated": outcome != KillOutcome::NotFound,
                "killed": outcome == KillOutcome::Killed,
                "message": message,
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_processes_includes_self() {
        let tool = ListProcessesTool::new();
        let result = tool.execute(serde_json::json!({})).await.unwrap();
        assert!(result.success);

        let own = std::process::id();
        let processes = result.output["processes"].as_array().unwrap();
        assert!(processes.iter().any(|p| p["pid"] == own));
        assert!(result.output["output"]
            .as_str()
            .unwrap()
            .contains(&format!("PID: {},", own)));
    }

    #[tokio::test]
    async fn test_kill_unknown_process() {
        let tool = KillProcessTool::new();
        let result = tool
            .execute(serde_json::json!({"pid": 99_999_999u32}))
            .await
            .unwrap();
        assert_eq!(result.output["terminated"], false);
        assert!(result.output["message"]
            .as_str()
            .unwrap()
            .contains("No process found"));
    }

    #[tokio::test]
    async fn test_kill_refuses_own_pid() {
        let tool = KillProcessTool::new();
        let result = tool
            .execute(serde_json::json!({"pid": std::process::id()}))
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn test_kill_running_process() {
        let mut child = std::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();

        let tool = KillProcessTool::new();
        let result = tool
            .execute(serde_json::json!({"pid": child.id()}))
            .await
            .unwrap();
        assert_eq!(result.output["terminated"], true);

        let status = child.wait().unwrap();
        assert!(!status.success());
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn test_terminate_escalates_when_sigterm_ignored() {
        let mut child = std::process::Command::new("sh")
            .arg("-c")
            .arg("trap '' TERM; while :; do sleep 0.05; done")
            .spawn()
            .unwrap();
        // let the shell install its trap
        tokio::time::sleep(Duration::from_millis(200)).await;

        let outcome = terminate_process(child.id(), Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(outcome, KillOutcome::Killed);

        let status = child.wait().unwrap();
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(status.signal(), Some(9));
    }
}
