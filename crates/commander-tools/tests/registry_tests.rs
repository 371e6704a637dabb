use commander_tools::{
    register_builtins, Builtins, CommandGate, PathSandbox, TerminalConfig, TerminalManager,
    ToolRegistry,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn setup() -> (TempDir, ToolRegistry) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();

    let gate = Arc::new(CommandGate::default());
    let builtins = Builtins {
        manager: Arc::new(TerminalManager::new(gate.clone(), TerminalConfig::default())),
        gate,
        sandbox: Arc::new(PathSandbox::new([root.clone()], root.clone(), root)),
    };

    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry, &builtins);
    (dir, registry)
}

#[tokio::test]
async fn test_unknown_tool() {
    let (_dir, registry) = setup();
    let result = registry.call("no_such_tool", json!({})).await;
    assert!(matches!(result, Err(commander_tools::Error::NotFound(_))));
}

#[tokio::test]
async fn test_blocked_command_is_failed_result() {
    let (_dir, registry) = setup();
    let result = registry
        .call("execute_command", json!({"command": "sudo rm -rf /"}))
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.error.unwrap().contains("sudo"));
    let sessions = registry.call("list_sessions", json!({})).await.unwrap();
    assert_eq!(sessions.output["count"], 0);
}

#[tokio::test]
async fn test_block_then_execute_is_rejected() {
    let (_dir, registry) = setup();
    registry
        .call("block_command", json!({"command": "echo"}))
        .await
        .unwrap();

    let result = registry
        .call("execute_command", json!({"command": "ECHO hi"}))
        .await
        .unwrap();
    assert!(!result.success);

    registry
        .call("unblock_command", json!({"command": "echo"}))
        .await
        .unwrap();
    let listed = registry
        .call("list_blocked_commands", json!({}))
        .await
        .unwrap();
    assert!(!listed.output["commands"]
        .as_array()
        .unwrap()
        .contains(&json!("echo")));
}

#[tokio::test]
async fn test_file_access_outside_sandbox_is_failed_result() {
    let (_dir, registry) = setup();
    let result = registry
        .call("read_file", json!({"path": "/etc/passwd"}))
        .await
        .unwrap();

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.contains("access denied"), "error: {}", error);
    assert!(error.contains("/etc/passwd"));
}

#[tokio::test]
async fn test_file_round_trip_through_registry() {
    let (dir, registry) = setup();
    let path = dir.path().join("hello.txt");

    let written = registry
        .call(
            "write_file",
            json!({"path": path.to_string_lossy(), "content": "hi there"}),
        )
        .await
        .unwrap();
    assert!(written.success);

    let listed = registry
        .call("list_directory", json!({"path": dir.path().to_string_lossy()}))
        .await
        .unwrap();
    assert_eq!(listed.output["listing"], "[FILE] hello.txt");

    let read = registry
        .call("read_file", json!({"path": path.to_string_lossy()}))
        .await
        .unwrap();
    assert_eq!(read.output["content"], "hi there");
}

#[tokio::test]
async fn test_missing_parameter_is_error() {
    let (_dir, registry) = setup();
    let result = registry.call("read_output", json!({})).await;
    assert!(matches!(
        result,
        Err(commander_tools::Error::InvalidInput(_))
    ));
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_long_running_session_lifecycle() {
    let (_dir, registry) = setup();

    let started = registry
        .call(
            "execute_command",
            json!({"command": "echo start; sleep 30", "timeout_ms": 300}),
        )
        .await
        .unwrap();
    assert_eq!(started.output["still_running"], true);
    assert!(started.output["output"].as_str().unwrap().contains("start"));
    let pid = started.output["pid"].as_u64().unwrap();

    let sessions = registry.call("list_sessions", json!({})).await.unwrap();
    assert_eq!(sessions.output["count"], 1);
    assert_eq!(sessions.output["sessions"][0]["is_blocked"], true);

    let terminated = registry
        .call("force_terminate", json!({"pid": pid}))
        .await
        .unwrap();
    assert_eq!(terminated.output["terminated"], true);

    let summary = registry
        .call("read_output", json!({"pid": pid}))
        .await
        .unwrap();
    assert_eq!(summary.output["status"], "completed");

    let gone = registry
        .call("read_output", json!({"pid": pid}))
        .await
        .unwrap();
    assert_eq!(gone.output["status"], "not_found");
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_background_completion_is_observed() {
    let (_dir, registry) = setup();

    let started = registry
        .call(
            "execute_command",
            json!({"command": "sleep 0.5; echo finished", "timeout_ms": 100}),
        )
        .await
        .unwrap();
    assert_eq!(started.output["still_running"], true);
    let pid = started.output["pid"].as_u64().unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let completed = registry
        .call("list_completed_sessions", json!({}))
        .await
        .unwrap();
    assert_eq!(completed.output["count"], 1);

    let summary = registry
        .call("read_output", json!({"pid": pid}))
        .await
        .unwrap();
    assert_eq!(summary.output["status"], "completed");
    assert!(summary.output["output"]
        .as_str()
        .unwrap()
        .contains("finished"));
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_kill_process_ends_session_started_by_execute() {
    let (_dir, registry) = setup();
    let started = registry
        .call(
            "execute_command",
            json!({"command": "sleep 30", "timeout_ms": 100}),
        )
        .await
        .unwrap();
    assert_eq!(started.output["still_running"], true);
    let pid = started.output["pid"].as_u64().unwrap();

    let listed = registry.call("list_processes", json!({})).await.unwrap();
    assert!(listed.output["processes"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["pid"] == pid));

    let killed = registry
        .call("kill_process", json!({"pid": pid}))
        .await
        .unwrap();
    assert_eq!(killed.output["terminated"], true);

    // the completion watcher finalises the session
    let mut status = json!(null);
    for _ in 0..50 {
        let read = registry.call("read_output", json!({"pid": pid})).await.unwrap();
        status = read.output["status"].clone();
        if status == "completed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(status, "completed");
}
