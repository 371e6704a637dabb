//! Terminal manager tests against real child processes

use super::*;
use crate::error::Error;
use crate::gate::CommandGate;
use std::sync::Arc;
use std::time::Duration;

fn manager() -> TerminalManager {
    manager_with(TerminalConfig::default())
}

fn manager_with(config: TerminalConfig) -> TerminalManager {
    TerminalManager::new(Arc::new(CommandGate::default()), config)
}

/// Poll `read_output` until the session reports completion.
async fn wait_completed(manager: &TerminalManager, pid: u32) -> CompletedSession {
    for _ in 0..100 {
        if let ReadOutput::Completed(completed) = manager.read_output(pid).unwrap() {
            return completed;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("session {} never completed", pid);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_execute_fast_command_finishes() {
    let manager = manager();
    let result = manager
        .execute("echo hello", Some(Duration::from_millis(2000)))
        .await
        .unwrap();

    assert!(!result.still_running);
    assert_eq!(result.exit_code, Some(0));
    assert!(result.output.contains("hello"), "output: {}", result.output);
    assert!(manager.list_active().is_empty());
    assert_eq!(manager.list_completed().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_execute_captures_stderr_and_exit_code() {
    let manager = manager();
    let result = manager
        .execute("echo oops 1>&2; exit 4", Some(Duration::from_secs(2)))
        .await
        .unwrap();

    assert_eq!(result.exit_code, Some(4));
    assert!(result.output.contains("oops"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_execute_slow_command_keeps_running() {
    let manager = manager();
    let result = manager
        .execute("sleep 2", Some(Duration::from_millis(200)))
        .await
        .unwrap();

    assert!(result.still_running);
    assert_eq!(result.exit_code, None);

    let active = manager.list_active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].pid, result.pid);
    assert!(active[0].is_blocked);

    assert!(matches!(
        manager.read_output(result.pid),
        Ok(ReadOutput::NoNewOutput)
    ));

    let completed = wait_completed(&manager, result.pid).await;
    assert_eq!(completed.exit_code, 0);
    assert!(manager.list_active().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_read_output_after_timeout_only_returns_new_output() {
    let manager = manager();
    let result = manager
        .execute("echo first; sleep 1; echo second", Some(Duration::from_millis(300)))
        .await
        .unwrap();
    assert!(result.still_running);
    assert!(result.output.contains("first"));

    let completed = wait_completed(&manager, result.pid).await;
    assert!(completed.output.contains("first"));
    assert!(completed.output.contains("second"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_completed_session_is_read_once() {
    let manager = manager();
    let result = manager
        .execute("echo done", Some(Duration::from_secs(2)))
        .await
        .unwrap();

    match manager.read_output(result.pid).unwrap() {
        ReadOutput::Completed(completed) => assert!(completed.output.contains("done")),
        other => panic!("expected completed, got {:?}", other),
    }
    assert!(matches!(
        manager.read_output(result.pid),
        Err(Error::SessionNotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_force_terminate_escalates_to_kill() {
    let manager = manager_with(TerminalConfig {
        grace_period_ms: 200,
        ..TerminalConfig::default()
    });
    let result = manager
        .execute("trap '' INT; sleep 30", Some(Duration::from_millis(200)))
        .await
        .unwrap();
    assert!(result.still_running);

    assert!(manager.force_terminate(result.pid).await);
    assert!(manager.list_active().is_empty());

    match manager.read_output(result.pid).unwrap() {
        ReadOutput::Completed(completed) => assert_eq!(completed.exit_code, -9),
        other => panic!("expected completed, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_force_terminate_interrupt_is_enough() {
    let manager = manager();
    let result = manager
        .execute("sleep 30", Some(Duration::from_millis(100)))
        .await
        .unwrap();

    assert!(manager.force_terminate(result.pid).await);
    let completed = manager.store().completed_snapshot(result.pid).unwrap();
    assert_ne!(completed.exit_code, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_force_terminate_unknown_or_finished() {
    let manager = manager();
    assert!(!manager.force_terminate(999_999).await);

    let result = manager
        .execute("true", Some(Duration::from_secs(2)))
        .await
        .unwrap();
    assert!(!manager.force_terminate(result.pid).await);
    // the completed record is untouched
    assert_eq!(manager.store().completed_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dropped_execute_still_completes() {
    let manager = manager();
    let cancelled = tokio::time::timeout(
        Duration::from_millis(100),
        manager.execute("echo hi; sleep 0.3", Some(Duration::from_secs(5))),
    )
    .await;
    assert!(cancelled.is_err());

    let active = manager.list_active();
    assert_eq!(active.len(), 1);
    let pid = active[0].pid;

    let completed = wait_completed(&manager, pid).await;
    assert_eq!(completed.exit_code, 0);
    assert!(manager.list_active().is_empty());
    assert!(matches!(
        manager.read_output(pid),
        Err(Error::SessionNotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_force_terminate_while_execute_waits() {
    let manager = manager();
    let runner = {
        let manager = manager.clone();
        tokio::spawn(async move {
            manager
                .execute("sleep 30", Some(Duration::from_secs(5)))
                .await
        })
    };

    let mut pid = None;
    for _ in 0..50 {
        if let Some(session) = manager.list_active().first() {
            pid = Some(session.pid);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let pid = pid.expect("session never became active");

    assert!(manager.force_terminate(pid).await);
    let result = runner.await.unwrap().unwrap();

    assert_eq!(result.pid, pid);
    assert!(!result.still_running);
    assert!(result.exit_code.is_some());
    assert_ne!(result.exit_code, Some(0));
    assert!(manager.list_active().is_empty());
    assert_eq!(manager.store().completed_count(), 1);
}

#[tokio::test]
async fn test_blocked_command_is_not_spawned() {
    let manager = manager();
    let err = manager.execute("sudo ls", None).await.unwrap_err();
    assert!(matches!(err, Error::CommandBlocked(_)));
    assert!(manager.list_active().is_empty());
    assert!(manager.list_completed().is_empty());
}

#[tokio::test]
async fn test_empty_command_is_invalid() {
    let manager = manager();
    assert!(matches!(
        manager.execute("   ", None).await,
        Err(Error::InvalidInput(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_active_session_cap() {
    let manager = manager_with(TerminalConfig {
        max_active_sessions: Some(1),
        ..TerminalConfig::default()
    });
    let first = manager
        .execute("sleep 5", Some(Duration::from_millis(50)))
        .await
        .unwrap();
    assert!(first.still_running);

    let second = manager.execute("sleep 5", Some(Duration::from_millis(50))).await;
    assert!(matches!(second, Err(Error::InvalidInput(_))));

    assert!(manager.force_terminate(first.pid).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_executions() {
    let manager = manager();
    let runs = (0..5).map(|i| {
        let manager = manager.clone();
        async move {
            manager
                .execute(&format!("echo run-{}", i), Some(Duration::from_secs(5)))
                .await
        }
    });
    let results = join_spawned(runs).await;

    for (i, result) in results.into_iter().enumerate() {
        let result = result.unwrap();
        assert!(result.output.contains(&format!("run-{}", i)));
    }
    assert_eq!(manager.list_completed().len(), 5);
}

async fn join_spawned<F, T>(futures: impl IntoIterator<Item = F>) -> Vec<T>
where
    F: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handles: Vec<_> = futures.into_iter().map(tokio::spawn).collect();
    let mut out = Vec::with_capacity(handles.len());
    for handle in handles {
        out.push(handle.await.unwrap());
    }
    out
}
