//! Child process plumbing
//!
//! A spawned command is split across three background tasks:
//! - a reaper that owns the [`Child`], awaits its exit and publishes the exit
//!   code on a `watch` channel (a `oneshot` asks it to kill the child);
//! - one reader per output stream, forwarding chunks into a shared unbounded
//!   channel so draining is a non-blocking `try_recv` loop.
//!
//! Nothing here touches the session store.

use super::constants::{FORCE_KILLED_EXIT_CODE, READ_CHUNK_BYTES};
use crate::error::{Error, Result};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

/// Exit and end-of-output notifications for one child.
#[derive(Debug, Clone)]
pub(crate) struct ExitWatch {
    exit_rx: watch::Receiver<Option<i32>>,
    eof_rx: watch::Receiver<bool>,
}

impl ExitWatch {
    /// Exit code if the child has already been reaped.
    pub fn exit_code(&self) -> Option<i32> {
        *self.exit_rx.borrow()
    }

    /// Wait for the child to exit. Cancel safe.
    pub async fn wait_exit(&mut self) -> i32 {
        match self.exit_rx.wait_for(Option::is_some).await {
            Ok(code) => (*code).unwrap_or(FORCE_KILLED_EXIT_CODE),
            // reaper gone without publishing: the task was aborted
            Err(_) => FORCE_KILLED_EXIT_CODE,
        }
    }

    /// Wait until both output streams hit EOF, bounded by `timeout`.
    ///
    /// Background grandchildren can keep the pipes open after the shell
    /// exits, hence the bound.
    pub async fn wait_output_closed(&mut self, timeout: Duration) {
        if tokio::time::timeout(timeout, self.eof_rx.wait_for(|done| *done))
            .await
            .is_err()
        {
            debug!("Output streams still open after exit");
        }
    }
}

/// Ownership of a running child's output and its kill switch.
pub(crate) struct ProcessHandle {
    output_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    kill_tx: Option<oneshot::Sender<()>>,
    watch: ExitWatch,
}

impl ProcessHandle {
    /// Move every chunk that is ready right now into `out`.
    pub fn try_drain(&mut self, out: &mut Vec<u8>) {
        while let Ok(chunk) = self.output_rx.try_recv() {
            out.extend_from_slice(&chunk);
        }
    }

    pub fn watch(&self) -> ExitWatch {
        self.watch.clone()
    }

    /// Take the kill switch. Only the first caller gets it.
    pub fn take_kill_switch(&mut self) -> Option<oneshot::Sender<()>> {
        self.kill_tx.take()
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("exit_code", &self.watch.exit_code())
            .finish_non_exhaustive()
    }
}

fn shell_command(command: &str, shell: Option<&str>) -> Command {
    #[cfg(unix)]
    {
        let mut cmd = Command::new(shell.unwrap_or("/bin/sh"));
        cmd.arg("-c").arg(command);
        // own process group so signals reach the whole pipeline
        cmd.process_group(0);
        cmd
    }
    #[cfg(not(unix))]
    {
        let mut cmd = Command::new(shell.unwrap_or("cmd"));
        cmd.arg("/C").arg(command);
        cmd
    }
}

/// Spawn `command` through the platform shell.
pub(crate) fn spawn_shell(command: &str, shell: Option<&str>) -> Result<(u32, ProcessHandle)> {
    let mut cmd = shell_command(command, shell);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::SpawnFailed(format!("{}: {}", command, e)))?;
    let pid = child
        .id()
        .ok_or_else(|| Error::SpawnFailed(format!("{}: no process id", command)))?;

    let (output_tx, output_rx) = mpsc::unbounded_channel();
    let (eof_tx, eof_rx) = watch::channel(false);
    let stdout = child.stdout.take().map(|s| forward(s, output_tx.clone()));
    let stderr = child.stderr.take().map(|s| forward(s, output_tx));
    tokio::spawn(async move {
        for reader in [stdout, stderr].into_iter().flatten() {
            let _ = reader.await;
        }
        let _ = eof_tx.send(true);
    });

    let (exit_tx, exit_rx) = watch::channel(None);
    let (kill_tx, kill_rx) = oneshot::channel();
    tokio::spawn(reap(pid, child, kill_rx, exit_tx));

    let handle = ProcessHandle {
        output_rx,
        kill_tx: Some(kill_tx),
        watch: ExitWatch { exit_rx, eof_rx },
    };
    Ok((pid, handle))
}

fn forward<R>(mut reader: R, tx: mpsc::UnboundedSender<Vec<u8>>) -> tokio::task::JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; READ_CHUNK_BYTES];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

async fn reap(
    pid: u32,
    mut child: Child,
    mut kill_rx: oneshot::Receiver<()>,
    exit_tx: watch::Sender<Option<i32>>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        Ok(()) = &mut kill_rx => {
            if let Err(e) = child.start_kill() {
                warn!(pid = %pid, error = %e, "Failed to kill child");
            }
            child.wait().await
        }
    };

    let code = match status {
        Ok(status) => exit_code(&status),
        Err(e) => {
            warn!(pid = %pid, error = %e, "Failed to wait for child");
            FORCE_KILLED_EXIT_CODE
        }
    };
    debug!(pid = %pid, exit_code = code, "Child reaped");
    let _ = exit_tx.send(Some(code));
}

/// Exit code, or the negated signal number for signal deaths.
pub(crate) fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    FORCE_KILLED_EXIT_CODE
}

/// Send Ctrl+C to the child's process group.
///
/// Returns `false` when no interrupt could be delivered (already gone, or no
/// signal support on this platform).
pub(crate) fn interrupt(pid: u32) -> bool {
    #[cfg(unix)]
    {
        signal_group(pid, nix::sys::signal::Signal::SIGINT)
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

/// Unconditionally kill the child (and on Unix its process group).
pub(crate) fn kill(pid: u32, kill_switch: Option<oneshot::Sender<()>>) {
    #[cfg(unix)]
    signal_group(pid, nix::sys::signal::Signal::SIGKILL);

    if let Some(tx) = kill_switch {
        let _ = tx.send(());
    } else {
        debug!(pid = %pid, "Kill switch already used");
    }
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: nix::sys::signal::Signal) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match killpg(Pid::from_raw(raw), signal) {
        Ok(()) => {
            debug!(pid = %pid, signal = ?signal, "Signal sent");
            true
        }
        Err(Errno::ESRCH) => false,
        Err(e) => {
            warn!(pid = %pid, signal = ?signal, error = %e, "Failed to signal process group");
            false
        }
    }
}

/// Test double for a child process: drive output and exit by hand.
#[cfg(test)]
pub(crate) struct FakeProcess {
    pub output_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    pub exit_tx: watch::Sender<Option<i32>>,
    pub eof_tx: watch::Sender<bool>,
}

#[cfg(test)]
impl FakeProcess {
    pub fn new() -> (Self, ProcessHandle) {
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = watch::channel(None);
        let (eof_tx, eof_rx) = watch::channel(false);
        let (kill_tx, _kill_rx) = oneshot::channel();
        let handle = ProcessHandle {
            output_rx,
            kill_tx: Some(kill_tx),
            watch: ExitWatch { exit_rx, eof_rx },
        };
        let fake = Self {
            output_tx: Some(output_tx),
            exit_tx,
            eof_tx,
        };
        (fake, handle)
    }

    pub fn emit(&self, text: &str) {
        if let Some(tx) = &self.output_tx {
            let _ = tx.send(text.as_bytes().to_vec());
        }
    }

    pub fn exit(&mut self, code: i32) {
        self.output_tx = None;
        let _ = self.eof_tx.send(true);
        let _ = self.exit_tx.send(Some(code));
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_and_reap() {
        let (pid, mut handle) = spawn_shell("echo out; echo err 1>&2; exit 3", None).unwrap();
        assert!(pid > 0);

        let mut watch = handle.watch();
        assert_eq!(watch.wait_exit().await, 3);
        watch.wait_output_closed(Duration::from_secs(2)).await;

        let mut out = Vec::new();
        handle.try_drain(&mut out);
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("out"), "output: {}", text);
        assert!(text.contains("err"), "output: {}", text);
    }

    #[tokio::test]
    async fn test_kill_switch() {
        let (pid, mut handle) = spawn_shell("sleep 30", None).unwrap();
        let mut watch = handle.watch();
        kill(pid, handle.take_kill_switch());
        let code = tokio::time::timeout(Duration::from_secs(5), watch.wait_exit())
            .await
            .unwrap();
        assert_eq!(code, -9);
        assert!(handle.take_kill_switch().is_none());
    }

    #[tokio::test]
    async fn test_try_drain_does_not_block() {
        let (pid, mut handle) = spawn_shell("sleep 30", None).unwrap();
        let mut out = Vec::new();
        let drained = tokio::time::timeout(Duration::from_millis(100), async {
            handle.try_drain(&mut out);
        })
        .await;
        assert!(drained.is_ok());
        assert!(out.is_empty());
        kill(pid, handle.take_kill_switch());
    }
}
