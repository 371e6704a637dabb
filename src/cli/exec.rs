//! `commander exec` - run a command and follow it to completion

use crate::app::App;
use anyhow::Result;
use commander_tools::{ReadOutput, TerminalManager};
use std::io::Write;
use std::time::Duration;
use tracing::debug;

const FOLLOW_INTERVAL: Duration = Duration::from_millis(200);

/// Execute `command`, then poll `read_output` until it completes.
///
/// Ctrl+C at any point force-terminates the command.
pub async fn run(app: &App, command: &str, timeout_ms: Option<u64>) -> Result<()> {
    let manager = &app.builtins.manager;
    let result = tokio::select! {
        result = manager.execute(command, timeout_ms.map(Duration::from_millis)) => result?,
        _ = tokio::signal::ctrl_c() => {
            // the dropped execute leaves the session running
            terminate_by_command(manager, command).await;
            println!("\n[interrupted]");
            return Ok(());
        }
    };

    let mut stdout = std::io::stdout();
    write!(stdout, "{}", result.output)?;
    stdout.flush()?;
    let mut shown = result.output;

    if !result.still_running {
        // consume the completed record so it doesn't linger
        let _ = manager.read_output(result.pid);
        println!("\n[exit code {}]", result.exit_code.unwrap_or_default());
        return Ok(());
    }

    debug!(pid = %result.pid, "Following running command");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                let terminated = manager.force_terminate(result.pid).await;
                debug!(pid = %result.pid, terminated, "Interrupted by user");
            }
            _ = tokio::time::sleep(FOLLOW_INTERVAL) => {}
        }

        match manager.read_output(result.pid)? {
            ReadOutput::NewOutput(output) => {
                write!(stdout, "{}", output)?;
                stdout.flush()?;
                shown.push_str(&output);
            }
            ReadOutput::NoNewOutput => {}
            ReadOutput::Completed(completed) => {
                write!(stdout, "{}", unshown_tail(&completed.output, &shown))?;
                println!(
                    "\n[exit code {} after {:.2}s]",
                    completed.exit_code,
                    completed.runtime_secs()
                );
                return Ok(());
            }
        }
    }
}

async fn terminate_by_command(manager: &TerminalManager, command: &str) {
    let command = command.trim();
    for session in manager.list_active() {
        if session.command == command {
            let terminated = manager.force_terminate(session.pid).await;
            debug!(pid = %session.pid, terminated, "Interrupted by user");
        }
    }
}

/// Part of `full` after the longest common prefix with `shown`.
fn unshown_tail<'a>(full: &'a str, shown: &str) -> &'a str {
    let split = full
        .char_indices()
        .zip(shown.chars())
        .find(|((_, a), b)| a != b)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| shown.len().min(full.len()));
    full.get(split..).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unshown_tail_after_prefix() {
        assert_eq!(unshown_tail("first\nsecond\n", "first\n"), "second\n");
        assert_eq!(unshown_tail("done", "done"), "");
        assert_eq!(unshown_tail("abc", ""), "abc");
    }

    #[test]
    fn test_unshown_tail_with_replacement_chars() {
        // lossy decoding can make `shown` longer in bytes than the matching prefix
        let full = "a\u{FFFD}b tail";
        let shown = "a\u{FFFD}\u{FFFD}";
        assert_eq!(unshown_tail(full, shown), "b tail");
    }
}
