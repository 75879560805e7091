//! Subprocess driving with a per-invocation deadline.

use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// How long one invocation may block on the SUT before the engine marks it
/// `info`/`timeout`. A FUSE filesystem that has wedged will hang arbitrary
/// syscalls, so every subprocess gets a deadline.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub enum CommandOutput {
    Finished {
        status: std::process::ExitStatus,
        stdout: Vec<u8>,
        stderr: String,
    },
    TimedOut,
}

/// Run a command to completion or until `timeout`, feeding `stdin` if given
/// and capturing both output streams. On timeout the child is killed.
pub fn run_command(
    mut command: Command,
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> Result<CommandOutput> {
    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().with_context(|| format!("spawn {command:?}"))?;

    if let (Some(bytes), Some(mut pipe)) = (stdin, child.stdin.take()) {
        // Payloads are a few bytes; this cannot fill the pipe buffer.
        pipe.write_all(bytes).context("write stdin")?;
        drop(pipe);
    }

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().context("wait for child")? {
            let mut stdout = Vec::new();
            if let Some(mut pipe) = child.stdout.take() {
                pipe.read_to_end(&mut stdout).context("read stdout")?;
            }
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                pipe.read_to_string(&mut stderr).context("read stderr")?;
            }
            return Ok(CommandOutput::Finished {
                status,
                stdout,
                stderr,
            });
        }
        if Instant::now() >= deadline {
            child.kill().ok();
            child.wait().ok();
            return Ok(CommandOutput::TimedOut);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_available(name: &str) -> bool {
        Command::new("which")
            .arg(name)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn captures_stdout_and_status() {
        if !tool_available("cat") {
            eprintln!("skipping: cat not found");
            return;
        }
        let mut command = Command::new("cat");
        command.arg("/definitely/not/a/real/path");
        match run_command(command, None, Duration::from_secs(5)).expect("run") {
            CommandOutput::Finished { status, stderr, .. } => {
                assert!(!status.success());
                assert!(!stderr.is_empty());
            }
            CommandOutput::TimedOut => panic!("cat should not time out"),
        }
    }

    #[test]
    fn stdin_is_fed_through() {
        if !tool_available("cat") {
            eprintln!("skipping: cat not found");
            return;
        }
        let command = Command::new("cat");
        match run_command(command, Some(b"hello"), Duration::from_secs(5)).expect("run") {
            CommandOutput::Finished { stdout, .. } => assert_eq!(stdout, b"hello"),
            CommandOutput::TimedOut => panic!("cat should not time out"),
        }
    }

    #[test]
    fn hung_commands_are_killed() {
        if !tool_available("sleep") {
            eprintln!("skipping: sleep not found");
            return;
        }
        let mut command = Command::new("sleep");
        command.arg("30");
        let started = Instant::now();
        match run_command(command, None, Duration::from_millis(200)).expect("run") {
            CommandOutput::TimedOut => {}
            CommandOutput::Finished { .. } => panic!("sleep 30 finished early"),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
