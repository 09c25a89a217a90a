//! Helpers for running child processes with timeouts and bounded output.

use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct Captured {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Bytes discarded from stdout beyond the in-memory limit.
    pub dropped_stdout: usize,
    /// Bytes discarded from stderr beyond the in-memory limit.
    pub dropped_stderr: usize,
    pub timed_out: bool,
}

/// Run a command with a timeout and capture stdout/stderr without risking
/// pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes`
/// bounds the amount of stdout/stderr stored in memory; bytes beyond the
/// limit are discarded while still draining the pipe. On timeout the child
/// is killed and whatever was captured so far is returned with
/// `timed_out = true`.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_captured(
    mut cmd: Command,
    stdin: Option<&[u8]>,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<Captured> {
    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = cmd.spawn().context("spawn command")?;
    feed_stdin(&mut child, stdin)?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;
    let stdout_handle = thread::spawn(move || drain_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || drain_limited(stderr, output_limit_bytes));

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let (stdout, dropped_stdout) = join_reader(stdout_handle).context("join stdout")?;
    let (stderr, dropped_stderr) = join_reader(stderr_handle).context("join stderr")?;
    if dropped_stdout > 0 || dropped_stderr > 0 {
        warn!(dropped_stdout, dropped_stderr, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(Captured {
        status,
        stdout,
        stderr,
        dropped_stdout,
        dropped_stderr,
        timed_out,
    })
}

fn feed_stdin(child: &mut Child, stdin: Option<&[u8]>) -> Result<()> {
    let Some(input) = stdin else {
        return Ok(());
    };
    let mut child_stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("stdin was not piped"))?;
    child_stdin.write_all(input).context("write stdin")?;
    Ok(())
}

fn join_reader(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

/// Read a stream to the end, keeping at most `limit` bytes and counting the
/// rest as dropped.
fn drain_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut dropped = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            dropped += n.saturating_sub(keep);
        } else {
            dropped += n;
        }
    }

    Ok((buf, dropped))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_and_stderr() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo out; echo err >&2");
        let captured =
            run_captured(cmd, None, Duration::from_secs(5), 10_000).expect("run");
        assert!(captured.status.success());
        assert_eq!(String::from_utf8_lossy(&captured.stdout), "out\n");
        assert_eq!(String::from_utf8_lossy(&captured.stderr), "err\n");
        assert!(!captured.timed_out);
    }

    #[test]
    fn feeds_stdin_to_child() {
        let cmd = Command::new("cat");
        let captured =
            run_captured(cmd, Some(b"payload"), Duration::from_secs(5), 10_000).expect("run");
        assert_eq!(String::from_utf8_lossy(&captured.stdout), "payload");
    }

    #[test]
    fn limits_captured_bytes_but_drains_pipe() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("head -c 100000 /dev/zero");
        let captured = run_captured(cmd, None, Duration::from_secs(5), 1_000).expect("run");
        assert_eq!(captured.stdout.len(), 1_000);
        assert_eq!(captured.dropped_stdout, 99_000);
    }

    #[test]
    fn kills_child_on_timeout() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("sleep 5");
        let captured =
            run_captured(cmd, None, Duration::from_millis(100), 1_000).expect("run");
        assert!(captured.timed_out);
    }
}
