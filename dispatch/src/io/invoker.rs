//! Worker abstraction for agent invocation.
//!
//! The [`Worker`] trait decouples dispatch orchestration from the actual
//! agent backend. Each invocation is independent and stateless: one
//! subprocess per attempt, payload on stdin, all output captured. Tests use
//! scripted workers that return predetermined records without spawning
//! processes.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument};

use crate::core::types::InvocationRecord;
use crate::io::forensics::write_attempt_log;
use crate::io::process::run_captured;

/// Parameters for one worker invocation.
#[derive(Debug, Clone)]
pub struct WorkRequest {
    /// Working directory for the agent process.
    pub workdir: PathBuf,
    /// Rendered request payload, fed to the agent on stdin.
    pub payload: String,
    /// Durable capture of this attempt's full output.
    pub attempt_log_path: PathBuf,
    /// Maximum time to wait for the invocation to complete.
    pub timeout: Duration,
    /// Truncate captured output beyond this many bytes.
    pub output_limit_bytes: usize,
}

/// Abstraction over agent execution backends.
///
/// Implementations must capture all output durably at
/// `request.attempt_log_path` regardless of outcome, and must not interpret
/// the agent's exit status: a non-zero exit is data for the classifier, not
/// an error.
pub trait Worker {
    fn invoke(&self, request: &WorkRequest) -> Result<InvocationRecord>;
}

/// Worker that spawns the configured agent command.
pub struct AgentWorker {
    command: Vec<String>,
}

impl AgentWorker {
    pub fn new(command: Vec<String>) -> Result<Self> {
        if command.is_empty() || command[0].trim().is_empty() {
            return Err(anyhow!("agent command must be non-empty"));
        }
        Ok(Self { command })
    }
}

impl Worker for AgentWorker {
    #[instrument(skip_all, fields(timeout_secs = request.timeout.as_secs()))]
    fn invoke(&self, request: &WorkRequest) -> Result<InvocationRecord> {
        info!(workdir = %request.workdir.display(), command = %self.command[0], "starting agent invocation");

        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]).current_dir(&request.workdir);

        let captured = run_captured(
            cmd,
            Some(request.payload.as_bytes()),
            request.timeout,
            request.output_limit_bytes,
        )?;
        write_attempt_log(&request.attempt_log_path, &captured)?;

        debug!(exit_code = ?captured.status.code(), timed_out = captured.timed_out, "agent invocation finished");
        Ok(InvocationRecord {
            stdout: String::from_utf8_lossy(&captured.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&captured.stderr).into_owned(),
            exit_code: captured.status.code(),
            timed_out: captured.timed_out,
        })
    }
}
