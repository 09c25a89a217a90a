//! Test-only scripted collaborators and workspace scaffolding.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::types::{InvocationRecord, WorkItem};
use crate::io::config::DispatchConfig;
use crate::io::invoker::{WorkRequest, Worker};
use crate::io::render::RequestRenderer;

/// One scripted reply from a [`ScriptedWorker`].
#[derive(Debug, Clone)]
pub struct ScriptedInvocation {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// File written (relative to the request workdir) before replying,
    /// simulating the agent's side effect on the artifact.
    pub write_file: Option<(PathBuf, String)>,
}

/// One scripted step: a reply, or an invocation-level failure.
#[derive(Debug, Clone)]
pub enum ScriptedStep {
    Reply(ScriptedInvocation),
    Fail(String),
}

/// Reply that prints an approved verdict without touching any file.
pub fn approved() -> ScriptedStep {
    ScriptedStep::Reply(ScriptedInvocation {
        stdout: "VERDICT: approved\n".to_string(),
        stderr: String::new(),
        exit_code: 0,
        write_file: None,
    })
}

/// Reply that writes `contents` to `path` and prints an approved verdict.
pub fn approved_with_touch(path: &str, contents: &str) -> ScriptedStep {
    ScriptedStep::Reply(ScriptedInvocation {
        stdout: "VERDICT: approved\n".to_string(),
        stderr: String::new(),
        exit_code: 0,
        write_file: Some((PathBuf::from(path), contents.to_string())),
    })
}

/// Reply that prints a suspect verdict with `reason`.
pub fn suspect(reason: &str) -> ScriptedStep {
    ScriptedStep::Reply(ScriptedInvocation {
        stdout: format!("VERDICT: suspect {reason}\n"),
        stderr: String::new(),
        exit_code: 0,
        write_file: None,
    })
}

/// Worker that replays a fixed script of invocations in order.
pub struct ScriptedWorker {
    steps: Mutex<VecDeque<ScriptedStep>>,
    payloads: Mutex<Vec<String>>,
}

impl ScriptedWorker {
    pub fn new(steps: Vec<ScriptedStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            payloads: Mutex::new(Vec::new()),
        }
    }

    /// Payloads received so far, in invocation order.
    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().expect("payloads lock").clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.payloads.lock().expect("payloads lock").len()
    }
}

impl Worker for ScriptedWorker {
    fn invoke(&self, request: &WorkRequest) -> Result<InvocationRecord> {
        self.payloads
            .lock()
            .expect("payloads lock")
            .push(request.payload.clone());
        let step = self
            .steps
            .lock()
            .expect("steps lock")
            .pop_front()
            .ok_or_else(|| anyhow!("scripted worker exhausted"))?;
        match step {
            ScriptedStep::Fail(message) => Err(anyhow!(message)),
            ScriptedStep::Reply(reply) => {
                // Honor the Worker contract: output is captured durably.
                if let Some(parent) = request.attempt_log_path.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("create {}", parent.display()))?;
                }
                fs::write(&request.attempt_log_path, &reply.stdout).with_context(|| {
                    format!("write {}", request.attempt_log_path.display())
                })?;
                if let Some((path, contents)) = &reply.write_file {
                    let target = request.workdir.join(path);
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent)
                            .with_context(|| format!("create {}", parent.display()))?;
                    }
                    fs::write(&target, contents)
                        .with_context(|| format!("write {}", target.display()))?;
                }
                Ok(InvocationRecord {
                    stdout: reply.stdout,
                    stderr: reply.stderr,
                    exit_code: Some(reply.exit_code),
                    timed_out: false,
                })
            }
        }
    }
}

/// Renderer that produces a minimal deterministic payload.
pub struct PassthroughRenderer;

impl RequestRenderer for PassthroughRenderer {
    fn render(&self, item: &WorkItem) -> Result<String> {
        Ok(format!("review {}", item.id))
    }
}

/// Temporary project root with a `.dispatch/` layout for tests.
pub struct TestBench {
    temp: TempDir,
}

impl TestBench {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        fs::create_dir_all(temp.path().join(".dispatch")).context("create .dispatch")?;
        Ok(Self { temp })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Write the worklist at the default configured location.
    pub fn write_worklist(&self, ids: &[&str]) -> Result<()> {
        let mut contents = ids.join("\n");
        contents.push('\n');
        fs::write(self.root().join(".dispatch/worklist.txt"), contents).context("write worklist")
    }

    /// Write an artifact file relative to the project root.
    pub fn write_artifact(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    /// Default config with a short invocation timeout for tests.
    pub fn config(&self) -> DispatchConfig {
        DispatchConfig {
            invocation_timeout_secs: 5,
            ..DispatchConfig::default()
        }
    }
}
