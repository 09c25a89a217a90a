//! Sequential dispatch: one item at a time, retry until approved or
//! dead-lettered.
//!
//! Each worklist item moves through `Pending -> Attempting -> {Approved |
//! retry | DeadLettered}`. State is persisted after every transition that
//! logically occurred, before the next item is touched, so an interrupted
//! run resumes at the persisted cursor with the persisted failure counts.
//! An interrupted mid-attempt item is re-attempted from its persisted
//! count; no partial-attempt state exists.

use std::path::Path;

use anyhow::{Result, bail};
use tracing::{info, instrument, warn};

use crate::core::classify::Classifier;
use crate::core::policy::{RetryDecision, decide};
use crate::core::types::{InvocationRecord, Verdict, WorkItem};
use crate::io::config::DispatchConfig;
use crate::io::forensics::{append_error_log, attempt_log_path};
use crate::io::guardrail::{GuardrailEntry, append_guardrail};
use crate::io::invoker::{WorkRequest, Worker};
use crate::io::paths::DispatchPaths;
use crate::io::render::RequestRenderer;
use crate::io::state::{load_state, save_state};
use crate::io::verify::ChangeDetector;
use crate::io::worklist::load_worklist;

/// Terminal state reached by one item during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemTerminal {
    Approved { attempts: u32 },
    DeadLettered { attempts: u32, reason: String },
}

/// Per-item report delivered to the progress callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub item: WorkItem,
    pub terminal: ItemTerminal,
}

/// Summary of a sequential run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub total: usize,
    pub started_at_cursor: usize,
    pub processed: u32,
    pub dead_lettered: u32,
}

/// Drive the worklist from the persisted cursor to the end.
///
/// Worker invocation failures are absorbed into the per-item retry state
/// machine; only state-store, worklist, renderer, and fingerprint errors
/// terminate the run.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn run_sequential<W, C, R, D, F>(
    root: &Path,
    worker: &W,
    classifier: &C,
    renderer: &R,
    detector: &D,
    cfg: &DispatchConfig,
    mut on_item: F,
) -> Result<RunOutcome>
where
    W: Worker,
    C: Classifier,
    R: RequestRenderer,
    D: ChangeDetector,
    F: FnMut(&ItemOutcome),
{
    let paths = DispatchPaths::with_state_dir(root, &cfg.state_dir);
    let worklist = load_worklist(&paths.resolve(&cfg.worklist_path))?;
    let mut state = load_state(&paths.state_path)?;
    if state.cursor > worklist.len() {
        bail!(
            "dispatch state cursor {} is beyond the {}-item worklist; state and worklist disagree",
            state.cursor,
            worklist.len()
        );
    }
    let started_at_cursor = state.cursor;
    let mut processed = 0u32;
    let mut dead_lettered = 0u32;

    while state.cursor < worklist.len() {
        let item = &worklist[state.cursor];
        info!(item = %item.id, index = item.index, "dispatching item");

        loop {
            let attempt = state.failures(&item.id) + 1;
            let payload = renderer.render(item)?;
            let before = detector.fingerprint(item)?;

            let record = invoke_absorbing(worker, item, attempt, &paths, cfg, payload);
            let verdict = corroborate(classifier.classify(item, &record), detector, item, &before)?;

            match verdict {
                Verdict::Approved => {
                    state.advance_processed(&item.id);
                    save_state(&paths.state_path, &state)?;
                    processed += 1;
                    info!(item = %item.id, attempts = attempt, "item approved");
                    on_item(&ItemOutcome {
                        item: item.clone(),
                        terminal: ItemTerminal::Approved { attempts: attempt },
                    });
                    break;
                }
                Verdict::Suspect { reason } => {
                    let failures = state.record_failure(&item.id);
                    match decide(failures, cfg.failure_ceiling) {
                        RetryDecision::Retry => {
                            save_state(&paths.state_path, &state)?;
                            append_error_log(&paths.error_log_path, item, attempt, &record)?;
                            warn!(item = %item.id, failures, reason = %reason, "attempt failed, retrying");
                        }
                        RetryDecision::DeadLetter => {
                            append_error_log(&paths.error_log_path, item, attempt, &record)?;
                            append_guardrail(
                                &paths.guardrail_path,
                                &GuardrailEntry::now(&item.id, &reason),
                            )?;
                            state.advance_dead_lettered(&item.id);
                            save_state(&paths.state_path, &state)?;
                            dead_lettered += 1;
                            warn!(item = %item.id, failures, reason = %reason, "item dead-lettered");
                            on_item(&ItemOutcome {
                                item: item.clone(),
                                terminal: ItemTerminal::DeadLettered {
                                    attempts: failures,
                                    reason,
                                },
                            });
                            break;
                        }
                    }
                }
            }
        }
    }

    Ok(RunOutcome {
        total: worklist.len(),
        started_at_cursor,
        processed,
        dead_lettered,
    })
}

/// Run one invocation, converting invocation-level errors into a record the
/// classifier will reject. A bad invocation is a transient worker failure,
/// not a reason to abort the run.
fn invoke_absorbing<W: Worker>(
    worker: &W,
    item: &WorkItem,
    attempt: u32,
    paths: &DispatchPaths,
    cfg: &DispatchConfig,
    payload: String,
) -> InvocationRecord {
    let request = WorkRequest {
        workdir: paths.root.clone(),
        payload,
        attempt_log_path: attempt_log_path(&paths.attempts_dir, "run", item, attempt),
        timeout: cfg.invocation_timeout(),
        output_limit_bytes: cfg.output_limit_bytes,
    };
    match worker.invoke(&request) {
        Ok(record) => record,
        Err(err) => {
            warn!(item = %item.id, "worker invocation failed: {err:#}");
            InvocationRecord {
                stdout: String::new(),
                stderr: format!("worker invocation failed: {err:#}"),
                exit_code: None,
                timed_out: false,
            }
        }
    }
}

/// Demote an approved verdict to suspect when the artifact did not change.
///
/// The classifier's self-reported success is necessary but not sufficient:
/// without an observable side effect the attempt failed, whatever the agent
/// printed.
fn corroborate<D: ChangeDetector>(
    verdict: Verdict,
    detector: &D,
    item: &WorkItem,
    before: &Option<String>,
) -> Result<Verdict> {
    match verdict {
        Verdict::Approved => {
            let after = detector.fingerprint(item)?;
            if after == *before {
                Ok(Verdict::Suspect {
                    reason: "approved verdict without an observable artifact change".to_string(),
                })
            } else {
                Ok(Verdict::Approved)
            }
        }
        suspect => Ok(suspect),
    }
}
