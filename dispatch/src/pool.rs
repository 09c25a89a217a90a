//! Bounded-parallel dispatch over a fixed worker pool.
//!
//! Up to `concurrency_limit` invocations run concurrently; each item gets
//! exactly one attempt, with no retry or dead-letter escalation. The bound
//! is structural: a fixed set of slot threads pulls items from a shared
//! queue, so live concurrency can never exceed the pool size. Aggregate
//! state has a single owner — the collector loop on the calling thread —
//! which applies completion messages from the slots and persists after
//! each one. Completion order is whatever order invocations finish.

use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::classify::Classifier;
use crate::core::types::{Verdict, WorkItem};
use crate::io::config::DispatchConfig;
use crate::io::forensics::attempt_log_path;
use crate::io::invoker::{WorkRequest, Worker};
use crate::io::paths::DispatchPaths;
use crate::io::pool_state::{PoolPhase, load_pool_state, save_pool_state};
use crate::io::render::RequestRenderer;
use crate::io::worklist::load_worklist;

/// Completion message from one slot.
#[derive(Debug, Clone)]
pub struct SlotReport {
    pub item: WorkItem,
    pub verdict: Verdict,
}

/// Summary of a parallel sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepOutcome {
    pub total: usize,
    /// Items completed by this run (items already completed are skipped).
    pub newly_completed: u32,
    pub approved_count: u32,
    pub suspect_count: u32,
}

/// Run every not-yet-completed worklist item through the pool once.
///
/// Slot failures of any kind are absorbed into a suspect verdict for that
/// item; they never affect other items' scheduling or abort the sweep.
#[instrument(skip_all, fields(root = %root.display(), slots = cfg.concurrency_limit))]
pub fn run_pool<W, C, R, F>(
    root: &Path,
    worker: &W,
    classifier: &C,
    renderer: &R,
    cfg: &DispatchConfig,
    mut on_item: F,
) -> Result<SweepOutcome>
where
    W: Worker + Sync,
    C: Classifier + Sync,
    R: RequestRenderer + Sync,
    F: FnMut(&SlotReport),
{
    let paths = DispatchPaths::with_state_dir(root, &cfg.state_dir);
    let worklist = load_worklist(&paths.resolve(&cfg.worklist_path))?;
    let mut state = load_pool_state(&paths.pool_state_path)?;
    state.total = worklist.len();
    state.phase = PoolPhase::Running;
    save_pool_state(&paths.pool_state_path, &state)?;

    let pending: Vec<WorkItem> = worklist
        .into_iter()
        .filter(|item| !state.completed.contains(&item.id))
        .collect();
    info!(pending = pending.len(), total = state.total, "starting sweep");

    let (work_tx, work_rx) = mpsc::channel::<WorkItem>();
    let work_rx = Arc::new(Mutex::new(work_rx));
    let (report_tx, report_rx) = mpsc::channel::<SlotReport>();
    for item in pending {
        work_tx.send(item).context("queue work item")?;
    }
    drop(work_tx);

    let mut newly_completed = 0u32;
    thread::scope(|scope| -> Result<()> {
        for _ in 0..cfg.concurrency_limit {
            let work_rx = Arc::clone(&work_rx);
            let report_tx = report_tx.clone();
            let paths = &paths;
            scope.spawn(move || {
                while let Some(item) = next_item(&work_rx) {
                    let verdict = run_slot(paths, worker, classifier, renderer, cfg, &item);
                    if report_tx.send(SlotReport { item, verdict }).is_err() {
                        break;
                    }
                }
            });
        }
        drop(report_tx);

        // Sole mutator of the aggregate state: completions arrive as
        // messages, get folded in here, and are persisted one by one.
        for report in report_rx.iter() {
            state.record(&report.item.id, &report.verdict);
            save_pool_state(&paths.pool_state_path, &state)?;
            newly_completed += 1;
            on_item(&report);
        }
        Ok(())
    })?;

    state.phase = PoolPhase::Complete;
    save_pool_state(&paths.pool_state_path, &state)?;
    info!(
        approved = state.approved_count,
        suspect = state.suspect_count,
        "sweep complete"
    );

    Ok(SweepOutcome {
        total: state.total,
        newly_completed,
        approved_count: state.approved_count,
        suspect_count: state.suspect_count,
    })
}

/// Pull the next queued item, or `None` once the queue is drained (or the
/// queue mutex was poisoned by a panicking sibling slot).
fn next_item(work_rx: &Arc<Mutex<Receiver<WorkItem>>>) -> Option<WorkItem> {
    work_rx.lock().ok()?.recv().ok()
}

fn run_slot<W, C, R>(
    paths: &DispatchPaths,
    worker: &W,
    classifier: &C,
    renderer: &R,
    cfg: &DispatchConfig,
    item: &WorkItem,
) -> Verdict
where
    W: Worker,
    C: Classifier,
    R: RequestRenderer,
{
    match try_slot(paths, worker, classifier, renderer, cfg, item) {
        Ok(verdict) => verdict,
        Err(err) => {
            warn!(item = %item.id, "slot failed: {err:#}");
            Verdict::Suspect {
                reason: format!("slot failed: {err:#}"),
            }
        }
    }
}

fn try_slot<W, C, R>(
    paths: &DispatchPaths,
    worker: &W,
    classifier: &C,
    renderer: &R,
    cfg: &DispatchConfig,
    item: &WorkItem,
) -> Result<Verdict>
where
    W: Worker,
    C: Classifier,
    R: RequestRenderer,
{
    let payload = renderer.render(item)?;
    let request = WorkRequest {
        workdir: paths.root.clone(),
        payload,
        attempt_log_path: attempt_log_path(&paths.attempts_dir, "sweep", item, 1),
        timeout: cfg.invocation_timeout(),
        output_limit_bytes: cfg.output_limit_bytes,
    };
    let record = worker.invoke(&request)?;
    Ok(classifier.classify(item, &record))
}
