//! End-to-end lifecycle of a sequential run followed by a resume.

use std::fs;

use dispatch::core::classify::TokenClassifier;
use dispatch::io::config::DispatchConfig;
use dispatch::io::guardrail::load_guardrails;
use dispatch::io::paths::DispatchPaths;
use dispatch::io::state::load_state;
use dispatch::io::verify::FileFingerprint;
use dispatch::sequential::run_sequential;
use dispatch::test_support::{
    PassthroughRenderer, ScriptedWorker, TestBench, approved, approved_with_touch, suspect,
};

#[test]
fn full_run_then_resume_leaves_consistent_artifacts() {
    let bench = TestBench::new().expect("bench");
    bench
        .write_worklist(&["tests/ok.rs", "tests/bad.rs", "tests/late.rs"])
        .expect("worklist");
    bench.write_artifact("tests/ok.rs", "fn ok() {}").expect("artifact");
    bench.write_artifact("tests/bad.rs", "fn bad() {}").expect("artifact");
    bench.write_artifact("tests/late.rs", "fn late() {}").expect("artifact");

    let cfg = DispatchConfig {
        failure_ceiling: 2,
        ..bench.config()
    };

    // Item 0: null success first (approved verdict, no change), then real.
    // Item 1: two suspects, dead-lettered at the ceiling.
    // Item 2: approved immediately.
    let worker = ScriptedWorker::new(vec![
        approved(),
        approved_with_touch("tests/ok.rs", "// reviewed\nfn ok() {}"),
        suspect("asserts on wall-clock time"),
        suspect("asserts on wall-clock time"),
        approved_with_touch("tests/late.rs", "// reviewed\nfn late() {}"),
    ]);
    let detector = FileFingerprint::new(bench.root());
    let outcome = run_sequential(
        bench.root(),
        &worker,
        &TokenClassifier,
        &PassthroughRenderer,
        &detector,
        &cfg,
        |_| {},
    )
    .expect("run");

    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.processed, 2);
    assert_eq!(outcome.dead_lettered, 1);
    assert_eq!(worker.invocation_count(), 5);

    let paths = DispatchPaths::new(bench.root());
    let state = load_state(&paths.state_path).expect("state");
    assert_eq!(state.cursor, 3);
    assert_eq!(
        state.processed,
        vec!["tests/ok.rs".to_string(), "tests/late.rs".to_string()]
    );
    assert!(state.failure_counts.is_empty());

    let guardrails = load_guardrails(&paths.guardrail_path).expect("guardrails");
    assert_eq!(guardrails.len(), 1);
    assert_eq!(guardrails[0].item, "tests/bad.rs");
    assert_eq!(guardrails[0].reason, "asserts on wall-clock time");

    // One failed null-success attempt plus two suspect attempts.
    let errors = fs::read_to_string(&paths.error_log_path).expect("errors.log");
    assert_eq!(errors.matches("=== tests/").count(), 3);

    // Attempt logs exist for the dead-lettered item.
    assert!(paths.attempts_dir.join("run-item-0001-attempt-1.log").is_file());
    assert!(paths.attempts_dir.join("run-item-0001-attempt-2.log").is_file());

    // Resume against the same worklist: everything is finalized, so the
    // worker is never invoked again.
    let idle = ScriptedWorker::new(Vec::new());
    let resumed = run_sequential(
        bench.root(),
        &idle,
        &TokenClassifier,
        &PassthroughRenderer,
        &detector,
        &cfg,
        |_| {},
    )
    .expect("resume");

    assert_eq!(resumed.started_at_cursor, 3);
    assert_eq!(resumed.processed, 0);
    assert_eq!(resumed.dead_lettered, 0);
    assert_eq!(idle.invocation_count(), 0);
}
