//! Resumable work-queue dispatcher for coding-agent review runs.
//!
//! Feeds an ordered list of work items to an external agent subprocess,
//! verifies each outcome from observable side effects rather than the
//! agent's exit status, and persists progress so a run can resume after a
//! crash or a manual interruption. The architecture enforces a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (retry policy, verdict
//!   classification, worklist parsing). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (state files, guardrail log,
//!   process execution). Isolated to enable scripting in tests.
//!
//! Orchestration modules ([`sequential`], [`pool`]) coordinate core logic
//! with I/O to implement the CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pool;
pub mod sequential;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
