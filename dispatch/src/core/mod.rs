//! Pure decision logic for the dispatcher.
//!
//! Nothing in this module performs I/O. Every function is deterministic
//! given its inputs, which keeps the retry/dead-letter state machine and
//! verdict classification testable without touching the filesystem or
//! spawning processes.

pub mod classify;
pub mod policy;
pub mod types;
pub mod worklist;
