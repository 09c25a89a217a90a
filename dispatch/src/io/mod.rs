//! Side-effecting operations: state files, guardrails, process control.

pub mod config;
pub mod forensics;
pub mod guardrail;
pub mod invoker;
pub mod paths;
pub mod pool_state;
pub mod process;
pub mod render;
pub mod state;
pub mod verify;
pub mod worklist;
