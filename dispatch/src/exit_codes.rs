//! Stable exit codes for dispatch CLI commands.

/// Command succeeded with no dead-lettered items.
pub const OK: i32 = 0;
/// Command failed due to invalid layout/config/state or other errors.
pub const INVALID: i32 = 1;
/// `dispatch run` finished, but at least one item was dead-lettered.
pub const DEAD_LETTERED: i32 = 2;
