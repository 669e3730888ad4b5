//! Stable exit codes for gatekeeper CLI commands.

/// Command succeeded; the task committed or is still in flight.
pub const OK: i32 = 0;
/// The quality gate blocked the task (retrying or escalated) or it was
/// abandoned.
pub const BLOCKED: i32 = 1;
/// Invalid input, bad config, or an internal failure.
pub const INTERNAL: i32 = 2;
