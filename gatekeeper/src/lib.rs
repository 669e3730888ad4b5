//! Quality-gated task orchestrator for research artifacts.
//!
//! Drives tasks through Plan, Execute, Verify, Score and a commit gate.
//! Verifiers turn external tool runs into structured findings, a rubric
//! turns findings into a 0-100 score, and track-specific thresholds decide
//! whether the artifact commits, commits with warnings, or goes back for
//! another attempt. Every stage transition is appended to a per-task JSONL
//! session log in `.gatekeeper/sessions/`, which is also the source of truth
//! for resuming a task.
//!
//! Module layout follows a core/io split: `core` is pure decision logic
//! (stages, scoring, gating) with no side effects; `io` owns processes,
//! config, and the store on disk; `scheduler` and `run` tie the two
//! together.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod report;
pub mod run;
pub mod scheduler;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
