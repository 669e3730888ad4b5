//! I/O helpers for orchestrator commands.

pub mod config;
pub mod executor;
pub mod layout;
pub mod process;
pub mod session_log;
pub mod task_store;
pub mod verifier;
pub mod verifiers;
