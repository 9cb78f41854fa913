// src/engine/mod.rs

//! The dependency-aware command execution engine.
//!
//! - [`task`] defines submitted task definitions and in-flight tasks.
//! - [`registry`] holds the pending set in submission order.
//! - [`readiness`] is the monotonic ledger of produced identities and the
//!   dependency-satisfaction rule.
//! - [`scheduler`] owns the launch / poll / drain loop.
//!
//! There is no up-front topological sort: the graph is discovered lazily by
//! rescanning the pending set whenever a worker slot opens.

/// Canonical identity type: names a task's output and any reference to it.
pub type Identity = String;

/// Outcome of a finished task process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(i32),
}

impl TaskOutcome {
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            TaskOutcome::Success
        } else {
            TaskOutcome::Failed(code)
        }
    }
}

pub mod readiness;
pub mod registry;
pub mod scheduler;
pub mod task;

pub use readiness::ReadinessTable;
pub use registry::TaskRegistry;
pub use scheduler::{Engine, EngineOptions, RunStats};
pub use task::{RunningTask, TaskDefinition};
