// src/exec/backend.rs

//! Pluggable process runner abstraction.
//!
//! The scheduler talks to a `ProcessRunner` instead of spawning processes
//! itself. Production code uses [`SystemProcessRunner`](super::SystemProcessRunner);
//! tests provide a fake that scripts exit codes and records launches.

use anyhow::Result;

use crate::engine::TaskDefinition;

/// Status reported by a non-blocking poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    /// Exit code; `-1` when the process was terminated without one.
    Exited(i32),
}

/// How tasks are turned into running processes.
///
/// Neither method may block: `launch` returns as soon as the process has been
/// started and `poll` only reports what is already known.
pub trait ProcessRunner {
    /// Per-process handle kept by the scheduler while the task runs.
    type Handle: Send;

    /// Start the task's command.
    fn launch(&mut self, task: &TaskDefinition) -> Result<Self::Handle>;

    /// Check whether the process behind `handle` has exited.
    fn poll(&mut self, handle: &mut Self::Handle) -> Result<ProcessStatus>;
}
