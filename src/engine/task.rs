// src/engine/task.rs

//! Task definitions and in-flight task records.

use std::time::Instant;

use crate::engine::Identity;

/// A unit of work as submitted by the caller.
///
/// Immutable once submitted. `identity` names the output this command
/// produces; `dependencies` name outputs (produced by other tasks, or already
/// present externally) that must exist before it may start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    pub identity: Identity,
    pub dependencies: Vec<Identity>,
    /// Program followed by its arguments. Never interpreted by a shell.
    pub command: Vec<String>,
}

impl TaskDefinition {
    pub fn new<D, C>(identity: impl Into<Identity>, dependencies: D, command: C) -> Self
    where
        D: IntoIterator,
        D::Item: Into<Identity>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            identity: identity.into(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            command: command.into_iter().map(Into::into).collect(),
        }
    }

    /// Command rendered for log lines.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

/// A task whose process has been launched and not yet observed to exit.
#[derive(Debug)]
pub struct RunningTask<H> {
    pub definition: TaskDefinition,
    pub handle: H,
    pub started: Instant,
}

impl<H> RunningTask<H> {
    pub fn new(definition: TaskDefinition, handle: H) -> Self {
        Self {
            definition,
            handle,
            started: Instant::now(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.definition.identity
    }
}
