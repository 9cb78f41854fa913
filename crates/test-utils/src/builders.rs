#![allow(dead_code)]

use std::path::PathBuf;

use cmdqueue::config::{ConfigSection, Manifest, RawManifest, TaskEntry};
use cmdqueue::engine::TaskDefinition;
use cmdqueue::types::OutputMode;

/// Builder for `Manifest` to simplify test setup.
pub struct ManifestBuilder {
    raw: RawManifest,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawManifest {
                config: ConfigSection::default(),
                tasks: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, task: TaskEntry) -> Self {
        self.raw.tasks.push(task);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.raw.config.workers = Some(workers);
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.raw.config.poll_interval_ms = ms;
        self
    }

    pub fn output(mut self, mode: OutputMode) -> Self {
        self.raw.config.output = mode;
        self
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.raw.config.root = Some(root.into());
        self
    }

    /// The unvalidated manifest, for exercising validation failures.
    pub fn raw(self) -> RawManifest {
        self.raw
    }

    pub fn build(self) -> Manifest {
        Manifest::try_from(self.raw).expect("Failed to build valid manifest from builder")
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a `[[task]]` entry.
pub struct TaskBuilder {
    task: TaskEntry,
}

impl TaskBuilder {
    /// `cmd` is split on whitespace into program and arguments.
    pub fn new(output: &str, cmd: &str) -> Self {
        Self {
            task: TaskEntry {
                output: output.to_string(),
                deps: vec![],
                cmd: cmd.split_whitespace().map(str::to_string).collect(),
            },
        }
    }

    pub fn dep(mut self, dep: &str) -> Self {
        self.task.deps.push(dep.to_string());
        self
    }

    pub fn deps<'a>(mut self, deps: impl IntoIterator<Item = &'a str>) -> Self {
        self.task.deps.extend(deps.into_iter().map(str::to_string));
        self
    }

    pub fn build(self) -> TaskEntry {
        self.task
    }

    pub fn definition(self) -> TaskDefinition {
        self.task.to_definition()
    }
}
