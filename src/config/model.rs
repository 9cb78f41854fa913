// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::engine::TaskDefinition;
use crate::types::OutputMode;

/// Manifest as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// workers = 4
/// poll_interval_ms = 100
/// output = "inherit"
///
/// [[task]]
/// output = "ld/0001.jpg"
/// deps = ["orig/0001.jpg"]
/// cmd = ["convert", "orig/0001.jpg", "-scale", "600", "ld/0001.jpg"]
/// ```
///
/// Tasks are an array of tables so that file order is submission order.
#[derive(Debug, Clone, Deserialize)]
pub struct RawManifest {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskEntry>,
}

/// Validated manifest. Obtain one via `Manifest::try_from(raw)` or
/// [`load_and_validate`](crate::config::load_and_validate).
#[derive(Debug, Clone)]
pub struct Manifest {
    pub config: ConfigSection,
    pub tasks: Vec<TaskEntry>,
}

impl Manifest {
    /// Build a manifest without running validation.
    pub(crate) fn new_unchecked(config: ConfigSection, tasks: Vec<TaskEntry>) -> Self {
        Self { config, tasks }
    }

    /// Task definitions in submission order.
    pub fn definitions(&self) -> Vec<TaskDefinition> {
        self.tasks.iter().map(TaskEntry::to_definition).collect()
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Maximum concurrently running commands.
    ///
    /// `None` means one per available CPU.
    #[serde(default)]
    pub workers: Option<usize>,

    /// How long to sleep when no running command has finished.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Handling of child stdout/stderr.
    #[serde(default)]
    pub output: OutputMode,

    /// Directory identities are resolved against and commands run in.
    ///
    /// Relative values are taken relative to the manifest's directory.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            workers: None,
            poll_interval_ms: default_poll_interval_ms(),
            output: OutputMode::default(),
            root: None,
        }
    }
}

/// `[[task]]` entry: one `(identity, dependencies, command)` triple.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskEntry {
    /// Output this command produces; doubles as the task identity.
    pub output: String,

    /// Outputs of other tasks, or pre-existing inputs, needed first.
    #[serde(default)]
    pub deps: Vec<String>,

    /// Program and arguments.
    pub cmd: Vec<String>,
}

impl TaskEntry {
    pub fn to_definition(&self) -> TaskDefinition {
        TaskDefinition::new(
            self.output.clone(),
            self.deps.iter().cloned(),
            self.cmd.iter().cloned(),
        )
    }
}
