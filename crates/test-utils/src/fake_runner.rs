use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use cmdqueue::engine::{Identity, TaskDefinition};
use cmdqueue::exec::{ProcessRunner, ProcessStatus};
use cmdqueue::store::{MemoryStore, ResourceStore};

/// Scripted behaviour of one fake task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Script {
    /// Exit code reported once the task finishes.
    pub exit_code: i32,
    /// Number of polls that report `Running` before the exit is reported.
    pub polls: u32,
    /// Make `launch` itself fail.
    pub launch_error: bool,
}

impl Script {
    pub fn succeed_after(polls: u32) -> Self {
        Self {
            exit_code: 0,
            polls,
            launch_error: false,
        }
    }

    pub fn fail_after(exit_code: i32, polls: u32) -> Self {
        Self {
            exit_code,
            polls,
            launch_error: false,
        }
    }

    pub fn launch_error() -> Self {
        Self {
            exit_code: -1,
            polls: 0,
            launch_error: true,
        }
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::succeed_after(0)
    }
}

/// Everything the fake runner observed.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    /// Identities in launch order.
    pub launched: Vec<Identity>,
    /// Identities and exit codes in the order their exits were observed.
    pub finished: Vec<(Identity, i32)>,
    /// Processes currently "running".
    pub running: usize,
    /// High-water mark of `running`.
    pub max_running: usize,
    /// Launches that happened while a dependency was not yet satisfied.
    pub violations: Vec<(Identity, Identity)>,
}

impl RunLog {
    pub fn succeeded(&self) -> Vec<Identity> {
        self.finished
            .iter()
            .filter(|(_, code)| *code == 0)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// Handle returned by [`FakeRunner::launch`].
#[derive(Debug)]
pub struct FakeHandle {
    identity: Identity,
    remaining_polls: u32,
    exit_code: i32,
}

/// A `ProcessRunner` that never spawns anything.
///
/// - Each task follows its [`Script`] (default: succeed on the first poll).
/// - Launches, exits and concurrency are recorded in a shared [`RunLog`].
/// - When a store is attached, a successful task "writes" its output into it,
///   and every launch checks that each dependency was either produced by a
///   successful fake task or present in the store.
#[derive(Debug, Clone, Default)]
pub struct FakeRunner {
    scripts: HashMap<Identity, Script>,
    log: Arc<Mutex<RunLog>>,
    store: Option<MemoryStore>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize successful outputs into `store` and check dependencies
    /// against it.
    pub fn with_store(mut self, store: MemoryStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn script(mut self, identity: &str, script: Script) -> Self {
        self.scripts.insert(identity.to_string(), script);
        self
    }

    /// Shared handle to the log; stays valid after the runner moves into an
    /// engine.
    pub fn log_handle(&self) -> Arc<Mutex<RunLog>> {
        Arc::clone(&self.log)
    }

    pub fn log(&self) -> RunLog {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, RunLog> {
        self.log.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn check_dependencies(&self, task: &TaskDefinition, log: &mut RunLog) {
        let produced: HashSet<&str> = log
            .finished
            .iter()
            .filter(|(_, code)| *code == 0)
            .map(|(id, _)| id.as_str())
            .collect();

        let mut violations = Vec::new();
        for dep in task.dependencies.iter() {
            let in_store = self.store.as_ref().is_some_and(|s| s.exists(dep));
            if !produced.contains(dep.as_str()) && !in_store {
                violations.push((task.identity.clone(), dep.clone()));
            }
        }
        log.violations.extend(violations);
    }
}

impl ProcessRunner for FakeRunner {
    type Handle = FakeHandle;

    fn launch(&mut self, task: &TaskDefinition) -> anyhow::Result<FakeHandle> {
        let script = self.scripts.get(&task.identity).copied().unwrap_or_default();
        if script.launch_error {
            return Err(anyhow!("scripted launch failure for '{}'", task.identity));
        }

        let log_arc = Arc::clone(&self.log);
        let mut log = log_arc.lock().unwrap_or_else(|p| p.into_inner());
        self.check_dependencies(task, &mut log);
        log.launched.push(task.identity.clone());
        log.running += 1;
        log.max_running = log.max_running.max(log.running);

        Ok(FakeHandle {
            identity: task.identity.clone(),
            remaining_polls: script.polls,
            exit_code: script.exit_code,
        })
    }

    fn poll(&mut self, handle: &mut FakeHandle) -> anyhow::Result<ProcessStatus> {
        if handle.remaining_polls > 0 {
            handle.remaining_polls -= 1;
            return Ok(ProcessStatus::Running);
        }

        {
            let mut log = self.lock();
            log.running -= 1;
            log.finished.push((handle.identity.clone(), handle.exit_code));
        }

        if handle.exit_code == 0 {
            if let Some(store) = &self.store {
                store.insert(handle.identity.clone());
            }
        }

        Ok(ProcessStatus::Exited(handle.exit_code))
    }
}
