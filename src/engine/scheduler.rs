// src/engine/scheduler.rs

//! The scheduler loop.
//!
//! ```text
//! RUNNING --(first failure)--> DRAINING --(nothing in flight)--> FAILED
//!    |
//!    +--(nothing pending, nothing in flight)--> DONE
//!    +--(nothing runnable, nothing in flight)--> FAILED (UnsatisfiableGraph)
//! ```
//!
//! A single control task owns the pending set, the readiness ledger and the
//! running set. Parallelism comes from the child processes themselves.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::engine::readiness::ReadinessTable;
use crate::engine::registry::TaskRegistry;
use crate::engine::task::{RunningTask, TaskDefinition};
use crate::engine::{Identity, TaskOutcome};
use crate::errors::{DuplicateTaskError, EngineError};
use crate::exec::{ProcessRunner, ProcessStatus};
use crate::store::ResourceStore;

/// Exit code reported for tasks whose process could not be started or
/// observed.
const LAUNCH_FAILURE_CODE: i32 = -1;

/// Knobs for a single engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum number of processes running at once. Clamped to at least 1.
    pub workers: usize,
    /// Sleep between polls when no running task has finished.
    pub poll_interval: Duration,
}

impl EngineOptions {
    pub fn new(workers: usize, poll_interval: Duration) -> Self {
        Self {
            workers: workers.max(1),
            poll_interval,
        }
    }

    /// One worker per available CPU, falling back to 1.
    pub fn default_workers() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::new(Self::default_workers(), Duration::from_millis(100))
    }
}

/// Counters accumulated over every `run` of one engine instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Processes started.
    pub launched: usize,
    /// Tasks skipped because their output already existed.
    pub cache_hits: usize,
    pub succeeded: usize,
    /// Tasks that exited nonzero or could not be started.
    pub failed: usize,
}

/// Dependency-aware command execution engine.
///
/// Callers `submit` `(identity, dependencies, command)` triples and then
/// `run` them. The graph is resolved lazily: whenever a worker slot is free
/// the pending set is rescanned for the first task whose dependencies are all
/// satisfied.
pub struct Engine<R: ProcessRunner> {
    runner: R,
    store: Arc<dyn ResourceStore>,
    options: EngineOptions,
    registry: TaskRegistry,
    readiness: ReadinessTable,
    running: Vec<RunningTask<R::Handle>>,
    stats: RunStats,
}

impl<R: ProcessRunner> std::fmt::Debug for Engine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.options)
            .field("pending", &self.registry.len())
            .field("running", &self.running.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<R: ProcessRunner> Engine<R> {
    pub fn new(runner: R, store: Arc<dyn ResourceStore>, options: EngineOptions) -> Self {
        Self {
            runner,
            store,
            options: EngineOptions::new(options.workers, options.poll_interval),
            registry: TaskRegistry::new(),
            readiness: ReadinessTable::new(),
            running: Vec::new(),
            stats: RunStats::default(),
        }
    }

    /// Register a task. Fails if the identity was already submitted to this
    /// engine, in this batch or an earlier one.
    pub fn submit<D, C>(
        &mut self,
        identity: impl Into<Identity>,
        dependencies: D,
        command: C,
    ) -> Result<(), DuplicateTaskError>
    where
        D: IntoIterator,
        D::Item: Into<Identity>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        self.submit_definition(TaskDefinition::new(identity, dependencies, command))
    }

    pub fn submit_definition(&mut self, definition: TaskDefinition) -> Result<(), DuplicateTaskError> {
        self.registry.submit(definition, &mut self.readiness)
    }

    /// Number of submitted tasks not yet selected.
    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    /// Identities still pending, in submission order.
    pub fn pending_identities(&self) -> Vec<Identity> {
        self.registry.identities()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn is_ready(&self, identity: &str) -> bool {
        self.readiness.is_ready(identity)
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run every pending task to completion.
    ///
    /// Returns the first failure cause. After a command fails no further
    /// tasks are launched, but every process already started is waited for
    /// before this returns. The readiness ledger survives the call, so more
    /// tasks may be submitted and run afterwards.
    pub async fn run(&mut self) -> Result<(), EngineError> {
        info!(
            pending = self.registry.len(),
            workers = self.options.workers,
            "engine run started"
        );

        let mut failure: Option<EngineError> = None;

        loop {
            if failure.is_none() {
                let starved = self.launch_ready(&mut failure);

                if starved && self.running.is_empty() {
                    let stuck = self.registry.identities();
                    error!(?stuck, "no task can start and nothing is running");
                    return Err(EngineError::UnsatisfiableGraph { stuck });
                }
            }

            if self.running.is_empty() {
                break;
            }

            self.wait_for_completions(&mut failure).await;
        }

        match failure {
            Some(cause) => {
                error!(error = %cause, stats = ?self.stats, "engine run failed");
                Err(cause)
            }
            None => {
                info!(stats = ?self.stats, "engine run finished");
                Ok(())
            }
        }
    }

    /// Launch phase: start ready tasks until the worker limit is reached or
    /// nothing more is ready.
    ///
    /// Returns `true` if the phase stopped because pending tasks remain but
    /// none of them is runnable.
    fn launch_ready(&mut self, failure: &mut Option<EngineError>) -> bool {
        while self.running.len() < self.options.workers && !self.registry.is_empty() {
            let Some(task) = self.registry.take_ready(&self.readiness, self.store.as_ref()) else {
                debug!(
                    pending = self.registry.len(),
                    running = self.running.len(),
                    "no pending task is ready this round"
                );
                return true;
            };

            if self.store.exists(&task.identity) {
                info!(identity = %task.identity, "ready (output already exists)");
                self.readiness.mark_ready(&task.identity);
                self.stats.cache_hits += 1;
                continue;
            }

            if let Err(cause) = self.launch(task) {
                latch_failure(failure, cause);
                return false;
            }
        }

        false
    }

    fn launch(&mut self, task: TaskDefinition) -> Result<(), EngineError> {
        info!(
            identity = %task.identity,
            cmd = %task.command_line(),
            "launching task"
        );

        match self.runner.launch(&task) {
            Ok(handle) => {
                self.stats.launched += 1;
                self.running.push(RunningTask::new(task, handle));
                Ok(())
            }
            Err(err) => {
                error!(
                    identity = %task.identity,
                    error = %err,
                    "failed to launch task"
                );
                self.stats.failed += 1;
                Err(EngineError::CommandFailed {
                    identity: task.identity,
                    command: task.command,
                    exit_code: LAUNCH_FAILURE_CODE,
                })
            }
        }
    }

    /// Poll phase: poll until at least one running task has finished.
    async fn wait_for_completions(&mut self, failure: &mut Option<EngineError>) {
        loop {
            if self.reap_finished(failure) > 0 {
                return;
            }
            debug!(
                running = self.running.len(),
                "no task finished; sleeping before next poll"
            );
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    /// Poll every running task once and retire the ones that exited.
    fn reap_finished(&mut self, failure: &mut Option<EngineError>) -> usize {
        let mut finished = Vec::new();
        let mut index = 0;

        while index < self.running.len() {
            let status = {
                let task = &mut self.running[index];
                match self.runner.poll(&mut task.handle) {
                    Ok(status) => status,
                    Err(err) => {
                        error!(
                            identity = %task.identity(),
                            error = %err,
                            "failed to poll task process"
                        );
                        ProcessStatus::Exited(LAUNCH_FAILURE_CODE)
                    }
                }
            };

            match status {
                ProcessStatus::Running => index += 1,
                ProcessStatus::Exited(code) => {
                    let task = self.running.remove(index);
                    finished.push((task, TaskOutcome::from_exit_code(code)));
                }
            }
        }

        let count = finished.len();
        for (task, outcome) in finished {
            self.record_outcome(task, outcome, failure);
        }
        count
    }

    fn record_outcome(
        &mut self,
        task: RunningTask<R::Handle>,
        outcome: TaskOutcome,
        failure: &mut Option<EngineError>,
    ) {
        let elapsed_ms = task.started.elapsed().as_millis();
        let RunningTask { definition, .. } = task;

        match outcome {
            TaskOutcome::Success => {
                info!(identity = %definition.identity, elapsed_ms, "ready");
                self.readiness.mark_ready(&definition.identity);
                self.stats.succeeded += 1;
            }
            TaskOutcome::Failed(code) => {
                self.stats.failed += 1;
                if failure.is_some() {
                    warn!(
                        identity = %definition.identity,
                        exit_code = code,
                        elapsed_ms,
                        "task failed while draining; first failure is kept"
                    );
                } else {
                    warn!(
                        identity = %definition.identity,
                        exit_code = code,
                        elapsed_ms,
                        "task failed"
                    );
                }
                latch_failure(
                    failure,
                    EngineError::CommandFailed {
                        identity: definition.identity,
                        command: definition.command,
                        exit_code: code,
                    },
                );
            }
        }
    }
}

/// Record `cause` unless a failure is already latched.
fn latch_failure(failure: &mut Option<EngineError>, cause: EngineError) {
    if failure.is_none() {
        error!(
            error = %cause,
            "first failure recorded; draining running tasks without launching more"
        );
        *failure = Some(cause);
    }
}
