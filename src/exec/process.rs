// src/exec/process.rs

//! Real process runner built on `tokio::process`.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::TaskDefinition;
use crate::exec::backend::{ProcessRunner, ProcessStatus};
use crate::types::OutputMode;

/// Spawns each task's argv directly (no shell) as a child process.
///
/// Must be used from inside a Tokio runtime: spawning registers the child
/// with the runtime, and `Capture` mode spawns reader tasks.
#[derive(Debug, Clone, Default)]
pub struct SystemProcessRunner {
    working_dir: Option<PathBuf>,
    output: OutputMode,
}

/// How long a finished process may wait for its output readers.
///
/// A background grandchild can keep the pipes open after the child exits;
/// past this window the readers are left running and the exit is reported.
const READER_GRACE: Duration = Duration::from_secs(2);

/// A spawned child plus the tasks forwarding its captured output.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    readers: Vec<JoinHandle<()>>,
    exited: Option<(i32, Instant)>,
}

impl ChildProcess {
    fn new(child: Child) -> Self {
        Self {
            child,
            readers: Vec::new(),
            exited: None,
        }
    }

    /// OS process id, while the child has not been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// `true` once every reader has reached end of stream (or the grace
    /// period since exit ran out).
    fn readers_done(&mut self, exited_at: Instant) -> bool {
        self.readers.retain(|reader| !reader.is_finished());
        if self.readers.is_empty() {
            return true;
        }
        if exited_at.elapsed() >= READER_GRACE {
            warn!(
                pid = self.child.id(),
                readers = self.readers.len(),
                "output still open after exit; no longer waiting for it"
            );
            self.readers.clear();
            return true;
        }
        false
    }
}

impl SystemProcessRunner {
    pub fn new(working_dir: Option<PathBuf>, output: OutputMode) -> Self {
        Self {
            working_dir,
            output,
        }
    }

    pub fn output(&self) -> OutputMode {
        self.output
    }
}

impl ProcessRunner for SystemProcessRunner {
    type Handle = ChildProcess;

    fn launch(&mut self, task: &TaskDefinition) -> Result<ChildProcess> {
        let (program, args) = task
            .command
            .split_first()
            .ok_or_else(|| anyhow!("task '{}' has an empty command", task.identity))?;

        let mut cmd = Command::new(program);
        cmd.args(args);

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        // Children always run to completion, even if the handle is dropped.
        cmd.kill_on_drop(false);

        match self.output {
            OutputMode::Inherit => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            OutputMode::Capture => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
            OutputMode::Null => {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        let child = cmd
            .spawn()
            .with_context(|| format!("spawning process for task '{}'", task.identity))?;

        debug!(
            identity = %task.identity,
            pid = child.id(),
            "process spawned"
        );

        let mut process = ChildProcess::new(child);
        if self.output == OutputMode::Capture {
            if let Some(stdout) = process.child.stdout.take() {
                let reader = forward_lines(task.identity.clone(), stdout, false);
                process.readers.push(reader);
            }
            if let Some(stderr) = process.child.stderr.take() {
                let reader = forward_lines(task.identity.clone(), stderr, true);
                process.readers.push(reader);
            }
        }

        Ok(process)
    }

    /// Reports `Exited` only after the captured output has been forwarded,
    /// so no line is logged after its task is recorded as finished.
    fn poll(&mut self, process: &mut ChildProcess) -> Result<ProcessStatus> {
        let (code, exited_at) = match process.exited {
            Some(exit) => exit,
            None => {
                let status = process
                    .child
                    .try_wait()
                    .context("checking child process status")?;
                match status {
                    Some(status) => {
                        let exit = (status.code().unwrap_or(-1), Instant::now());
                        process.exited = Some(exit);
                        exit
                    }
                    None => return Ok(ProcessStatus::Running),
                }
            }
        };

        if process.readers_done(exited_at) {
            Ok(ProcessStatus::Exited(code))
        } else {
            Ok(ProcessStatus::Running)
        }
    }
}

/// Re-emit every line of a child's output stream through `tracing`.
///
/// Lines are read as raw bytes and logged lossily, so output that is not
/// UTF-8 is still forwarded. The stream is consumed until EOF even after a
/// read error, so the child never blocks on a full pipe or dies of a closed
/// one.
fn forward_lines<R>(identity: String, stream: R, is_stderr: bool) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    if is_stderr {
                        warn!(task = %identity, "stderr: {}", line);
                    } else {
                        info!(task = %identity, "stdout: {}", line);
                    }
                }
                Err(err) => {
                    warn!(task = %identity, error = %err, "failed to read output; discarding the rest");
                    if let Err(err) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                        debug!(task = %identity, error = %err, "discarding output failed");
                    }
                    break;
                }
            }
        }
    })
}
