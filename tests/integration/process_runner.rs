// tests/integration/process_runner.rs
//
// These spawn real processes through `sh`, so they only run on unix.

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cmdqueue::engine::{Engine, EngineOptions, TaskDefinition};
use cmdqueue::errors::EngineError;
use cmdqueue::exec::{ProcessRunner, ProcessStatus, SystemProcessRunner};
use cmdqueue::store::{FileStore, ResourceStore};
use cmdqueue::types::OutputMode;
use cmdqueue_test_utils::{init_tracing, with_timeout};

const NO_DEPS: [&str; 0] = [];

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

fn file_engine(root: &Path, workers: usize, output: OutputMode) -> Engine<SystemProcessRunner> {
    let runner = SystemProcessRunner::new(Some(root.to_path_buf()), output);
    let store: Arc<dyn ResourceStore> = Arc::new(FileStore::new(root));
    Engine::new(runner, store, EngineOptions::new(workers, Duration::from_millis(5)))
}

#[tokio::test]
async fn test_commands_produce_outputs_in_order() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut engine = file_engine(dir.path(), 2, OutputMode::Null);

    engine
        .submit("b.txt", ["a.txt"], sh("cat a.txt > b.txt && echo b >> b.txt"))
        .unwrap();
    engine.submit("a.txt", NO_DEPS, sh("echo a > a.txt")).unwrap();

    with_timeout(engine.run()).await.unwrap();

    let b = fs::read_to_string(dir.path().join("b.txt")).unwrap();
    assert_eq!(b, "a\nb\n");
    assert_eq!(engine.stats().launched, 2);
}

#[tokio::test]
async fn test_second_run_skips_existing_outputs() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let mut first = file_engine(dir.path(), 1, OutputMode::Null);
    first.submit("x.txt", NO_DEPS, sh("echo x > x.txt")).unwrap();
    with_timeout(first.run()).await.unwrap();
    assert_eq!(first.stats().launched, 1);

    // A fresh engine sees the output on disk and never runs the command.
    let mut second = file_engine(dir.path(), 1, OutputMode::Null);
    second.submit("x.txt", NO_DEPS, sh("exit 9")).unwrap();
    with_timeout(second.run()).await.unwrap();
    assert_eq!(second.stats().launched, 0);
    assert_eq!(second.stats().cache_hits, 1);
}

#[tokio::test]
async fn test_nonzero_exit_is_reported_after_drain() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut engine = file_engine(dir.path(), 2, OutputMode::Capture);

    engine.submit("bad", NO_DEPS, sh("echo oops >&2; exit 4")).unwrap();
    engine
        .submit("slow.txt", NO_DEPS, sh("sleep 0.2; echo done > slow.txt"))
        .unwrap();
    engine.submit("never.txt", ["bad"], sh("touch never.txt")).unwrap();

    let err = with_timeout(engine.run()).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::CommandFailed {
            identity: "bad".to_string(),
            command: sh("echo oops >&2; exit 4"),
            exit_code: 4,
        }
    );

    // The in-flight command finished before run() returned.
    assert!(dir.path().join("slow.txt").exists());
    assert!(!dir.path().join("never.txt").exists());
}

#[tokio::test]
async fn test_missing_program_is_a_launch_failure() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut engine = file_engine(dir.path(), 1, OutputMode::Null);

    engine
        .submit("out", NO_DEPS, ["cmdqueue-test-no-such-program"])
        .unwrap();

    match with_timeout(engine.run()).await {
        Err(EngineError::CommandFailed { exit_code, .. }) => assert_eq!(exit_code, -1),
        other => panic!("expected launch failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_arguments_are_not_shell_interpreted() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut engine = file_engine(dir.path(), 1, OutputMode::Null);

    // `touch` receives the literal name, spaces and `$` included.
    engine
        .submit("odd $name.txt", NO_DEPS, ["touch", "odd $name.txt"])
        .unwrap();
    with_timeout(engine.run()).await.unwrap();

    assert!(dir.path().join("odd $name.txt").exists());
}

#[tokio::test]
async fn test_capture_survives_non_utf8_and_bulk_output() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut engine = file_engine(dir.path(), 1, OutputMode::Capture);

    // Invalid UTF-8 first on both streams, then far more than a pipe buffer
    // of stdout. The child only exits 0 if nobody closed its pipes.
    let script = "set -e; printf '\\377\\n'; printf '\\376\\n' >&2; sleep 0.2; \
                  echo there; head -c 300000 /dev/zero | tr '\\0' x; echo; \
                  touch out";
    engine.submit("out", NO_DEPS, sh(script)).unwrap();

    with_timeout(engine.run()).await.unwrap();

    assert!(dir.path().join("out").exists());
    assert_eq!(engine.stats().succeeded, 1);
}

#[tokio::test]
async fn test_capture_exit_waits_for_output_readers() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut runner = SystemProcessRunner::new(Some(dir.path().to_path_buf()), OutputMode::Capture);

    // `sh` exits at once, but the backgrounded sleep keeps stdout open.
    let task = TaskDefinition::new("t", NO_DEPS, sh("sleep 4 & echo started"));
    let mut process = runner.launch(&task).unwrap();
    assert!(process.id().is_some());
    let started = Instant::now();

    let code = tokio::time::timeout(Duration::from_secs(4), async {
        loop {
            match runner.poll(&mut process).unwrap() {
                ProcessStatus::Exited(code) => break code,
                ProcessStatus::Running => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        }
    })
    .await
    .expect("exit must be reported once the grace period ends");

    assert_eq!(code, 0);
    // Reported only after waiting on the still-open pipe.
    assert!(started.elapsed() >= Duration::from_millis(1500));
}

#[tokio::test]
async fn test_runner_poll_reports_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = SystemProcessRunner::new(Some(dir.path().to_path_buf()), OutputMode::Null);
    assert_eq!(runner.output(), OutputMode::Null);

    let task = TaskDefinition::new("t", NO_DEPS, sh("exit 7"));
    let mut child = runner.launch(&task).unwrap();

    let code = with_timeout(async {
        loop {
            match runner.poll(&mut child).unwrap() {
                ProcessStatus::Exited(code) => break code,
                ProcessStatus::Running => tokio::time::sleep(Duration::from_millis(5)).await,
            }
        }
    })
    .await;
    assert_eq!(code, 7);
}

#[test]
fn test_empty_command_cannot_launch() {
    let mut runner = SystemProcessRunner::default();
    let task = TaskDefinition::new("t", NO_DEPS, Vec::<String>::new());
    let err = runner.launch(&task).unwrap_err();
    assert!(err.to_string().contains("empty command"));
}
