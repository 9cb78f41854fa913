// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod store;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::Manifest;
use crate::dag::TaskGraph;
use crate::engine::{Engine, EngineOptions};
use crate::errors::{EngineError, Result};
use crate::exec::SystemProcessRunner;
use crate::store::{FileStore, ResourceStore};
use crate::types::OutputMode;

/// Environment variable consulted when `--output` is absent.
pub const OUTPUT_ENV_VAR: &str = "CMDQUEUE_OUTPUT";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - manifest loading
/// - the file-backed resource store
/// - the process runner and engine
/// - failure diagnostics
pub async fn run(args: CliArgs) -> Result<()> {
    let manifest_path = args.manifest.clone();
    let manifest = load_and_validate(&manifest_path)?;

    let root = resolve_root(&args, &manifest, &manifest_path);
    let store = FileStore::new(root.clone());
    debug!(root = ?store.root(), "resolved resource root");

    if args.dry_run {
        print_dry_run(&manifest, &store);
        return Ok(());
    }

    let options = engine_options(&args, &manifest);
    let output = resolve_output(
        args.output,
        std::env::var(OUTPUT_ENV_VAR).ok().as_deref(),
        manifest.config.output,
    );
    let runner = SystemProcessRunner::new(Some(root), output);

    let store: Arc<dyn ResourceStore> = Arc::new(store);
    let mut engine = Engine::new(runner, Arc::clone(&store), options);

    let definitions = manifest.definitions();
    for definition in definitions.iter().cloned() {
        engine.submit_definition(definition)?;
    }

    info!(
        tasks = engine.pending_count(),
        workers = options.workers,
        ?output,
        "submitted manifest tasks"
    );

    match engine.run().await {
        Ok(()) => {
            let stats = engine.stats();
            info!(
                launched = stats.launched,
                cache_hits = stats.cache_hits,
                succeeded = stats.succeeded,
                "all tasks ready"
            );
            Ok(())
        }
        Err(err) => {
            if let EngineError::UnsatisfiableGraph { stuck } = &err {
                report_stuck(&definitions, stuck, store.as_ref());
            }
            Err(err.into())
        }
    }
}

/// Root directory for identities and command working directory.
///
/// Priority: `--root`, then `[config].root` (relative to the manifest's
/// directory), then the manifest's directory itself.
fn resolve_root(args: &CliArgs, manifest: &Manifest, manifest_path: &Path) -> PathBuf {
    let manifest_dir = manifest_root_dir(manifest_path);

    if let Some(root) = &args.root {
        return root.clone();
    }

    match &manifest.config.root {
        Some(root) if root.is_absolute() => root.clone(),
        Some(root) => manifest_dir.join(root),
        None => manifest_dir,
    }
}

/// Directory containing the manifest.
///
/// A bare filename like `Cmdqueue.toml` has an empty parent, in which case
/// the current working directory is used.
fn manifest_root_dir(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn engine_options(args: &CliArgs, manifest: &Manifest) -> EngineOptions {
    let workers = args
        .workers
        .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
        .or(manifest.config.workers)
        .unwrap_or_else(EngineOptions::default_workers);

    EngineOptions::new(
        workers,
        Duration::from_millis(manifest.config.poll_interval_ms),
    )
}

/// Output mode priority: `--output`, then `CMDQUEUE_OUTPUT`, then the
/// manifest. An unparsable environment value is ignored with a warning.
pub fn resolve_output(
    cli: Option<OutputMode>,
    env_value: Option<&str>,
    manifest: OutputMode,
) -> OutputMode {
    if let Some(mode) = cli {
        return mode;
    }

    match env_value.map(str::parse::<OutputMode>) {
        Some(Ok(mode)) => mode,
        Some(Err(e)) => {
            warn!(error = %e, "ignoring {}", OUTPUT_ENV_VAR);
            manifest
        }
        None => manifest,
    }
}

/// Log why an unsatisfiable graph could not make progress.
fn report_stuck(
    definitions: &[crate::engine::TaskDefinition],
    stuck: &[String],
    store: &dyn ResourceStore,
) {
    let graph = TaskGraph::from_definitions(definitions);
    let report = graph.diagnose(stuck, store);

    for (task, inputs) in report.missing_inputs.iter() {
        error!(task = %task, ?inputs, "waiting on inputs that nothing produces and do not exist");
    }
    for cycle in report.cycles.iter() {
        error!(?cycle, "tasks depend on each other in a cycle");
    }
    if !report.blocked.is_empty() {
        error!(tasks = ?report.blocked, "tasks blocked behind other stuck tasks");
    }
}

/// Dry-run output: print tasks, deps, commands and what would be skipped.
fn print_dry_run(manifest: &Manifest, store: &dyn ResourceStore) {
    let definitions = manifest.definitions();
    let graph = TaskGraph::from_definitions(&definitions);

    println!("cmdqueue dry-run");
    match manifest.config.workers {
        Some(n) => println!("  config.workers = {n}"),
        None => println!(
            "  config.workers = {} (available parallelism)",
            EngineOptions::default_workers()
        ),
    }
    println!("  config.poll_interval_ms = {}", manifest.config.poll_interval_ms);
    println!("  config.output = {:?}", manifest.config.output);
    println!();

    println!("tasks ({}):", definitions.len());
    for definition in definitions.iter() {
        let status = if store.exists(&definition.identity) {
            "exists, will be skipped"
        } else {
            "will run"
        };
        println!("  - {} ({status})", definition.identity);
        println!("      cmd: {:?}", definition.command);
        if !definition.dependencies.is_empty() {
            println!("      deps: {:?}", definition.dependencies);
        }
    }

    let roots = graph.roots();
    println!();
    println!("roots ({}): {:?}", roots.len(), roots);

    let inputs = graph.external_inputs();
    if !inputs.is_empty() {
        println!("external inputs ({}): {:?}", inputs.len(), inputs);
    }

    let missing = graph.missing_inputs(store);
    if !missing.is_empty() {
        println!("missing inputs ({}): {:?}", missing.len(), missing);
    }

    for cycle in graph.cycles() {
        println!("cycle: {:?}", cycle);
    }

    debug!("dry-run complete (no execution)");
}
