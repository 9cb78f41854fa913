// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_manifest_path;
use crate::types::OutputMode;

/// Command-line arguments for `cmdqueue`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cmdqueue",
    version,
    about = "Run a manifest of dependent commands, skipping outputs that already exist.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the manifest (TOML).
    ///
    /// Default: `Cmdqueue.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_manifest_path())]
    pub manifest: PathBuf,

    /// Maximum number of commands running at once.
    ///
    /// Overrides `[config].workers`; defaults to the number of CPUs.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: Option<u64>,

    /// Directory that identities are resolved against and commands run in.
    ///
    /// Overrides `[config].root`; defaults to the manifest's directory.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// What to do with command stdout/stderr.
    ///
    /// If omitted, `CMDQUEUE_OUTPUT`, then `[config].output` is used.
    #[arg(long, value_enum, value_name = "MODE")]
    pub output: Option<OutputMode>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CMDQUEUE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task graph, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
