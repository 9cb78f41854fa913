// src/errors.rs

//! Crate-wide error types.
//!
//! - [`DuplicateTaskError`] is returned by `Engine::submit`.
//! - [`EngineError`] is the terminal cause reported by `Engine::run`.
//! - [`CmdqueueError`] wraps everything the CLI layer can hit.

use thiserror::Error;

use crate::engine::Identity;

/// A task was submitted for an identity the engine already knows about.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("task '{0}' was already submitted to this engine")]
pub struct DuplicateTaskError(pub Identity);

/// Why a call to `Engine::run` did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Pending work remains, nothing is runnable and nothing is in flight.
    ///
    /// Caused by a missing producer, a broken reference or a cycle.
    #[error(
        "unsatisfiable task graph: {} task(s) can never start: {}",
        stuck.len(),
        stuck.join(", ")
    )]
    UnsatisfiableGraph { stuck: Vec<Identity> },

    /// A launched command exited nonzero (or could not be started at all).
    #[error("command for '{identity}' failed with exit code {exit_code}: {}", command.join(" "))]
    CommandFailed {
        identity: Identity,
        command: Vec<String>,
        exit_code: i32,
    },
}

#[derive(Error, Debug)]
pub enum CmdqueueError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    DuplicateTask(#[from] DuplicateTaskError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type Result<T> = std::result::Result<T, CmdqueueError>;
