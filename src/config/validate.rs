// src/config/validate.rs

use crate::config::model::{Manifest, RawManifest};
use crate::errors::{CmdqueueError, Result};

impl TryFrom<RawManifest> for Manifest {
    type Error = CmdqueueError;

    fn try_from(raw: RawManifest) -> std::result::Result<Self, Self::Error> {
        validate_raw_manifest(&raw)?;
        Ok(Manifest::new_unchecked(raw.config, raw.tasks))
    }
}

/// Structural checks only.
///
/// Dependencies are not resolved here: a dependency nobody
/// produces may be an input file that already exists, and cycles or missing
/// producers are reported by the engine as an unsatisfiable graph.
fn validate_raw_manifest(raw: &RawManifest) -> Result<()> {
    ensure_has_tasks(raw)?;
    validate_global_config(raw)?;
    validate_tasks(raw)?;
    Ok(())
}

fn ensure_has_tasks(raw: &RawManifest) -> Result<()> {
    if raw.tasks.is_empty() {
        return Err(CmdqueueError::ConfigError(
            "manifest must contain at least one [[task]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(raw: &RawManifest) -> Result<()> {
    if raw.config.workers == Some(0) {
        return Err(CmdqueueError::ConfigError(
            "[config].workers must be >= 1 (got 0)".to_string(),
        ));
    }

    if raw.config.poll_interval_ms == 0 {
        return Err(CmdqueueError::ConfigError(
            "[config].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_tasks(raw: &RawManifest) -> Result<()> {
    for (index, task) in raw.tasks.iter().enumerate() {
        if task.output.trim().is_empty() {
            return Err(CmdqueueError::ConfigError(format!(
                "task #{} has an empty `output`",
                index + 1
            )));
        }

        match task.cmd.first() {
            None => {
                return Err(CmdqueueError::ConfigError(format!(
                    "task '{}' has an empty `cmd`",
                    task.output
                )));
            }
            Some(program) if program.trim().is_empty() => {
                return Err(CmdqueueError::ConfigError(format!(
                    "task '{}' has an empty program name in `cmd`",
                    task.output
                )));
            }
            Some(_) => {}
        }

        for dep in task.deps.iter() {
            if dep.trim().is_empty() {
                return Err(CmdqueueError::ConfigError(format!(
                    "task '{}' has an empty entry in `deps`",
                    task.output
                )));
            }
        }
    }
    Ok(())
}
