use std::str::FromStr;

use clap::ValueEnum;
use serde::Deserialize;

/// What happens to the stdout/stderr of launched commands.
///
/// - `Inherit`: children write straight to our own stdout/stderr (default).
/// - `Capture`: output is piped and re-emitted line by line through `tracing`,
///   tagged with the task identity.
/// - `Null`: output is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Inherit,
    Capture,
    Null,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Inherit
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inherit" => Ok(OutputMode::Inherit),
            "capture" => Ok(OutputMode::Capture),
            "null" => Ok(OutputMode::Null),
            other => Err(format!(
                "invalid output mode: {other} (expected \"inherit\", \"capture\" or \"null\")"
            )),
        }
    }
}
