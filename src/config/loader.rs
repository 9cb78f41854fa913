// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{Manifest, RawManifest};
use crate::errors::Result;

/// Load a manifest from a given path and return the raw `RawManifest`.
///
/// This only performs TOML deserialization; it does **not** perform
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawManifest> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_manifest(&contents)
}

/// Parse manifest TOML from a string.
pub fn parse_manifest(contents: &str) -> Result<RawManifest> {
    let manifest: RawManifest = toml::from_str(contents)?;
    Ok(manifest)
}

/// Load a manifest from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Manifest> {
    let raw = load_from_path(&path)?;
    let manifest = Manifest::try_from(raw)?;
    Ok(manifest)
}

/// Manifest path used when `--manifest` is not given.
pub fn default_manifest_path() -> PathBuf {
    PathBuf::from("Cmdqueue.toml")
}
