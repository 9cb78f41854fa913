// src/store/mod.rs

//! External resource store: where task outputs live.
//!
//! The engine never looks inside an output. It only asks whether the resource
//! named by an identity exists, and treats a "yes" as proof that the work was
//! already done.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

pub mod memory;

pub use memory::MemoryStore;

/// Existence oracle for task outputs and external inputs.
pub trait ResourceStore: Send + Sync + Debug {
    /// Whether the resource named by `identity` exists right now.
    fn exists(&self, identity: &str) -> bool;
}

/// Store backed by the local filesystem.
///
/// Relative identities are resolved against `root`; absolute identities are
/// used as-is.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for an identity.
    pub fn resolve(&self, identity: &str) -> PathBuf {
        let path = Path::new(identity);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ResourceStore for FileStore {
    fn exists(&self, identity: &str) -> bool {
        self.resolve(identity).exists()
    }
}
