// src/store/memory.rs

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::ResourceStore;

/// In-memory store: a shared set of identities that "exist".
///
/// Clones share the same set, so a test can hand one clone to the engine and
/// keep another to add or remove resources while a run is in progress.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashSet<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store that already contains the given identities.
    pub fn with_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for entry in entries {
            store.insert(entry);
        }
        store
    }

    pub fn insert(&self, identity: impl Into<String>) {
        self.lock().insert(identity.into());
    }

    /// Returns `true` if the identity was present.
    pub fn remove(&self, identity: &str) -> bool {
        self.lock().remove(identity)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A poisoned set is still a valid set of strings.
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ResourceStore for MemoryStore {
    fn exists(&self, identity: &str) -> bool {
        self.lock().contains(identity)
    }
}
