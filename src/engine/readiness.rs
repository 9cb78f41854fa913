// src/engine/readiness.rs

//! Monotonic readiness ledger.

use std::collections::HashMap;

use tracing::debug;

use crate::engine::Identity;
use crate::store::ResourceStore;

/// Mapping `Identity -> bool` recording which identities have been produced.
///
/// - Submitting a task records its identity as `false`.
/// - An entry flips to `true` when the task succeeds, or when its output is
///   found to already exist at selection time.
/// - Entries never flip back to `false`.
#[derive(Debug, Default)]
pub struct ReadinessTable {
    entries: HashMap<Identity, bool>,
}

impl ReadinessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the identity has an entry at all (ready or not).
    pub fn is_known(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn is_ready(&self, identity: &str) -> bool {
        self.entries.get(identity).copied().unwrap_or(false)
    }

    /// Record a managed identity as not yet produced.
    ///
    /// Leaves an existing entry untouched, so a `true` is never reverted.
    pub fn register(&mut self, identity: &str) {
        self.entries.entry(identity.to_string()).or_insert(false);
    }

    pub fn mark_ready(&mut self, identity: &str) {
        debug!(identity = %identity, "marking identity ready");
        self.entries.insert(identity.to_string(), true);
    }

    /// Dependency satisfaction rule.
    ///
    /// A dependency is satisfied if the ledger says it is ready, or if the
    /// ledger has never heard of it and the resource exists right now.
    /// Managed identities that are not ready yet are never satisfied by
    /// external existence; their own task must be selected first.
    pub fn is_satisfied(&self, dependency: &str, store: &dyn ResourceStore) -> bool {
        match self.entries.get(dependency) {
            Some(ready) => *ready,
            None => store.exists(dependency),
        }
    }

    /// Number of identities currently marked ready.
    pub fn ready_count(&self) -> usize {
        self.entries.values().filter(|ready| **ready).count()
    }
}
