// src/engine/registry.rs

//! Pending task definitions, kept in submission order.

use std::collections::VecDeque;

use tracing::debug;

use crate::engine::readiness::ReadinessTable;
use crate::engine::task::TaskDefinition;
use crate::engine::Identity;
use crate::errors::DuplicateTaskError;
use crate::store::ResourceStore;

/// The pending set: definitions submitted but not yet selected.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    pending: VecDeque<TaskDefinition>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition to the pending set.
    ///
    /// Uniqueness is checked against the readiness ledger, which knows every
    /// identity this engine has ever accepted, including ones that already
    /// ran in an earlier batch.
    pub fn submit(
        &mut self,
        definition: TaskDefinition,
        readiness: &mut ReadinessTable,
    ) -> Result<(), DuplicateTaskError> {
        if readiness.is_known(&definition.identity) {
            return Err(DuplicateTaskError(definition.identity));
        }

        debug!(
            identity = %definition.identity,
            deps = ?definition.dependencies,
            "task submitted"
        );
        readiness.register(&definition.identity);
        self.pending.push_back(definition);
        Ok(())
    }

    /// Remove and return the first pending definition whose dependencies are
    /// all satisfied, scanning in submission order.
    pub fn take_ready(
        &mut self,
        readiness: &ReadinessTable,
        store: &dyn ResourceStore,
    ) -> Option<TaskDefinition> {
        let index = self.pending.iter().position(|definition| {
            definition
                .dependencies
                .iter()
                .all(|dep| readiness.is_satisfied(dep, store))
        })?;
        self.pending.remove(index)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Identities still pending, in submission order.
    pub fn identities(&self) -> Vec<Identity> {
        self.pending
            .iter()
            .map(|definition| definition.identity.clone())
            .collect()
    }
}
