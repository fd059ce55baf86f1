//! The expectation registry.

use std::collections::{BTreeMap, btree_map::Entry};

use parking_lot::Mutex;
use sidecar_types::{ExpectedSidecar, SidecarKey};
use tracing::trace;

use crate::RegistryError;

/// Expected sidecars that have not been matched yet.
#[derive(Debug, Default)]
pub struct ExpectationRegistry {
    entries: Mutex<BTreeMap<SidecarKey, ExpectedSidecar>>,
}

impl ExpectationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `expected` under its key.
    ///
    /// Fails if an expectation for the same key is already present.
    pub fn register(&self, expected: ExpectedSidecar) -> Result<(), RegistryError> {
        let key = expected.key();
        match self.entries.lock().entry(key) {
            Entry::Occupied(existing) => Err(RegistryError::DuplicateExpectation {
                key,
                existing: existing.get().spec_name.clone(),
                rejected: expected.spec_name,
            }),
            Entry::Vacant(slot) => {
                trace!(key = %key, spec = %expected.spec_name, "registered expectation");
                slot.insert(expected);
                Ok(())
            }
        }
    }

    /// Remove and return the expectation for `key`, if any.
    pub fn take_matching(&self, key: &SidecarKey) -> Option<ExpectedSidecar> {
        self.entries.lock().remove(key)
    }

    /// Copies of all outstanding expectations, ordered by key.
    pub fn snapshot_unmatched(&self) -> Vec<ExpectedSidecar> {
        self.entries.lock().values().cloned().collect()
    }

    /// Whether an expectation for `key` is outstanding.
    pub fn contains(&self, key: &SidecarKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Number of outstanding expectations.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no expectation is outstanding.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
