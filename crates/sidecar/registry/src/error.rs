//! Registry errors.

use sidecar_types::SidecarKey;
use thiserror::Error;

/// Error type for expectation registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An expectation for the key is already registered or was already
    /// settled.
    #[error("duplicate expectation for {key}: registered by `{existing}`, rejected from `{rejected}`")]
    DuplicateExpectation {
        /// The contested key.
        key: SidecarKey,
        /// Scenario owning the first expectation.
        existing: String,
        /// Scenario whose registration was rejected.
        rejected: String,
    },
}
