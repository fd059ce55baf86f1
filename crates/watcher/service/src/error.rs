//! Watcher errors.

use sidecar_config::ConfigError;
use sidecar_monitor::MonitorError;
use sidecar_registry::RegistryError;
use thiserror::Error;

use crate::WatcherState;

/// Error type for watcher operations.
#[derive(Debug, Error)]
pub enum WatcherError {
    /// The configuration cannot be used.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The sidecar directory cannot be watched.
    #[error(transparent)]
    DirectoryUnavailable(#[from] MonitorError),

    /// `watch` was called on a watcher that already started.
    #[error("watcher already started (state: {0})")]
    AlreadyStarted(WatcherState),

    /// Expectations are only accepted while watching or draining.
    #[error("watcher is not accepting expectations (state: {0})")]
    NotAccepting(WatcherState),

    /// The expectation collides with an earlier one.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The pipeline thread or its runtime could not be started.
    #[error("failed to start sidecar pipeline: {0}")]
    Runtime(#[source] std::io::Error),
}
