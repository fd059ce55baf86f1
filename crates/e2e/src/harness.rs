//! Test harness wiring a simulated node to a running watcher.

use std::{path::Path, sync::Once};

use sidecar_config::{CompletionConfig, WatcherConfig};
use sidecar_watcher::{SidecarWatcher, WatcherError};
use tempfile::TempDir;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt};

use crate::{NodeSimulator, WriteProtocol};

/// Poll interval used by harness watchers, in milliseconds.
pub const HARNESS_POLL_INTERVAL_MS: u64 = 10;

/// Error type for harness setup.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The temporary sidecar directory could not be created.
    #[error("failed to create sidecar directory: {0}")]
    TempDir(#[source] std::io::Error),

    /// The watcher could not be created or started.
    #[error(transparent)]
    Watcher(#[from] WatcherError),
}

/// A watcher watching a temporary directory, and a node writing into it.
///
/// The directory is removed when the harness is dropped, after the watcher
/// has been torn down.
#[derive(Debug)]
pub struct TestHarness {
    /// The watcher under test; already watching.
    pub watcher: SidecarWatcher,
    /// The simulated node, using the protocol the watcher recognises.
    pub node: NodeSimulator,
    dir: TempDir,
}

impl TestHarness {
    /// Start a watcher with `completion` and the fast harness poll interval.
    pub fn start(completion: CompletionConfig) -> Result<Self, HarnessError> {
        Self::start_with(|config| WatcherConfig { completion, ..config })
    }

    /// Start a watcher whose configuration is derived from the harness
    /// defaults by `configure`.
    pub fn start_with(
        configure: impl FnOnce(WatcherConfig) -> WatcherConfig,
    ) -> Result<Self, HarnessError> {
        init_tracing();
        let dir = tempfile::tempdir().map_err(HarnessError::TempDir)?;
        let config = configure(WatcherConfig {
            poll_interval_ms: HARNESS_POLL_INTERVAL_MS,
            ..WatcherConfig::for_dir(dir.path())
        });
        let node = NodeSimulator::new(dir.path(), WriteProtocol::for_completion(&config.completion));
        let watcher = SidecarWatcher::new(config)?;
        watcher.watch()?;
        Ok(Self { watcher, node, dir })
    }

    /// The watched directory.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Install a log subscriber honouring `RUST_LOG`, once per process.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        // Another test framework may have installed a subscriber already.
        let _ = fmt().with_env_filter(EnvFilter::from_default_env()).with_test_writer().try_init();
    });
}
