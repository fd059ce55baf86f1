//! Completion strategy selection.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sidecar_monitor::{CompletionStrategy, Immediate, MarkerFile, StableSize};

/// Default quiet period of the stable-size strategy.
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 500;

/// Default marker suffix of the marker-file strategy.
pub const DEFAULT_MARKER_SUFFIX: &str = ".done";

/// How the watcher decides that a stream file is completely written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CompletionConfig {
    /// Size and modification time unchanged for a quiet period.
    StableSize {
        /// Quiet period in milliseconds.
        #[serde(default = "default_quiet_period_ms")]
        quiet_period_ms: u64,
    },
    /// A companion marker file exists.
    MarkerFile {
        /// Suffix appended to the stream file name to form the marker name.
        #[serde(default = "default_marker_suffix")]
        suffix: String,
    },
    /// Files are complete as soon as they are visible.
    Immediate,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self::StableSize { quiet_period_ms: DEFAULT_QUIET_PERIOD_MS }
    }
}

impl CompletionConfig {
    /// Build the configured strategy.
    pub fn into_strategy(self) -> Box<dyn CompletionStrategy> {
        match self {
            Self::StableSize { quiet_period_ms } => {
                Box::new(StableSize::new(Duration::from_millis(quiet_period_ms)))
            }
            Self::MarkerFile { suffix } => Box::new(MarkerFile::new(suffix)),
            Self::Immediate => Box::new(Immediate),
        }
    }
}

const fn default_quiet_period_ms() -> u64 {
    DEFAULT_QUIET_PERIOD_MS
}

fn default_marker_suffix() -> String {
    DEFAULT_MARKER_SUFFIX.to_owned()
}
