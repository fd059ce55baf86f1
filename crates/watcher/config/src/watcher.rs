//! Top-level watcher configuration.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{CompletionConfig, ConfigError, LimitsConfig};

/// Default directory the node writes sidecars to.
pub const DEFAULT_SIDECAR_DIR: &str = "sidecar";

/// Default directory poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Default time an unclaimed sidecar is kept, in seconds.
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 300;

/// Default capacity of the completed-file channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Complete watcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Directory holding the node's stream files.
    #[serde(default = "default_sidecar_dir")]
    pub sidecar_dir: PathBuf,

    /// How often the directory is sampled, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long an observed sidecar waits for its expectation, in seconds.
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,

    /// Completed files queued between the monitor and the decoder.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// How completed files are recognised.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Decode bounds.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            sidecar_dir: PathBuf::from(DEFAULT_SIDECAR_DIR),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            grace_period_secs: DEFAULT_GRACE_PERIOD_SECS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            completion: CompletionConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl WatcherConfig {
    /// Default configuration watching `dir`.
    pub fn for_dir(dir: impl Into<PathBuf>) -> Self {
        Self { sidecar_dir: dir.into(), ..Self::default() }
    }

    /// Load configuration from a file path, auto-detecting format by extension.
    ///
    /// If the path is `None`, returns the default configuration.
    /// Supported extensions: `.json` for JSON, all others default to TOML.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(
            || Ok(Self::default()),
            |p| match p.extension().and_then(|e| e.to_str()) {
                Some("json") => Self::from_json_file(p),
                _ => Self::from_toml_file(p),
            },
        )
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read { path: path.into(), source: e })?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read { path: path.into(), source: e })?;
        Self::from_json(&contents)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Serialize configuration to a JSON string.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the watcher cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid { field: "poll_interval_ms", reason: "must be positive" });
        }
        if self.grace_period_secs == 0 {
            return Err(ConfigError::Invalid { field: "grace_period_secs", reason: "must be positive" });
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid { field: "channel_capacity", reason: "must be positive" });
        }
        if matches!(&self.completion, CompletionConfig::MarkerFile { suffix } if suffix.is_empty()) {
            return Err(ConfigError::Invalid { field: "completion.suffix", reason: "must not be empty" });
        }
        if self.limits.max_frame_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "limits.max_frame_bytes",
                reason: "must be positive",
            });
        }
        Ok(())
    }

    /// Poll interval as a duration.
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Grace period as a duration.
    pub const fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

fn default_sidecar_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SIDECAR_DIR)
}

const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

const fn default_grace_period_secs() -> u64 {
    DEFAULT_GRACE_PERIOD_SECS
}

const fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}
