//! File completion strategies.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    time::{Duration, Instant, SystemTime},
};

/// Metadata sampled for one candidate file during a poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileProbe {
    /// Full path of the candidate.
    pub path: PathBuf,
    /// Current size in bytes.
    pub len: u64,
    /// Last modification time, when the platform reports one.
    pub modified: Option<SystemTime>,
}

/// Decides when a stream file has been completely written.
///
/// The monitor asks the strategy about every candidate it has not emitted yet
/// on every poll, so strategies may keep per-file state between calls.
pub trait CompletionStrategy: Send + fmt::Debug {
    /// Whether the file described by `probe` is complete at `now`.
    fn is_complete(&mut self, probe: &FileProbe, now: Instant) -> bool;

    /// Drop any state kept for `path`; called once the file was emitted or
    /// has disappeared.
    fn forget(&mut self, _path: &Path) {}
}

/// Size and modification time of a file at the last sample.
#[derive(Clone, Copy, Debug)]
struct Observation {
    len: u64,
    modified: Option<SystemTime>,
    unchanged_since: Instant,
}

/// Treats a file as complete once it has stopped changing for a quiet period.
///
/// A file is never complete on its first sample, and an empty file is never
/// complete: the writer may have created it without writing yet.
#[derive(Debug)]
pub struct StableSize {
    quiet_period: Duration,
    observations: HashMap<PathBuf, Observation>,
}

impl StableSize {
    /// Create a strategy with the given quiet period.
    pub fn new(quiet_period: Duration) -> Self {
        Self { quiet_period, observations: HashMap::new() }
    }

    /// The configured quiet period.
    pub const fn quiet_period(&self) -> Duration {
        self.quiet_period
    }
}

impl CompletionStrategy for StableSize {
    fn is_complete(&mut self, probe: &FileProbe, now: Instant) -> bool {
        let sample = Observation { len: probe.len, modified: probe.modified, unchanged_since: now };
        let Some(previous) = self.observations.get_mut(&probe.path) else {
            self.observations.insert(probe.path.clone(), sample);
            return false;
        };
        if previous.len != probe.len || previous.modified != probe.modified {
            *previous = sample;
            return false;
        }
        probe.len > 0 && now.saturating_duration_since(previous.unchanged_since) >= self.quiet_period
    }

    fn forget(&mut self, path: &Path) {
        self.observations.remove(path);
    }
}

/// Treats a file as complete once a companion marker file exists.
///
/// The marker is the stream file's name with a suffix appended, for example
/// `2024-05-01T10_00_00.000000000Z_01.rcd.done`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerFile {
    suffix: String,
}

impl MarkerFile {
    /// Create a strategy looking for markers with `suffix`.
    pub fn new(suffix: impl Into<String>) -> Self {
        Self { suffix: suffix.into() }
    }

    /// Path of the marker belonging to `path`.
    pub fn marker_for(&self, path: &Path) -> PathBuf {
        let mut marker = path.as_os_str().to_owned();
        marker.push(&self.suffix);
        PathBuf::from(marker)
    }
}

impl CompletionStrategy for MarkerFile {
    fn is_complete(&mut self, probe: &FileProbe, _now: Instant) -> bool {
        self.marker_for(&probe.path).is_file()
    }
}

/// Treats every visible file as complete.
///
/// Suitable for writers that produce the file under a temporary name and
/// rename it into place once finished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Immediate;

impl CompletionStrategy for Immediate {
    fn is_complete(&mut self, _probe: &FileProbe, _now: Instant) -> bool {
        true
    }
}
