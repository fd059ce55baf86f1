//! Polling directory monitor.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use tokio::{
    sync::{mpsc, watch},
    time::MissedTickBehavior,
};
use tracing::{debug, error, trace, warn};

use crate::{
    CompletionStrategy, FileNameError, FileProbe, MonitorError, SidecarFile, SidecarFileName,
};

/// Watches one directory and emits each completed stream file exactly once,
/// in file name order.
///
/// A complete file is held back while a file ordered before it is still being
/// written.
#[derive(Debug)]
pub struct DirectoryMonitor {
    dir: PathBuf,
    strategy: Box<dyn CompletionStrategy>,
    /// Emitted files still present in the directory.
    emitted: HashSet<PathBuf>,
    /// Total number of files emitted.
    emitted_total: usize,
    /// Malformed names already warned about and still present.
    rejected: HashSet<PathBuf>,
    /// Candidates seen on the previous poll.
    pending: HashSet<PathBuf>,
}

impl DirectoryMonitor {
    /// Create a monitor for `dir` without touching the filesystem.
    pub fn new(dir: impl Into<PathBuf>, strategy: Box<dyn CompletionStrategy>) -> Self {
        Self {
            dir: dir.into(),
            strategy,
            emitted: HashSet::new(),
            emitted_total: 0,
            rejected: HashSet::new(),
            pending: HashSet::new(),
        }
    }

    /// Create a monitor after checking that `dir` is a readable directory.
    pub fn open(
        dir: impl Into<PathBuf>,
        strategy: Box<dyn CompletionStrategy>,
    ) -> Result<Self, MonitorError> {
        let monitor = Self::new(dir, strategy);
        check_directory(&monitor.dir)?;
        Ok(monitor)
    }

    /// The watched directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of files emitted so far.
    pub const fn emitted_count(&self) -> usize {
        self.emitted_total
    }

    /// Sample the directory once and return newly completed files in name
    /// order.
    ///
    /// Stops at the first candidate that is not complete yet; complete files
    /// ordered after it are returned by a later poll.
    pub fn poll(&mut self, now: Instant) -> Result<Vec<SidecarFile>, MonitorError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| {
            MonitorError::DirectoryUnavailable { path: self.dir.clone(), source }
        })?;

        let mut listed = HashSet::new();
        let mut candidates = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(dir = %self.dir.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            let path = entry.path();
            listed.insert(path.clone());
            if self.emitted.contains(&path) {
                continue;
            }
            let name = match SidecarFileName::from_path(&path) {
                Ok(name) => name,
                Err(FileNameError::NotSidecar) => continue,
                Err(err @ FileNameError::Malformed(_)) => {
                    if self.rejected.insert(path.clone()) {
                        warn!(path = %path.display(), error = %err, "ignoring sidecar file");
                    }
                    continue;
                }
            };
            let metadata = match entry.metadata() {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "skipping unreadable sidecar file");
                    continue;
                }
            };

            let probe = FileProbe { path, len: metadata.len(), modified: metadata.modified().ok() };
            let complete = self.strategy.is_complete(&probe, now);
            candidates.push((name, probe, complete));
        }
        self.emitted.retain(|path| listed.contains(path));
        self.rejected.retain(|path| listed.contains(path));

        let mut seen: HashSet<_> =
            candidates.iter().map(|(_, probe, _)| probe.path.clone()).collect();
        for vanished in self.pending.difference(&seen) {
            self.strategy.forget(vanished);
        }
        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        let mut ready = Vec::new();
        for (name, probe, complete) in candidates {
            if !complete {
                trace!(path = %probe.path.display(), len = probe.len, "waiting for sidecar file");
                break;
            }
            trace!(path = %probe.path.display(), len = probe.len, "sidecar file complete");
            seen.remove(&probe.path);
            self.strategy.forget(&probe.path);
            self.emitted.insert(probe.path.clone());
            ready.push(SidecarFile { name, path: probe.path, len: probe.len });
        }
        self.emitted_total += ready.len();
        self.pending = seen;
        Ok(ready)
    }

    /// Poll every `interval` and send completed files to `ready` until
    /// `shutdown` flips to `true`, its sender is dropped, or the receiving
    /// side of `ready` goes away.
    ///
    /// Returns an error if the directory becomes unavailable.
    pub async fn run(
        mut self,
        interval: Duration,
        ready: mpsc::Sender<SidecarFile>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), MonitorError> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(dir = %self.dir.display(), ?interval, "directory monitor started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            let files = match self.poll(Instant::now()) {
                Ok(files) => files,
                Err(err) => {
                    error!(error = %err, "directory monitor failed");
                    return Err(err);
                }
            };
            for file in files {
                if ready.send(file).await.is_err() {
                    debug!("sidecar file receiver dropped; stopping monitor");
                    return Ok(());
                }
            }
        }
        debug!(dir = %self.dir.display(), emitted = self.emitted_total, "directory monitor stopped");
        Ok(())
    }
}

/// Check that `dir` exists, is a directory, and can be listed.
pub fn check_directory(dir: &Path) -> Result<(), MonitorError> {
    let metadata = fs::metadata(dir)
        .map_err(|source| MonitorError::DirectoryUnavailable { path: dir.to_path_buf(), source })?;
    if !metadata.is_dir() {
        return Err(MonitorError::NotADirectory { path: dir.to_path_buf() });
    }
    fs::read_dir(dir)
        .map(drop)
        .map_err(|source| MonitorError::DirectoryUnavailable { path: dir.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Immediate, MarkerFile, StableSize};

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    fn names(files: &[SidecarFile]) -> Vec<String> {
        files.iter().map(|f| f.name.to_string()).collect()
    }

    #[test]
    fn open_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("sidecar");
        let result = DirectoryMonitor::open(&missing, Box::new(Immediate));
        assert!(matches!(result, Err(MonitorError::DirectoryUnavailable { .. })));
    }

    #[test]
    fn open_rejects_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "sidecar", b"");
        let result = DirectoryMonitor::open(&file, Box::new(Immediate));
        assert!(matches!(result, Err(MonitorError::NotADirectory { .. })));
    }

    #[test]
    fn emits_each_file_once_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "2024-01-01T00_00_02Z_01.rcd", b"SCAR");
        write(dir.path(), "2024-01-01T00_00_01Z_02.rcd", b"SCAR");
        write(dir.path(), "2024-01-01T00_00_01Z_01.rcd", b"SCAR");
        let mut monitor = DirectoryMonitor::open(dir.path(), Box::new(Immediate)).unwrap();

        let first = monitor.poll(Instant::now()).unwrap();
        assert_eq!(
            names(&first),
            [
                "2024-01-01T00_00_01Z_01.rcd",
                "2024-01-01T00_00_01Z_02.rcd",
                "2024-01-01T00_00_02Z_01.rcd"
            ]
        );
        assert!(monitor.poll(Instant::now()).unwrap().is_empty());
        assert_eq!(monitor.emitted_count(), 3);
    }

    #[test]
    fn ignores_foreign_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "README.txt", b"hello");
        write(dir.path(), "broken.rcd", b"SCAR");
        write(dir.path(), "a_01.rcd.tmp", b"SCAR");
        fs::create_dir(dir.path().join("b_01.rcd")).unwrap();
        let mut monitor = DirectoryMonitor::open(dir.path(), Box::new(Immediate)).unwrap();

        assert!(monitor.poll(Instant::now()).unwrap().is_empty());
        assert!(monitor.poll(Instant::now()).unwrap().is_empty());
    }

    #[test]
    fn stable_size_holds_back_growing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a_01.rcd", b"SCAR");
        let quiet = Duration::from_millis(200);
        let mut monitor =
            DirectoryMonitor::open(dir.path(), Box::new(StableSize::new(quiet))).unwrap();
        let start = Instant::now();

        assert!(monitor.poll(start).unwrap().is_empty());
        fs::write(&path, b"SCAR\x00\x00\x00\x01").unwrap();
        assert!(monitor.poll(start + quiet).unwrap().is_empty());
        let ready = monitor.poll(start + quiet * 2).unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].len, 8);
    }

    #[test]
    fn later_file_waits_for_earlier_growing_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = write(dir.path(), "a_01.rcd", b"SCAR");
        write(dir.path(), "a_02.rcd", b"SCAR");
        let quiet = Duration::from_millis(200);
        let mut monitor =
            DirectoryMonitor::open(dir.path(), Box::new(StableSize::new(quiet))).unwrap();
        let start = Instant::now();

        assert!(monitor.poll(start).unwrap().is_empty());
        fs::write(&first, b"SCAR\x00\x00\x00\x01").unwrap();
        // a_02 is settled but a_01 is still growing.
        assert!(monitor.poll(start + quiet).unwrap().is_empty());
        let ready = monitor.poll(start + quiet * 2).unwrap();
        assert_eq!(names(&ready), ["a_01.rcd", "a_02.rcd"]);
    }

    #[test]
    fn marker_holds_back_later_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = write(dir.path(), "a_01.rcd", b"SCAR");
        let second = write(dir.path(), "a_02.rcd", b"SCAR");
        let strategy = MarkerFile::new(".done");
        let first_marker = strategy.marker_for(&first);
        let second_marker = strategy.marker_for(&second);
        let mut monitor = DirectoryMonitor::open(dir.path(), Box::new(strategy)).unwrap();

        fs::write(second_marker, b"").unwrap();
        assert!(monitor.poll(Instant::now()).unwrap().is_empty());
        fs::write(first_marker, b"").unwrap();
        assert_eq!(names(&monitor.poll(Instant::now()).unwrap()), ["a_01.rcd", "a_02.rcd"]);
    }

    #[test]
    fn removed_files_are_forgotten() {
        let dir = tempfile::tempdir().unwrap();
        let emitted = write(dir.path(), "a_01.rcd", b"SCAR");
        let broken = write(dir.path(), "broken.rcd", b"SCAR");
        let mut monitor = DirectoryMonitor::open(dir.path(), Box::new(Immediate)).unwrap();
        assert_eq!(monitor.poll(Instant::now()).unwrap().len(), 1);
        assert_eq!((monitor.emitted.len(), monitor.rejected.len()), (1, 1));

        fs::remove_file(emitted).unwrap();
        fs::remove_file(broken).unwrap();
        assert!(monitor.poll(Instant::now()).unwrap().is_empty());
        assert!(monitor.emitted.is_empty());
        assert!(monitor.rejected.is_empty());
        assert_eq!(monitor.emitted_count(), 1);
    }

    #[test]
    fn marker_gates_emission() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a_01.rcd", b"SCAR");
        let strategy = MarkerFile::new(".done");
        let marker = strategy.marker_for(&path);
        let mut monitor = DirectoryMonitor::open(dir.path(), Box::new(strategy)).unwrap();

        assert!(monitor.poll(Instant::now()).unwrap().is_empty());
        fs::write(marker, b"").unwrap();
        assert_eq!(names(&monitor.poll(Instant::now()).unwrap()), ["a_01.rcd"]);
    }

    #[test]
    fn vanished_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let watched = dir.path().join("sidecar");
        fs::create_dir(&watched).unwrap();
        let mut monitor = DirectoryMonitor::open(&watched, Box::new(Immediate)).unwrap();
        fs::remove_dir(&watched).unwrap();

        let result = monitor.poll(Instant::now());
        assert!(matches!(result, Err(MonitorError::DirectoryUnavailable { .. })));
    }

    #[tokio::test]
    async fn run_streams_files_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = DirectoryMonitor::open(dir.path(), Box::new(Immediate)).unwrap();
        let (ready_tx, mut ready_rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task =
            tokio::spawn(monitor.run(Duration::from_millis(10), ready_tx, shutdown_rx));

        write(dir.path(), "a_01.rcd", b"SCAR");
        let file = tokio::time::timeout(Duration::from_secs(5), ready_rx.recv())
            .await
            .expect("file emitted in time")
            .expect("channel open");
        assert_eq!(file.name.index(), 1);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn run_reports_vanished_directory() {
        let dir = tempfile::tempdir().unwrap();
        let watched = dir.path().join("sidecar");
        fs::create_dir(&watched).unwrap();
        let monitor = DirectoryMonitor::open(&watched, Box::new(Immediate)).unwrap();
        let (ready_tx, _ready_rx) = mpsc::channel(4);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        fs::remove_dir(&watched).unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            monitor.run(Duration::from_millis(10), ready_tx, shutdown_rx),
        )
        .await
        .expect("monitor stops in time");
        assert!(matches!(result, Err(MonitorError::DirectoryUnavailable { .. })));
    }
}
