//! The sidecar watcher.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use sidecar_config::WatcherConfig;
use sidecar_monitor::DirectoryMonitor;
use sidecar_reconcile::{
    DrainOutcome, ErrorReport, Mismatch, ReconcileStats, Reconciler, Verdict,
};
use sidecar_types::{ConsensusTimestamp, ExpectedSidecar, SidecarPayload, SidecarRecord};
use tracing::{debug, info};

use crate::{
    WatcherError, WatcherState,
    lifecycle::Lifecycle,
    pipeline::{Pipeline, PipelineSettings},
};

/// Upper bound on a single drain wait.
const MAX_WAIT: Duration = Duration::from_secs(u32::MAX as u64);

/// Verifies the sidecars a node writes against the ones a driver expects.
///
/// Shared between threads by reference or `Arc`; every method takes `&self`.
/// Dropping the watcher tears it down.
#[derive(Debug)]
pub struct SidecarWatcher {
    config: WatcherConfig,
    reconciler: Arc<Reconciler>,
    lifecycle: Mutex<Lifecycle<Pipeline>>,
}

impl SidecarWatcher {
    /// Create a watcher; nothing is watched until [`Self::watch`].
    pub fn new(config: WatcherConfig) -> Result<Self, WatcherError> {
        config.validate()?;
        let reconciler = Arc::new(Reconciler::new(config.grace_period()));
        Ok(Self { config, reconciler, lifecycle: Mutex::new(Lifecycle::new()) })
    }

    /// The configuration in use.
    pub const fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WatcherState {
        self.lifecycle.lock().state()
    }

    /// Start watching the sidecar directory in the background.
    ///
    /// Fails if the directory is unavailable or the watcher already started.
    pub fn watch(&self) -> Result<(), WatcherError> {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.ensure_startable()?;

        let dir = &self.config.sidecar_dir;
        let monitor = DirectoryMonitor::open(dir, self.config.completion.clone().into_strategy())?;
        let settings = PipelineSettings {
            poll_interval: self.config.poll_interval(),
            channel_capacity: self.config.channel_capacity,
            limits: self.config.limits.into(),
        };
        let pipeline = Pipeline::spawn(monitor, settings, Arc::clone(&self.reconciler))?;
        lifecycle.start(pipeline)?;
        info!(dir = %dir.display(), completion = ?self.config.completion, "watching sidecars");
        Ok(())
    }

    /// Register an expected sidecar.
    ///
    /// Accepted while watching or draining. Returns how the expectation was
    /// classified: matched or mismatched if its sidecar was already seen,
    /// pending otherwise.
    pub fn add_expected_sidecar(&self, expected: ExpectedSidecar) -> Result<Verdict, WatcherError> {
        let lifecycle = self.lifecycle.lock();
        let state = lifecycle.state();
        if !state.accepts_expectations() {
            return Err(WatcherError::NotAccepting(state));
        }
        let key = expected.key();
        let verdict = self.reconciler.register(expected)?;
        debug!(key = %key, ?verdict, "expectation registered");
        Ok(verdict)
    }

    /// Register the sidecar `spec_name` expects for the transaction at
    /// `timestamp`.
    pub fn register_expectation(
        &self,
        spec_name: impl Into<String>,
        timestamp: ConsensusTimestamp,
        payload: impl Into<SidecarPayload>,
    ) -> Result<Verdict, WatcherError> {
        self.add_expected_sidecar(ExpectedSidecar::new(
            spec_name,
            SidecarRecord::new(timestamp, payload),
        ))
    }

    /// Block until every registered expectation has settled, `timeout`
    /// passes, the pipeline halts, or the watcher is torn down.
    ///
    /// Moves a watching watcher to draining. When the pipeline is not running
    /// the current state is reported without waiting.
    pub fn wait_until_finished(&self, timeout: Duration) -> DrainOutcome {
        let running = self.lifecycle.lock().drain();
        let deadline = if running { Instant::now() + timeout.min(MAX_WAIT) } else { Instant::now() };
        let outcome = self.reconciler.wait_until_drained(deadline);
        let stats = self.reconciler.stats();
        info!(
            %outcome,
            matched = stats.matched,
            mismatched = stats.mismatched,
            pending = stats.pending,
            "finished waiting for sidecars"
        );
        outcome
    }

    /// Stop the pipeline, release the directory and wake any driver blocked
    /// in [`Self::wait_until_finished`]. Safe to call repeatedly.
    pub fn tear_down(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if let Some(pipeline) = lifecycle.stop() {
            pipeline.stop();
            info!(dir = %self.config.sidecar_dir.display(), "stopped watching sidecars");
        }
        self.reconciler.stop();
    }

    /// Whether no observed sidecar differed from its expectation.
    pub fn there_are_no_mismatched_sidecars(&self) -> bool {
        self.reconciler.has_no_mismatches()
    }

    /// Whether every registered expectation has been settled.
    pub fn there_are_no_pending_sidecars(&self) -> bool {
        self.reconciler.has_no_pending()
    }

    /// Human-readable summary of every problem found; empty when there is
    /// none.
    pub fn get_errors(&self) -> String {
        self.report().to_string()
    }

    /// Every problem found, with the expectations still outstanding.
    pub fn report(&self) -> ErrorReport {
        self.reconciler.report()
    }

    /// Expectations still waiting for a sidecar, ordered by key.
    pub fn pending_sidecars(&self) -> Vec<ExpectedSidecar> {
        self.reconciler.pending()
    }

    /// Every mismatch found so far.
    pub fn mismatches(&self) -> Vec<Mismatch> {
        self.reconciler.mismatches()
    }

    /// Current counters.
    pub fn stats(&self) -> ReconcileStats {
        self.reconciler.stats()
    }
}

impl Drop for SidecarWatcher {
    fn drop(&mut self) {
        self.tear_down();
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path, thread};

    use alloy_primitives::{Address, U256};
    use sidecar_codec::write_stream_file;
    use sidecar_config::CompletionConfig;
    use sidecar_types::{ContractAction, ContractActions, ContractStateChanges, StorageChange};

    use super::*;

    const WAIT: Duration = Duration::from_secs(10);

    fn config(dir: &Path) -> WatcherConfig {
        WatcherConfig {
            poll_interval_ms: 10,
            completion: CompletionConfig::Immediate,
            ..WatcherConfig::for_dir(dir)
        }
    }

    fn frames(seconds: u64) -> SidecarRecord {
        SidecarRecord::new(
            ConsensusTimestamp::from_seconds(seconds),
            ContractActions(vec![ContractAction::call(
                Address::repeat_byte(1),
                Address::repeat_byte(2),
                21_000,
            )]),
        )
    }

    fn write_records(dir: &Path, name: &str, records: &[SidecarRecord]) {
        let staging = dir.join(format!("{name}.tmp"));
        write_stream_file(&staging, records).unwrap();
        fs::rename(staging, dir.join(name)).unwrap();
    }

    #[test]
    fn watch_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = SidecarWatcher::new(config(&dir.path().join("missing"))).unwrap();
        assert!(matches!(watcher.watch(), Err(WatcherError::DirectoryUnavailable(_))));
        assert_eq!(watcher.state(), WatcherState::Initializing);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = WatcherConfig { channel_capacity: 0, ..WatcherConfig::default() };
        assert!(matches!(SidecarWatcher::new(config), Err(WatcherError::Config(_))));

        let config = WatcherConfig { grace_period_secs: 0, ..WatcherConfig::default() };
        assert!(matches!(SidecarWatcher::new(config), Err(WatcherError::Config(_))));
    }

    #[test]
    fn expectations_need_a_running_watcher() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = SidecarWatcher::new(config(dir.path())).unwrap();
        let ts = ConsensusTimestamp::from_seconds(1);

        let result = watcher.register_expectation("early", ts, ContractActions::default());
        assert!(matches!(result, Err(WatcherError::NotAccepting(WatcherState::Initializing))));

        watcher.watch().unwrap();
        assert!(matches!(watcher.watch(), Err(WatcherError::AlreadyStarted(_))));
        watcher.register_expectation("on time", ts, ContractActions::default()).unwrap();

        watcher.tear_down();
        let result = watcher.register_expectation("late", ts, ContractActions::default());
        assert!(matches!(result, Err(WatcherError::NotAccepting(WatcherState::Stopped))));
    }

    #[test]
    fn matches_files_written_after_registration() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = SidecarWatcher::new(config(dir.path())).unwrap();
        watcher.watch().unwrap();
        watcher.add_expected_sidecar(ExpectedSidecar::new("calls", frames(100))).unwrap();

        write_records(dir.path(), "t_01.rcd", &[frames(100)]);
        assert_eq!(watcher.wait_until_finished(WAIT), DrainOutcome::Drained);
        assert_eq!(watcher.state(), WatcherState::Draining);
        assert!(watcher.there_are_no_mismatched_sidecars());
        assert!(watcher.there_are_no_pending_sidecars());
        assert_eq!(watcher.get_errors(), "");

        watcher.tear_down();
        watcher.tear_down();
        assert_eq!(watcher.state(), WatcherState::Stopped);
    }

    #[test]
    fn reports_mismatch_with_both_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = SidecarWatcher::new(config(dir.path())).unwrap();
        watcher.watch().unwrap();
        let ts = ConsensusTimestamp::from_seconds(200);
        let contract = Address::repeat_byte(0xcc);
        let change = |after: u64| {
            ContractStateChanges::new().with_change(
                contract,
                StorageChange::written(U256::ZERO, U256::from(5), U256::from(after)),
            )
        };
        watcher.register_expectation("storage", ts, change(7)).unwrap();

        write_records(dir.path(), "t_01.rcd", &[SidecarRecord::new(ts, change(5))]);
        assert_eq!(watcher.wait_until_finished(WAIT), DrainOutcome::Drained);
        assert!(!watcher.there_are_no_mismatched_sidecars());
        let mismatches = watcher.mismatches();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].actual.record.payload, SidecarPayload::from(change(5)));
        assert!(watcher.get_errors().contains(&format!("contract {contract} slot 0")));
    }

    #[test]
    fn times_out_with_pending_expectation() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = SidecarWatcher::new(config(dir.path())).unwrap();
        watcher.watch().unwrap();
        watcher.add_expected_sidecar(ExpectedSidecar::new("never", frames(300))).unwrap();

        let outcome = watcher.wait_until_finished(Duration::from_millis(100));
        assert_eq!(outcome, DrainOutcome::TimedOut);
        assert!(!watcher.there_are_no_pending_sidecars());
        assert_eq!(watcher.pending_sidecars().len(), 1);
        assert!(watcher.get_errors().contains("pending ACTIONS@300.000000000 for `never`"));
    }

    #[test]
    fn vanished_directory_halts_the_wait() {
        let dir = tempfile::tempdir().unwrap();
        let watched = dir.path().join("sidecar");
        fs::create_dir(&watched).unwrap();
        let watcher = SidecarWatcher::new(config(&watched)).unwrap();
        watcher.watch().unwrap();
        watcher.add_expected_sidecar(ExpectedSidecar::new("calls", frames(100))).unwrap();

        fs::remove_dir(&watched).unwrap();
        assert_eq!(watcher.wait_until_finished(WAIT), DrainOutcome::Halted);
        assert!(watcher.get_errors().contains("sidecar pipeline halted"));
        watcher.tear_down();
    }

    #[test]
    fn corrupt_file_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = SidecarWatcher::new(config(dir.path())).unwrap();
        watcher.watch().unwrap();
        watcher.add_expected_sidecar(ExpectedSidecar::new("calls", frames(100))).unwrap();

        fs::write(dir.path().join("t_01.rcd"), b"garbage").unwrap();
        write_records(dir.path(), "t_02.rcd", &[frames(100)]);
        assert_eq!(watcher.wait_until_finished(WAIT), DrainOutcome::Drained);
        assert_eq!(watcher.stats().decode_errors, 1);
        assert!(watcher.get_errors().contains("failed to decode"));
        assert!(watcher.there_are_no_mismatched_sidecars());
    }

    #[test]
    fn tear_down_wakes_a_waiting_driver() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = SidecarWatcher::new(config(dir.path())).unwrap();
        watcher.watch().unwrap();
        watcher.add_expected_sidecar(ExpectedSidecar::new("never", frames(300))).unwrap();

        thread::scope(|scope| {
            let waiter = scope.spawn(|| {
                let started = Instant::now();
                (watcher.wait_until_finished(WAIT), started.elapsed())
            });
            thread::sleep(Duration::from_millis(100));
            watcher.tear_down();

            let (outcome, waited) = waiter.join().unwrap();
            assert_eq!(outcome, DrainOutcome::Stopped);
            assert!(waited < WAIT / 2);
        });
        assert_eq!(watcher.state(), WatcherState::Stopped);
        assert!(!watcher.there_are_no_pending_sidecars());
    }

    #[test]
    fn wait_after_tear_down_reports_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = SidecarWatcher::new(config(dir.path())).unwrap();
        watcher.watch().unwrap();
        watcher.add_expected_sidecar(ExpectedSidecar::new("never", frames(300))).unwrap();
        watcher.tear_down();
        assert_eq!(watcher.wait_until_finished(WAIT), DrainOutcome::Stopped);
    }

    #[test]
    fn wait_without_pipeline_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = SidecarWatcher::new(config(dir.path())).unwrap();
        assert_eq!(watcher.wait_until_finished(WAIT), DrainOutcome::Drained);
        assert_eq!(watcher.state(), WatcherState::Initializing);
    }
}
