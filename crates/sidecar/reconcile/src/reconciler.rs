//! The reconciliation engine.

use std::{
    collections::HashMap,
    fmt,
    path::PathBuf,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use sidecar_registry::{ExpectationRegistry, RegistryError};
use sidecar_types::{ActualSidecar, ExpectedSidecar, SidecarKey};
use tracing::{debug, error, info, trace, warn};

use crate::{ErrorReport, Mismatch, ReportEntry, compare_payloads};

/// How a sidecar was classified when it reached the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The pair was joined and the payloads are equal.
    Matched,
    /// The pair was joined and the payloads differ.
    Mismatched,
    /// The other side has not arrived yet.
    Pending,
    /// An observed sidecar for this key was already seen; this one was
    /// reported and discarded.
    Duplicate,
}

/// Why [`Reconciler::wait_until_drained`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every registered expectation was settled.
    Drained,
    /// The deadline passed with expectations outstanding.
    TimedOut,
    /// The pipeline stopped on a fatal error.
    Halted,
    /// The watcher was torn down with expectations outstanding.
    Stopped,
}

impl fmt::Display for DrainOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Drained => "drained",
            Self::TimedOut => "timed out",
            Self::Halted => "halted",
            Self::Stopped => "stopped",
        })
    }
}

/// Counters describing the engine's progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Pairs with equal payloads.
    pub matched: u64,
    /// Pairs with differing payloads.
    pub mismatched: u64,
    /// Expectations still waiting for a sidecar.
    pub pending: u64,
    /// Observed sidecars waiting for an expectation.
    pub buffered: u64,
    /// Observed sidecars dropped after the grace period.
    pub orphaned: u64,
    /// Observed sidecars that repeated a key.
    pub duplicates: u64,
    /// Decode failures reported.
    pub decode_errors: u64,
}

#[derive(Debug)]
struct Buffered {
    actual: ActualSidecar,
    arrived: Instant,
}

#[derive(Debug, Default)]
struct State {
    /// Observed sidecars without an expectation yet.
    buffered: HashMap<SidecarKey, Buffered>,
    /// Keys already joined, with the scenario that owned them.
    settled: HashMap<SidecarKey, String>,
    entries: Vec<ReportEntry>,
    matched: u64,
    mismatched: u64,
    orphaned: u64,
    duplicates: u64,
    decode_errors: u64,
    halted: Option<String>,
    stopped: bool,
}

impl State {
    /// Outcome for a waiter that cannot make further progress, if any.
    const fn interrupted(&self) -> Option<DrainOutcome> {
        if self.halted.is_some() {
            Some(DrainOutcome::Halted)
        } else if self.stopped {
            Some(DrainOutcome::Stopped)
        } else {
            None
        }
    }

    fn settle(&mut self, expected: ExpectedSidecar, actual: ActualSidecar) -> Verdict {
        let key = expected.key();
        let differences = compare_payloads(&expected.record.payload, &actual.record.payload);
        self.settled.insert(key, expected.spec_name.clone());
        if differences.is_empty() {
            self.matched += 1;
            debug!(key = %key, spec = %expected.spec_name, "sidecar matched");
            return Verdict::Matched;
        }

        self.mismatched += 1;
        warn!(
            key = %key,
            spec = %expected.spec_name,
            differences = differences.len(),
            "sidecar mismatched"
        );
        self.entries.push(ReportEntry::Mismatch(Mismatch { expected, actual, differences }));
        Verdict::Mismatched
    }
}

/// Joins observed sidecars with registered expectations.
///
/// All state changes happen under one lock, taken before the registry's, so
/// an expectation registered concurrently with the arrival of its sidecar is
/// matched exactly once whichever lands first.
#[derive(Debug)]
pub struct Reconciler {
    registry: ExpectationRegistry,
    grace_period: Duration,
    state: Mutex<State>,
    /// Signalled whenever an expectation settles or the pipeline halts.
    progress: Condvar,
}

impl Reconciler {
    /// Create an engine that buffers unclaimed sidecars for `grace_period`.
    pub fn new(grace_period: Duration) -> Self {
        Self {
            registry: ExpectationRegistry::new(),
            grace_period,
            state: Mutex::new(State::default()),
            progress: Condvar::new(),
        }
    }

    /// The configured grace period.
    pub const fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Register an expectation, joining it with an already observed sidecar
    /// when one is buffered.
    ///
    /// Fails if the key is outstanding or was settled before.
    pub fn register(&self, expected: ExpectedSidecar) -> Result<Verdict, RegistryError> {
        let key = expected.key();
        let mut state = self.state.lock();
        if let Some(owner) = state.settled.get(&key) {
            return Err(RegistryError::DuplicateExpectation {
                key,
                existing: owner.clone(),
                rejected: expected.spec_name,
            });
        }

        if let Some(buffered) = state.buffered.remove(&key) {
            trace!(key = %key, "expectation joined buffered sidecar");
            let verdict = state.settle(expected, buffered.actual);
            drop(state);
            self.progress.notify_all();
            return Ok(verdict);
        }

        self.registry.register(expected)?;
        Ok(Verdict::Pending)
    }

    /// Classify a sidecar decoded from disk.
    pub fn observe(&self, actual: ActualSidecar, now: Instant) -> Verdict {
        let key = actual.key();
        let mut state = self.state.lock();
        if state.settled.contains_key(&key) || state.buffered.contains_key(&key) {
            state.duplicates += 1;
            warn!(key = %key, "duplicate sidecar");
            state.entries.push(ReportEntry::DuplicateActual { key, origin: actual.origin });
            return Verdict::Duplicate;
        }

        match self.registry.take_matching(&key) {
            Some(expected) => {
                let verdict = state.settle(expected, actual);
                drop(state);
                self.progress.notify_all();
                verdict
            }
            None => {
                debug!(key = %key, "buffering sidecar until its expectation arrives");
                state.buffered.insert(key, Buffered { actual, arrived: now });
                Verdict::Pending
            }
        }
    }

    /// Drop buffered sidecars older than the grace period; returns how many
    /// were dropped.
    pub fn expire(&self, now: Instant) -> usize {
        let mut state = self.state.lock();
        let grace_period = self.grace_period;
        let before = state.buffered.len();
        state.buffered.retain(|key, buffered| {
            let keep = now.saturating_duration_since(buffered.arrived) < grace_period;
            if !keep {
                debug!(key = %key, "dropping unclaimed sidecar");
            }
            keep
        });
        let dropped = before - state.buffered.len();
        state.orphaned += dropped as u64;
        dropped
    }

    /// Record a decode failure for `file`.
    pub fn report_decode_error(&self, file: PathBuf, error: impl fmt::Display) {
        let message = error.to_string();
        warn!(path = %file.display(), error = %message, "sidecar decode failed");
        let mut state = self.state.lock();
        state.decode_errors += 1;
        state.entries.push(ReportEntry::Decode { file, message });
    }

    /// Stop accepting progress: record `reason` and wake every waiter.
    ///
    /// Only the first reason is kept.
    pub fn halt(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let mut state = self.state.lock();
        if state.halted.is_some() {
            return;
        }
        error!(reason = %reason, "sidecar pipeline halted");
        state.entries.push(ReportEntry::Fatal(reason.clone()));
        state.halted = Some(reason);
        drop(state);
        self.progress.notify_all();
    }

    /// Mark the pipeline as stopped and wake every waiter.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if state.stopped {
            return;
        }
        state.stopped = true;
        drop(state);
        self.progress.notify_all();
    }

    /// The fatal error that halted the pipeline, if any.
    pub fn halt_reason(&self) -> Option<String> {
        self.state.lock().halted.clone()
    }

    /// Block until no expectation is outstanding, `deadline` passes, or the
    /// pipeline halts or stops.
    pub fn wait_until_drained(&self, deadline: Instant) -> DrainOutcome {
        let mut state = self.state.lock();
        loop {
            if self.registry.is_empty() {
                return DrainOutcome::Drained;
            }
            if let Some(outcome) = state.interrupted() {
                info!(%outcome, pending = self.registry.len(), "drain wait interrupted");
                return outcome;
            }
            if self.progress.wait_until(&mut state, deadline).timed_out() {
                let outcome = if self.registry.is_empty() {
                    DrainOutcome::Drained
                } else {
                    state.interrupted().unwrap_or(DrainOutcome::TimedOut)
                };
                info!(%outcome, pending = self.registry.len(), "drain wait finished");
                return outcome;
            }
        }
    }

    /// Expectations still waiting for a sidecar, ordered by key.
    pub fn pending(&self) -> Vec<ExpectedSidecar> {
        self.registry.snapshot_unmatched()
    }

    /// Every mismatch found so far.
    pub fn mismatches(&self) -> Vec<Mismatch> {
        self.state
            .lock()
            .entries
            .iter()
            .filter_map(|entry| match entry {
                ReportEntry::Mismatch(mismatch) => Some(mismatch.clone()),
                _ => None,
            })
            .collect()
    }

    /// Whether no mismatch was found.
    pub fn has_no_mismatches(&self) -> bool {
        self.state.lock().mismatched == 0
    }

    /// Whether no expectation is outstanding.
    pub fn has_no_pending(&self) -> bool {
        self.registry.is_empty()
    }

    /// Current counters.
    pub fn stats(&self) -> ReconcileStats {
        let state = self.state.lock();
        ReconcileStats {
            matched: state.matched,
            mismatched: state.mismatched,
            pending: self.registry.len() as u64,
            buffered: state.buffered.len() as u64,
            orphaned: state.orphaned,
            duplicates: state.duplicates,
            decode_errors: state.decode_errors,
        }
    }

    /// Snapshot of every problem, with the outstanding expectations.
    pub fn report(&self) -> ErrorReport {
        let state = self.state.lock();
        ErrorReport { entries: state.entries.clone(), pending: self.registry.snapshot_unmatched() }
    }
}
