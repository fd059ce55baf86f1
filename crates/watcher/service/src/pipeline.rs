//! Background pipeline: monitor, decoder, reconciler.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use sidecar_codec::{DecodeLimits, read_stream_file};
use sidecar_monitor::{DirectoryMonitor, SidecarFile};
use sidecar_reconcile::Reconciler;
use tokio::{
    runtime,
    sync::{mpsc, watch},
    time::{self, MissedTickBehavior},
};
use tracing::{debug, error, trace};

use crate::WatcherError;

const THREAD_NAME: &str = "sidecar-watcher";

/// Knobs the pipeline needs from the watcher configuration.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PipelineSettings {
    pub(crate) poll_interval: Duration,
    pub(crate) channel_capacity: usize,
    pub(crate) limits: DecodeLimits,
}

/// Handle to the running pipeline thread.
#[derive(Debug)]
pub(crate) struct Pipeline {
    shutdown: watch::Sender<bool>,
    thread: JoinHandle<()>,
}

impl Pipeline {
    /// Start the pipeline on a dedicated thread.
    pub(crate) fn spawn(
        monitor: DirectoryMonitor,
        settings: PipelineSettings,
        reconciler: Arc<Reconciler>,
    ) -> Result<Self, WatcherError> {
        let runtime = runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(WatcherError::Runtime)?;
        let (shutdown, shutdown_rx) = watch::channel(false);
        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || runtime.block_on(run(monitor, settings, reconciler, shutdown_rx)))
            .map_err(WatcherError::Runtime)?;
        Ok(Self { shutdown, thread })
    }

    /// Signal shutdown and wait for the thread to exit.
    pub(crate) fn stop(self) {
        // The receiver is gone if the pipeline already exited.
        let _ = self.shutdown.send(true);
        if self.thread.join().is_err() {
            error!("sidecar pipeline thread panicked");
        }
    }
}

async fn run(
    monitor: DirectoryMonitor,
    settings: PipelineSettings,
    reconciler: Arc<Reconciler>,
    shutdown: watch::Receiver<bool>,
) {
    let (ready_tx, ready_rx) = mpsc::channel(settings.channel_capacity);
    let watching = monitor.run(settings.poll_interval, ready_tx, shutdown.clone());
    let consuming = consume(ready_rx, settings, &reconciler, shutdown);

    let (result, ()) = tokio::join!(watching, consuming);
    if let Err(err) = result {
        reconciler.halt(err.to_string());
    }
    debug!("sidecar pipeline finished");
}

/// Decode files as they arrive and sweep expired sidecars every poll
/// interval, whether or not files arrive.
///
/// Owns the receiver so a monitor blocked on a full channel is released once
/// this returns.
async fn consume(
    mut ready: mpsc::Receiver<SidecarFile>,
    settings: PipelineSettings,
    reconciler: &Reconciler,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut sweep = time::interval(settings.poll_interval);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);
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
            }
            _ = sweep.tick() => {
                let dropped = reconciler.expire(Instant::now());
                if dropped > 0 {
                    debug!(dropped, "expired unclaimed sidecars");
                }
            }
            file = ready.recv() => match file {
                Some(file) => process_file(&file, &settings.limits, reconciler),
                None => break,
            },
        }
    }
    trace!(queued = ready.len(), "sidecar consumer stopped");
}

/// Decode one completed file and hand its records to the reconciler.
pub(crate) fn process_file(file: &SidecarFile, limits: &DecodeLimits, reconciler: &Reconciler) {
    let decoded = match read_stream_file(&file.path, limits) {
        Ok(decoded) => decoded,
        Err(err) => {
            reconciler.report_decode_error(file.path.clone(), err);
            return;
        }
    };
    debug!(
        path = %file.path.display(),
        records = decoded.records.len(),
        errors = decoded.errors.len(),
        "decoded sidecar file"
    );

    for err in decoded.errors {
        reconciler.report_decode_error(file.path.clone(), err);
    }
    let now = Instant::now();
    for actual in decoded.records {
        let key = actual.key();
        let verdict = reconciler.observe(actual, now);
        trace!(key = %key, ?verdict, "observed sidecar");
    }
}
