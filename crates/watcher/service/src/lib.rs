#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod error;
pub use error::WatcherError;

mod lifecycle;
pub use lifecycle::WatcherState;

mod pipeline;

mod watcher;
pub use watcher::SidecarWatcher;

pub use sidecar_reconcile::{DrainOutcome, ErrorReport, Mismatch, ReconcileStats, Verdict};
