#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod compare;
pub use compare::{Difference, compare_payloads};

mod reconciler;
pub use reconciler::{DrainOutcome, ReconcileStats, Reconciler, Verdict};

mod report;
pub use report::{ErrorReport, Mismatch, ReportEntry};
