//! End-to-end tests for the sidecar watcher.
//!
//! A [`NodeSimulator`] writes stream files the way a node does, while tests
//! play the driver: they register expectations on a running
//! [`sidecar_watcher::SidecarWatcher`] and assert on its verdicts.
//!
//! - Matching, mismatching and never-produced sidecars
//! - Sidecars arriving before their expectations
//! - Duplicate and concurrent registration
//! - Each completion protocol hiding partially written files
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p sidecar-e2e
//! ```

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod harness;
mod node;

pub use harness::{HARNESS_POLL_INTERVAL_MS, HarnessError, TestHarness, init_tracing};
pub use node::{DEFAULT_PREFIX, NodeSimulator, PendingFile, SimulatorError, WriteProtocol};

#[cfg(test)]
mod tests;
