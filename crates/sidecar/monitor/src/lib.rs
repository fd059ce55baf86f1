#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod error;
pub use error::MonitorError;

mod monitor;
pub use monitor::{DirectoryMonitor, check_directory};

mod name;
pub use name::{FileNameError, SIDECAR_EXTENSION, SidecarFile, SidecarFileName};

mod strategy;
pub use strategy::{CompletionStrategy, FileProbe, Immediate, MarkerFile, StableSize};
