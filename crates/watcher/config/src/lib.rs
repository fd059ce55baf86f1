#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod completion;
pub use completion::{CompletionConfig, DEFAULT_MARKER_SUFFIX, DEFAULT_QUIET_PERIOD_MS};

mod error;
pub use error::ConfigError;

mod limits;
pub use limits::LimitsConfig;

mod watcher;
pub use watcher::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_GRACE_PERIOD_SECS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_SIDECAR_DIR, WatcherConfig,
};
