//! Monitor errors.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Error type for directory monitoring.
///
/// Both variants are fatal: the monitor cannot make progress without its
/// directory.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The watched directory cannot be listed.
    #[error("sidecar directory {path} is unavailable: {source}")]
    DirectoryUnavailable {
        /// Watched directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The watched path exists but is not a directory.
    #[error("sidecar path {path} is not a directory")]
    NotADirectory {
        /// Watched path.
        path: PathBuf,
    },
}
