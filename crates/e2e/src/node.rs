//! Simulated node writing sidecar stream files.

use std::{
    ffi::OsString,
    fs::{self, OpenOptions},
    io::Write as _,
    path::{Path, PathBuf},
};

use sidecar_codec::{HEADER_SIZE, encode_stream_file};
use sidecar_config::CompletionConfig;
use sidecar_monitor::SidecarFileName;
use sidecar_types::{ConsensusTimestamp, SidecarRecord};
use thiserror::Error;
use tracing::debug;

/// Prefix of every file the simulator writes.
pub const DEFAULT_PREFIX: &str = "2024-05-01T10_00_00.000000000Z";

/// Suffix of in-progress files under [`WriteProtocol::Rename`].
const STAGING_SUFFIX: &str = ".tmp";

/// Error type for the simulator.
#[derive(Debug, Error)]
pub enum SimulatorError {
    /// Writing a file failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// File being written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// How the simulator signals that a file is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteProtocol {
    /// Write in place, then create `<file><suffix>`.
    Marker {
        /// Marker suffix.
        suffix: String,
    },
    /// Write in place and stop growing.
    StableGrowth,
    /// Write under a staging name, then rename into place.
    Rename,
}

impl WriteProtocol {
    /// The protocol a watcher with `completion` recognises.
    pub fn for_completion(completion: &CompletionConfig) -> Self {
        match completion {
            CompletionConfig::MarkerFile { suffix } => Self::Marker { suffix: suffix.clone() },
            CompletionConfig::StableSize { .. } => Self::StableGrowth,
            CompletionConfig::Immediate => Self::Rename,
        }
    }
}

/// Plays the node side of a test: hands out consensus timestamps and writes
/// stream files.
#[derive(Debug)]
pub struct NodeSimulator {
    dir: PathBuf,
    protocol: WriteProtocol,
    prefix: String,
    next_index: u32,
    clock: ConsensusTimestamp,
}

impl NodeSimulator {
    /// Create a simulator writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>, protocol: WriteProtocol) -> Self {
        Self {
            dir: dir.into(),
            protocol,
            prefix: DEFAULT_PREFIX.to_owned(),
            next_index: 1,
            clock: ConsensusTimestamp::from_seconds(1_700_000_000),
        }
    }

    /// Use `prefix` for subsequent file names.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// The directory files are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The write protocol in use.
    pub const fn protocol(&self) -> &WriteProtocol {
        &self.protocol
    }

    /// Consensus timestamp of the next transaction; every call returns a
    /// later one.
    pub fn next_timestamp(&mut self) -> ConsensusTimestamp {
        let timestamp = self.clock;
        self.clock = timestamp.successor();
        timestamp
    }

    /// Write `records` as one complete stream file.
    pub fn write_file(&mut self, records: &[SidecarRecord]) -> Result<PathBuf, SimulatorError> {
        self.begin_file(records)?.finish()
    }

    /// Start a stream file holding `records`, leaving it incomplete until
    /// [`PendingFile::finish`] is called.
    ///
    /// The partial file holds the header and about half of the encoded
    /// envelopes.
    pub fn begin_file(&mut self, records: &[SidecarRecord]) -> Result<PendingFile, SimulatorError> {
        let name = SidecarFileName::new(self.prefix.clone(), self.next_index);
        self.next_index += 1;
        let path = self.dir.join(name.to_string());
        let bytes = encode_stream_file(records);
        let split = HEADER_SIZE + (bytes.len() - HEADER_SIZE) / 2;

        let (write_path, completion) = match &self.protocol {
            WriteProtocol::Marker { suffix } => {
                (path.clone(), Completion::Marker(with_suffix(&path, suffix)))
            }
            WriteProtocol::StableGrowth => (path.clone(), Completion::None),
            WriteProtocol::Rename => {
                (with_suffix(&path, STAGING_SUFFIX), Completion::Rename(path.clone()))
            }
        };
        fs::write(&write_path, &bytes[..split]).map_err(io_error(&write_path))?;
        debug!(path = %write_path.display(), written = split, total = bytes.len(), "began stream file");

        Ok(PendingFile { path, write_path, remaining: bytes[split..].to_vec(), completion })
    }
}

#[derive(Debug)]
enum Completion {
    None,
    Marker(PathBuf),
    Rename(PathBuf),
}

/// A stream file that has been started but not completed.
#[derive(Debug)]
pub struct PendingFile {
    path: PathBuf,
    write_path: PathBuf,
    remaining: Vec<u8>,
    completion: Completion,
}

impl PendingFile {
    /// Final path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the rest of the file and signal completion.
    pub fn finish(self) -> Result<PathBuf, SimulatorError> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.write_path)
            .map_err(io_error(&self.write_path))?;
        file.write_all(&self.remaining).map_err(io_error(&self.write_path))?;
        file.sync_all().map_err(io_error(&self.write_path))?;
        drop(file);

        match self.completion {
            Completion::None => {}
            Completion::Marker(marker) => fs::write(&marker, b"").map_err(io_error(&marker))?,
            Completion::Rename(target) => {
                fs::rename(&self.write_path, &target).map_err(io_error(&target))?
            }
        }
        debug!(path = %self.path.display(), "finished stream file");
        Ok(self.path)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SimulatorError + '_ {
    move |source| SimulatorError::Io { path: path.to_path_buf(), source }
}
