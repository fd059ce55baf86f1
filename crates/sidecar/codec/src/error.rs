//! Decoding errors.

use std::{io, path::PathBuf};

use thiserror::Error;

/// A part of a stream file that could not be decoded.
///
/// Decode errors are reported and skipped; they never stop the watcher.
#[derive(Debug, Error)]
#[error("decode error at byte {offset}: {cause}")]
pub struct DecodeError {
    /// Byte offset of the frame (or header) that failed.
    pub offset: usize,
    /// What went wrong.
    pub cause: DecodeErrorCause,
}

impl DecodeError {
    /// Create a decode error at `offset`.
    pub const fn new(offset: usize, cause: DecodeErrorCause) -> Self {
        Self { offset, cause }
    }

    /// Whether the error ended decoding of the rest of the file.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self.cause, DecodeErrorCause::Envelope { .. } | DecodeErrorCause::Oversized { .. })
    }
}

/// Why a part of a stream file could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeErrorCause {
    /// The file does not start with the stream file magic.
    #[error("bad magic {found:02x?}")]
    BadMagic {
        /// The bytes found in place of the magic.
        found: Vec<u8>,
    },

    /// The file uses an unsupported format version.
    #[error("unsupported version {0}")]
    UnsupportedVersion(u32),

    /// The file ends inside a frame header or frame body.
    #[error("truncated frame: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes the frame claims.
        needed: usize,
        /// Bytes left in the file.
        remaining: usize,
    },

    /// A frame exceeds the configured size limit; it is skipped.
    #[error("frame of {len} bytes exceeds limit of {max}")]
    Oversized {
        /// Declared frame length.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The envelope inside a frame is malformed; it is skipped.
    #[error("envelope {index} is malformed: {source}")]
    Envelope {
        /// Position of the envelope within the file.
        index: usize,
        /// Codec failure.
        source: commonware_codec::Error,
    },
}

/// Failure to read or write a stream file as a whole.
#[derive(Debug, Error)]
pub enum StreamFileError {
    /// Filesystem access failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}
