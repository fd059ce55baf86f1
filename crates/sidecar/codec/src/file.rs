//! Stream file encoding and decoding.

use std::path::Path;

use bytes::{Buf, BufMut};
use commonware_codec::{Decode as _, Encode as _, EncodeSize as _};
use sidecar_types::{ActualSidecar, RecordCfg, SidecarRecord};
use tracing::{debug, trace};

use crate::{DecodeError, DecodeErrorCause, StreamFileError};

/// Magic bytes at the start of every stream file.
pub const MAGIC: [u8; 4] = *b"SCAR";

/// Stream file format version written by this crate.
pub const VERSION: u32 = 1;

/// Size of the file header (magic and version).
pub const HEADER_SIZE: usize = MAGIC.len() + 4;

/// Size of the length prefix in front of each envelope.
pub const FRAME_PREFIX_SIZE: usize = 4;

/// Bounds applied while decoding a stream file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Largest envelope accepted; larger frames are skipped.
    pub max_frame_bytes: usize,
    /// Bounds for the record inside each envelope.
    pub record: RecordCfg,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self { max_frame_bytes: 8 << 20, record: RecordCfg::default() }
    }
}

/// Result of decoding one stream file.
#[derive(Debug, Default)]
pub struct DecodedFile {
    /// Records decoded successfully, in file order.
    pub records: Vec<ActualSidecar>,
    /// Frames that could not be decoded, in file order.
    pub errors: Vec<DecodeError>,
}

impl DecodedFile {
    /// Whether every frame decoded cleanly.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Decode a complete stream file.
///
/// Each envelope is decoded independently: a malformed envelope is recorded
/// in [`DecodedFile::errors`] and decoding continues with the next frame. Only
/// a bad header or a frame running past the end of the file stops decoding,
/// since no later frame boundary can be trusted after that.
pub fn decode_stream_file(
    bytes: &[u8],
    origin: Option<&Path>,
    limits: &DecodeLimits,
) -> DecodedFile {
    let mut decoded = DecodedFile::default();
    if let Err(err) = check_header(bytes) {
        decoded.errors.push(err);
        return decoded;
    }

    let mut offset = HEADER_SIZE;
    let mut index = 0usize;
    while offset < bytes.len() {
        let remaining = bytes.len() - offset;
        if remaining < FRAME_PREFIX_SIZE {
            decoded.errors.push(DecodeError::new(
                offset,
                DecodeErrorCause::Truncated { needed: FRAME_PREFIX_SIZE, remaining },
            ));
            break;
        }
        let mut prefix = &bytes[offset..offset + FRAME_PREFIX_SIZE];
        let len = prefix.get_u32() as usize;
        let body_start = offset + FRAME_PREFIX_SIZE;
        let body_remaining = bytes.len() - body_start;
        if len > body_remaining {
            decoded.errors.push(DecodeError::new(
                offset,
                DecodeErrorCause::Truncated { needed: len, remaining: body_remaining },
            ));
            break;
        }
        let body_end = body_start + len;

        if len > limits.max_frame_bytes {
            decoded.errors.push(DecodeError::new(
                offset,
                DecodeErrorCause::Oversized { len, max: limits.max_frame_bytes },
            ));
        } else {
            match SidecarRecord::decode_cfg(&bytes[body_start..body_end], &limits.record) {
                Ok(record) => {
                    trace!(offset, index, key = %record.key(), "decoded sidecar envelope");
                    let actual = ActualSidecar::new(record);
                    decoded.records.push(match origin {
                        Some(path) => actual.with_origin(path.to_path_buf(), index),
                        None => actual,
                    });
                }
                Err(source) => {
                    debug!(offset, index, error = %source, "skipping malformed sidecar envelope");
                    decoded.errors.push(DecodeError::new(
                        offset,
                        DecodeErrorCause::Envelope { index, source },
                    ));
                }
            }
        }
        offset = body_end;
        index += 1;
    }
    decoded
}

fn check_header(bytes: &[u8]) -> Result<(), DecodeError> {
    let magic_len = bytes.len().min(MAGIC.len());
    if bytes[..magic_len] != MAGIC[..magic_len] || magic_len < MAGIC.len() {
        return Err(DecodeError::new(
            0,
            DecodeErrorCause::BadMagic { found: bytes[..magic_len].to_vec() },
        ));
    }
    if bytes.len() < HEADER_SIZE {
        return Err(DecodeError::new(
            MAGIC.len(),
            DecodeErrorCause::Truncated {
                needed: HEADER_SIZE - MAGIC.len(),
                remaining: bytes.len() - MAGIC.len(),
            },
        ));
    }
    let mut version = &bytes[MAGIC.len()..HEADER_SIZE];
    match version.get_u32() {
        VERSION => Ok(()),
        other => Err(DecodeError::new(MAGIC.len(), DecodeErrorCause::UnsupportedVersion(other))),
    }
}

/// Encode records into a stream file image.
pub fn encode_stream_file<'a>(records: impl IntoIterator<Item = &'a SidecarRecord>) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE);
    out.put_slice(&MAGIC);
    out.put_u32(VERSION);
    for record in records {
        out.put_u32(record.encode_size() as u32);
        out.put_slice(&record.encode());
    }
    out
}

/// Read and decode the stream file at `path`.
pub fn read_stream_file(path: &Path, limits: &DecodeLimits) -> Result<DecodedFile, StreamFileError> {
    let bytes = std::fs::read(path)
        .map_err(|source| StreamFileError::Io { path: path.to_path_buf(), source })?;
    Ok(decode_stream_file(&bytes, Some(path), limits))
}

/// Encode `records` and write them to `path` in one call.
pub fn write_stream_file<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a SidecarRecord>,
) -> Result<(), StreamFileError> {
    std::fs::write(path, encode_stream_file(records))
        .map_err(|source| StreamFileError::Io { path: path.to_path_buf(), source })
}
