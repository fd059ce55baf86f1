//! Sidecar records and their expected/observed wrappers.

use std::path::PathBuf;

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error as CodecError, Read, ReadExt, Write};

use crate::{ConsensusTimestamp, SidecarKey, SidecarKind, SidecarPayload, wire::RecordCfg};

/// One sidecar: the transaction's consensus timestamp and its payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SidecarRecord {
    /// Consensus timestamp of the transaction.
    pub timestamp: ConsensusTimestamp,
    /// Kind-specific payload.
    pub payload: SidecarPayload,
}

impl SidecarRecord {
    /// Create a record.
    pub fn new(timestamp: ConsensusTimestamp, payload: impl Into<SidecarPayload>) -> Self {
        Self { timestamp, payload: payload.into() }
    }

    /// Kind of the payload.
    pub const fn kind(&self) -> SidecarKind {
        self.payload.kind()
    }

    /// Join key of this record.
    pub const fn key(&self) -> SidecarKey {
        SidecarKey::new(self.timestamp, self.kind())
    }
}

impl Write for SidecarRecord {
    fn write(&self, buf: &mut impl BufMut) {
        self.timestamp.seconds().write(buf);
        self.timestamp.nanos().write(buf);
        self.payload.write(buf);
    }
}

impl EncodeSize for SidecarRecord {
    fn encode_size(&self) -> usize {
        8 + 4 + self.payload.encode_size()
    }
}

impl Read for SidecarRecord {
    type Cfg = RecordCfg;

    fn read_cfg(buf: &mut impl Buf, cfg: &Self::Cfg) -> Result<Self, CodecError> {
        let seconds = u64::read(buf)?;
        let nanos = u32::read(buf)?;
        let timestamp = ConsensusTimestamp::new(seconds, nanos)
            .map_err(|_| CodecError::Invalid("SidecarRecord", "timestamp nanos out of range"))?;
        let payload = SidecarPayload::read_cfg(buf, cfg)?;
        Ok(Self { timestamp, payload })
    }
}

/// A sidecar the driver expects the node to write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectedSidecar {
    /// Name of the scenario that registered the expectation.
    pub spec_name: String,
    /// The expected record.
    pub record: SidecarRecord,
}

impl ExpectedSidecar {
    /// Create an expectation for `spec_name`.
    pub fn new(spec_name: impl Into<String>, record: SidecarRecord) -> Self {
        Self { spec_name: spec_name.into(), record }
    }

    /// Join key of the expected record.
    pub const fn key(&self) -> SidecarKey {
        self.record.key()
    }
}

/// Where an observed sidecar was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SidecarOrigin {
    /// The stream file.
    pub file: PathBuf,
    /// Position of the envelope within the file, counting from zero.
    pub index: usize,
}

/// A sidecar decoded from a stream file on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActualSidecar {
    /// The observed record.
    pub record: SidecarRecord,
    /// Where the record came from, when known.
    pub origin: Option<SidecarOrigin>,
}

impl ActualSidecar {
    /// Wrap a record with no known origin.
    pub const fn new(record: SidecarRecord) -> Self {
        Self { record, origin: None }
    }

    /// Attach the file and envelope index the record was decoded from.
    #[must_use]
    pub fn with_origin(mut self, file: PathBuf, index: usize) -> Self {
        self.origin = Some(SidecarOrigin { file, index });
        self
    }

    /// Join key of the observed record.
    pub const fn key(&self) -> SidecarKey {
        self.record.key()
    }
}
