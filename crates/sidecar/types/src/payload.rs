//! Kind-specific sidecar payloads.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error as CodecError, Read, ReadExt, Write};

use crate::{ContractActions, ContractBytecode, ContractStateChanges, SidecarKind, wire::RecordCfg};

const TAG_ACTIONS: u8 = 0;
const TAG_STATE_CHANGES: u8 = 1;
const TAG_BYTECODE: u8 = 2;

/// The populated payload of a sidecar.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SidecarPayload {
    /// Call frames.
    Actions(ContractActions),
    /// Storage slot transitions.
    StateChanges(ContractStateChanges),
    /// Deployed bytecode.
    Bytecode(ContractBytecode),
}

impl SidecarPayload {
    /// Kind of this payload.
    pub const fn kind(&self) -> SidecarKind {
        match self {
            Self::Actions(_) => SidecarKind::Actions,
            Self::StateChanges(_) => SidecarKind::StateChanges,
            Self::Bytecode(_) => SidecarKind::Bytecode,
        }
    }

    const fn tag(&self) -> u8 {
        match self {
            Self::Actions(_) => TAG_ACTIONS,
            Self::StateChanges(_) => TAG_STATE_CHANGES,
            Self::Bytecode(_) => TAG_BYTECODE,
        }
    }
}

impl From<ContractActions> for SidecarPayload {
    fn from(actions: ContractActions) -> Self {
        Self::Actions(actions)
    }
}

impl From<ContractStateChanges> for SidecarPayload {
    fn from(changes: ContractStateChanges) -> Self {
        Self::StateChanges(changes)
    }
}

impl From<ContractBytecode> for SidecarPayload {
    fn from(bytecode: ContractBytecode) -> Self {
        Self::Bytecode(bytecode)
    }
}

impl Write for SidecarPayload {
    fn write(&self, buf: &mut impl BufMut) {
        self.tag().write(buf);
        match self {
            Self::Actions(actions) => actions.write(buf),
            Self::StateChanges(changes) => changes.write(buf),
            Self::Bytecode(bytecode) => bytecode.write(buf),
        }
    }
}

impl EncodeSize for SidecarPayload {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Actions(actions) => actions.encode_size(),
            Self::StateChanges(changes) => changes.encode_size(),
            Self::Bytecode(bytecode) => bytecode.encode_size(),
        }
    }
}

impl Read for SidecarPayload {
    type Cfg = RecordCfg;

    fn read_cfg(buf: &mut impl Buf, cfg: &Self::Cfg) -> Result<Self, CodecError> {
        match u8::read(buf)? {
            TAG_ACTIONS => Ok(Self::Actions(ContractActions::read_cfg(buf, cfg)?)),
            TAG_STATE_CHANGES => Ok(Self::StateChanges(ContractStateChanges::read_cfg(buf, cfg)?)),
            TAG_BYTECODE => Ok(Self::Bytecode(ContractBytecode::read_cfg(buf, cfg)?)),
            _ => Err(CodecError::Invalid("SidecarPayload", "unknown payload tag")),
        }
    }
}
