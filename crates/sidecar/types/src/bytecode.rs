//! Contract bytecode payloads.

use alloy_primitives::{Address, Bytes};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error as CodecError, Read, Write};

use crate::wire::{
    ADDRESS_SIZE, RecordCfg, bytes_size, read_address, read_bytes, read_flag, write_address,
    write_bytes, write_flag,
};

/// Bytecode of a contract deployed by a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContractBytecode {
    /// Address of the deployed contract.
    pub contract: Address,
    /// Init code that produced the runtime bytecode. `None` for the
    /// minimal-fields variant used when the init code is not known
    /// independently of the deployment.
    pub initcode: Option<Bytes>,
    /// Deployed runtime bytecode.
    pub runtime_bytecode: Bytes,
}

impl ContractBytecode {
    /// Bytecode with both init code and runtime code.
    pub const fn new(contract: Address, initcode: Bytes, runtime_bytecode: Bytes) -> Self {
        Self { contract, initcode: Some(initcode), runtime_bytecode }
    }

    /// Bytecode carrying only the contract and its runtime code.
    pub const fn minimal(contract: Address, runtime_bytecode: Bytes) -> Self {
        Self { contract, initcode: None, runtime_bytecode }
    }

    /// Whether this is the minimal-fields variant.
    pub const fn is_minimal(&self) -> bool {
        self.initcode.is_none()
    }

    /// Init code, treating a zero-length value as absent.
    pub fn effective_initcode(&self) -> Option<&Bytes> {
        self.initcode.as_ref().filter(|code| !code.is_empty())
    }
}

impl Write for ContractBytecode {
    fn write(&self, buf: &mut impl BufMut) {
        write_address(&self.contract, buf);
        write_flag(self.initcode.is_some(), buf);
        if let Some(initcode) = &self.initcode {
            write_bytes(initcode, buf);
        }
        write_bytes(&self.runtime_bytecode, buf);
    }
}

impl EncodeSize for ContractBytecode {
    fn encode_size(&self) -> usize {
        ADDRESS_SIZE
            + 1
            + self.initcode.as_ref().map_or(0, |code| bytes_size(code))
            + bytes_size(&self.runtime_bytecode)
    }
}

impl Read for ContractBytecode {
    type Cfg = RecordCfg;

    fn read_cfg(buf: &mut impl Buf, cfg: &Self::Cfg) -> Result<Self, CodecError> {
        let contract = read_address(buf)?;
        let initcode = if read_flag(buf, "ContractBytecode.initcode")? {
            Some(read_bytes(buf, cfg.max_bytes, "ContractBytecode.initcode")?)
        } else {
            None
        };
        let runtime_bytecode = read_bytes(buf, cfg.max_bytes, "ContractBytecode.runtime")?;
        Ok(Self { contract, initcode, runtime_bytecode })
    }
}
