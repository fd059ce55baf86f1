//! Storage slot transitions.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error as CodecError, Read, Write};

use crate::wire::{
    ADDRESS_SIZE, LEN_SIZE, RecordCfg, WORD_SIZE, read_address, read_flag, read_len, read_word,
    write_address, write_flag, write_len, write_word,
};

/// One storage slot touched by a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageChange {
    /// Slot index.
    pub slot: U256,
    /// Value of the slot before the transaction.
    pub value_read: U256,
    /// Value written by the transaction; `None` when the slot was only read.
    pub value_written: Option<U256>,
}

impl StorageChange {
    /// A slot that was read and then written.
    pub const fn written(slot: U256, before: U256, after: U256) -> Self {
        Self { slot, value_read: before, value_written: Some(after) }
    }

    /// A slot that was only read.
    pub const fn read_only(slot: U256, value: U256) -> Self {
        Self { slot, value_read: value, value_written: None }
    }

    /// Value of the slot after the transaction.
    pub fn value_after(&self) -> U256 {
        self.value_written.unwrap_or(self.value_read)
    }
}

/// Storage slot transitions grouped by contract.
///
/// Each contract's changes keep the order the node reported them in; the
/// reconciliation engine compares them as sets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ContractStateChanges(pub BTreeMap<Address, Vec<StorageChange>>);

impl ContractStateChanges {
    /// Create an empty set of changes.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Append a slot change for `contract`.
    pub fn push(&mut self, contract: Address, change: StorageChange) {
        self.0.entry(contract).or_default().push(change);
    }

    /// Builder-style variant of [`Self::push`].
    #[must_use]
    pub fn with_change(mut self, contract: Address, change: StorageChange) -> Self {
        self.push(contract, change);
        self
    }

    /// Changes recorded for `contract`.
    pub fn contract(&self, contract: &Address) -> Option<&[StorageChange]> {
        self.0.get(contract).map(Vec::as_slice)
    }

    /// Iterate contracts in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Vec<StorageChange>)> {
        self.0.iter()
    }

    /// Number of contracts with changes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no contract has changes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Write for StorageChange {
    fn write(&self, buf: &mut impl BufMut) {
        write_word(&self.slot, buf);
        write_word(&self.value_read, buf);
        write_flag(self.value_written.is_some(), buf);
        if let Some(value) = &self.value_written {
            write_word(value, buf);
        }
    }
}

impl EncodeSize for StorageChange {
    fn encode_size(&self) -> usize {
        WORD_SIZE * 2 + 1 + if self.value_written.is_some() { WORD_SIZE } else { 0 }
    }
}

impl Read for StorageChange {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        let slot = read_word(buf)?;
        let value_read = read_word(buf)?;
        let value_written =
            if read_flag(buf, "StorageChange.value_written")? { Some(read_word(buf)?) } else { None };
        Ok(Self { slot, value_read, value_written })
    }
}

impl Write for ContractStateChanges {
    fn write(&self, buf: &mut impl BufMut) {
        write_len(self.0.len(), buf);
        for (contract, changes) in &self.0 {
            write_address(contract, buf);
            write_len(changes.len(), buf);
            for change in changes {
                change.write(buf);
            }
        }
    }
}

impl EncodeSize for ContractStateChanges {
    fn encode_size(&self) -> usize {
        LEN_SIZE
            + self
                .0
                .values()
                .map(|changes| {
                    ADDRESS_SIZE
                        + LEN_SIZE
                        + changes.iter().map(EncodeSize::encode_size).sum::<usize>()
                })
                .sum::<usize>()
    }
}

impl Read for ContractStateChanges {
    type Cfg = RecordCfg;

    fn read_cfg(buf: &mut impl Buf, cfg: &Self::Cfg) -> Result<Self, CodecError> {
        let contracts = read_len(buf, cfg.max_contracts, "ContractStateChanges")?;
        let mut out = BTreeMap::new();
        for _ in 0..contracts {
            let contract = read_address(buf)?;
            let count = read_len(buf, cfg.max_slots, "ContractStateChanges.slots")?;
            let mut changes = Vec::with_capacity(count);
            for _ in 0..count {
                changes.push(StorageChange::read_cfg(buf, &())?);
            }
            if out.insert(contract, changes).is_some() {
                return Err(CodecError::Invalid("ContractStateChanges", "duplicate contract"));
            }
        }
        Ok(Self(out))
    }
}
