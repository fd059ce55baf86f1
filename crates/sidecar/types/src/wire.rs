//! Wire helpers shared by the payload codecs.
//!
//! Integers are fixed-width big-endian. Byte strings and lists carry a `u32`
//! length prefix, options a `u8` presence flag.

use alloy_primitives::{Address, Bytes, U256};
use bytes::{Buf, BufMut};
use commonware_codec::{Error as CodecError, ReadExt, Write};

/// Bounds applied while decoding a single record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordCfg {
    /// Maximum number of call frames in an actions payload.
    pub max_actions: usize,
    /// Maximum number of contracts in a state-changes payload.
    pub max_contracts: usize,
    /// Maximum number of slot changes for one contract.
    pub max_slots: usize,
    /// Maximum length of any byte string (input, output, bytecode).
    pub max_bytes: usize,
}

impl Default for RecordCfg {
    fn default() -> Self {
        Self { max_actions: 4_096, max_contracts: 1_024, max_slots: 16_384, max_bytes: 1 << 20 }
    }
}

pub(crate) const ADDRESS_SIZE: usize = 20;
pub(crate) const WORD_SIZE: usize = 32;
pub(crate) const LEN_SIZE: usize = 4;

pub(crate) fn write_address(value: &Address, buf: &mut impl BufMut) {
    buf.put_slice(value.as_slice());
}

pub(crate) fn read_address(buf: &mut impl Buf) -> Result<Address, CodecError> {
    if buf.remaining() < ADDRESS_SIZE {
        return Err(CodecError::EndOfBuffer);
    }
    let mut out = [0u8; ADDRESS_SIZE];
    buf.copy_to_slice(&mut out);
    Ok(Address::from(out))
}

pub(crate) fn write_word(value: &U256, buf: &mut impl BufMut) {
    buf.put_slice(&value.to_be_bytes::<WORD_SIZE>());
}

pub(crate) fn read_word(buf: &mut impl Buf) -> Result<U256, CodecError> {
    if buf.remaining() < WORD_SIZE {
        return Err(CodecError::EndOfBuffer);
    }
    let mut out = [0u8; WORD_SIZE];
    buf.copy_to_slice(&mut out);
    Ok(U256::from_be_bytes(out))
}

pub(crate) fn write_len(len: usize, buf: &mut impl BufMut) {
    (len as u32).write(buf);
}

/// Read a `u32` length prefix and check it against `max`.
pub(crate) fn read_len(
    buf: &mut impl Buf,
    max: usize,
    context: &'static str,
) -> Result<usize, CodecError> {
    let len = u32::read(buf)? as usize;
    if len > max {
        return Err(CodecError::Invalid(context, "length exceeds limit"));
    }
    Ok(len)
}

pub(crate) fn write_bytes(value: &[u8], buf: &mut impl BufMut) {
    write_len(value.len(), buf);
    buf.put_slice(value);
}

pub(crate) fn read_bytes(
    buf: &mut impl Buf,
    max: usize,
    context: &'static str,
) -> Result<Bytes, CodecError> {
    let len = read_len(buf, max, context)?;
    if buf.remaining() < len {
        return Err(CodecError::EndOfBuffer);
    }
    Ok(buf.copy_to_bytes(len).into())
}

pub(crate) const fn bytes_size(value: &[u8]) -> usize {
    LEN_SIZE + value.len()
}

pub(crate) fn read_flag(buf: &mut impl Buf, context: &'static str) -> Result<bool, CodecError> {
    match u8::read(buf)? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(CodecError::Invalid(context, "invalid presence flag")),
    }
}

pub(crate) fn write_flag(present: bool, buf: &mut impl BufMut) {
    u8::from(present).write(buf);
}
