//! Call-frame payloads.

use alloy_primitives::{Address, Bytes, U256};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error as CodecError, Read, ReadExt, Write};

use crate::wire::{
    ADDRESS_SIZE, LEN_SIZE, RecordCfg, WORD_SIZE, bytes_size, read_address, read_bytes, read_flag,
    read_len, read_word, write_address, write_bytes, write_flag, write_len, write_word,
};

/// What kind of invocation a call frame is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallType {
    /// No action was taken (placeholder frame).
    NoAction,
    /// A message call.
    Call,
    /// A contract creation.
    Create,
    /// A call into a precompiled contract.
    Precompile,
    /// A call into a system contract.
    System,
}

/// The EVM opcode that produced a call frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOperationType {
    /// Opcode was not recorded.
    Unknown,
    /// `CALL`
    Call,
    /// `CALLCODE`
    CallCode,
    /// `DELEGATECALL`
    DelegateCall,
    /// `STATICCALL`
    StaticCall,
    /// `CREATE`
    Create,
    /// `CREATE2`
    Create2,
}

/// The entity that initiated a call frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallParty {
    /// An externally owned account.
    Account(Address),
    /// A contract.
    Contract(Address),
}

/// The target of a call frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallRecipient {
    /// An externally owned account.
    Account(Address),
    /// A contract.
    Contract(Address),
    /// An address with no materialized entity behind it, such as a lazily
    /// created account.
    TargetedAddress(Address),
}

/// How a call frame ended.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CallResult {
    /// Successful return data.
    Output(Bytes),
    /// Revert reason returned by the callee.
    RevertReason(Bytes),
    /// Halt reason for an exceptional failure.
    Error(Bytes),
}

/// One call, create, or precompile invocation within a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContractAction {
    /// Kind of invocation.
    pub call_type: CallType,
    /// Opcode behind the invocation.
    pub call_operation_type: CallOperationType,
    /// Initiator of the frame.
    pub caller: Option<CallParty>,
    /// Target of the frame.
    pub recipient: Option<CallRecipient>,
    /// Gas made available to the frame.
    pub gas: u64,
    /// Gas consumed by the frame.
    pub gas_used: u64,
    /// Value transferred with the frame.
    pub value: U256,
    /// Call data or init code.
    pub input: Bytes,
    /// Outcome of the frame.
    pub result: Option<CallResult>,
    /// Nesting depth, zero for the top-level frame.
    pub call_depth: u32,
}

impl ContractAction {
    /// A top-level call from `caller` to `contract` with no value and empty
    /// input; tests and scenario builders refine it with struct update syntax.
    pub fn call(caller: Address, contract: Address, gas: u64) -> Self {
        Self {
            call_type: CallType::Call,
            call_operation_type: CallOperationType::Call,
            caller: Some(CallParty::Account(caller)),
            recipient: Some(CallRecipient::Contract(contract)),
            gas,
            gas_used: 0,
            value: U256::ZERO,
            input: Bytes::new(),
            result: Some(CallResult::Output(Bytes::new())),
            call_depth: 0,
        }
    }
}

/// Ordered call frames of one transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ContractActions(pub Vec<ContractAction>);

impl ContractActions {
    /// Number of frames.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no frames.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the frames in order.
    pub fn iter(&self) -> impl Iterator<Item = &ContractAction> {
        self.0.iter()
    }
}

impl From<Vec<ContractAction>> for ContractActions {
    fn from(actions: Vec<ContractAction>) -> Self {
        Self(actions)
    }
}

impl CallType {
    const fn tag(&self) -> u8 {
        match self {
            Self::NoAction => 0,
            Self::Call => 1,
            Self::Create => 2,
            Self::Precompile => 3,
            Self::System => 4,
        }
    }

    const fn from_tag(tag: u8) -> Result<Self, CodecError> {
        match tag {
            0 => Ok(Self::NoAction),
            1 => Ok(Self::Call),
            2 => Ok(Self::Create),
            3 => Ok(Self::Precompile),
            4 => Ok(Self::System),
            _ => Err(CodecError::Invalid("CallType", "unknown tag")),
        }
    }
}

impl CallOperationType {
    const fn tag(&self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Call => 1,
            Self::CallCode => 2,
            Self::DelegateCall => 3,
            Self::StaticCall => 4,
            Self::Create => 5,
            Self::Create2 => 6,
        }
    }

    const fn from_tag(tag: u8) -> Result<Self, CodecError> {
        match tag {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Call),
            2 => Ok(Self::CallCode),
            3 => Ok(Self::DelegateCall),
            4 => Ok(Self::StaticCall),
            5 => Ok(Self::Create),
            6 => Ok(Self::Create2),
            _ => Err(CodecError::Invalid("CallOperationType", "unknown tag")),
        }
    }
}

const PARTY_ACCOUNT: u8 = 0;
const PARTY_CONTRACT: u8 = 1;
const PARTY_TARGETED: u8 = 2;

const RESULT_OUTPUT: u8 = 0;
const RESULT_REVERT: u8 = 1;
const RESULT_ERROR: u8 = 2;

fn write_caller(caller: &Option<CallParty>, buf: &mut impl BufMut) {
    write_flag(caller.is_some(), buf);
    match caller {
        Some(CallParty::Account(address)) => {
            PARTY_ACCOUNT.write(buf);
            write_address(address, buf);
        }
        Some(CallParty::Contract(address)) => {
            PARTY_CONTRACT.write(buf);
            write_address(address, buf);
        }
        None => {}
    }
}

fn read_caller(buf: &mut impl Buf) -> Result<Option<CallParty>, CodecError> {
    if !read_flag(buf, "ContractAction.caller")? {
        return Ok(None);
    }
    match u8::read(buf)? {
        PARTY_ACCOUNT => Ok(Some(CallParty::Account(read_address(buf)?))),
        PARTY_CONTRACT => Ok(Some(CallParty::Contract(read_address(buf)?))),
        _ => Err(CodecError::Invalid("ContractAction.caller", "unknown party")),
    }
}

fn write_recipient(recipient: &Option<CallRecipient>, buf: &mut impl BufMut) {
    write_flag(recipient.is_some(), buf);
    let (tag, address) = match recipient {
        Some(CallRecipient::Account(address)) => (PARTY_ACCOUNT, address),
        Some(CallRecipient::Contract(address)) => (PARTY_CONTRACT, address),
        Some(CallRecipient::TargetedAddress(address)) => (PARTY_TARGETED, address),
        None => return,
    };
    tag.write(buf);
    write_address(address, buf);
}

fn read_recipient(buf: &mut impl Buf) -> Result<Option<CallRecipient>, CodecError> {
    if !read_flag(buf, "ContractAction.recipient")? {
        return Ok(None);
    }
    let tag = u8::read(buf)?;
    let address = read_address(buf)?;
    match tag {
        PARTY_ACCOUNT => Ok(Some(CallRecipient::Account(address))),
        PARTY_CONTRACT => Ok(Some(CallRecipient::Contract(address))),
        PARTY_TARGETED => Ok(Some(CallRecipient::TargetedAddress(address))),
        _ => Err(CodecError::Invalid("ContractAction.recipient", "unknown party")),
    }
}

fn write_result(result: &Option<CallResult>, buf: &mut impl BufMut) {
    write_flag(result.is_some(), buf);
    let (tag, data) = match result {
        Some(CallResult::Output(data)) => (RESULT_OUTPUT, data),
        Some(CallResult::RevertReason(data)) => (RESULT_REVERT, data),
        Some(CallResult::Error(data)) => (RESULT_ERROR, data),
        None => return,
    };
    tag.write(buf);
    write_bytes(data, buf);
}

fn read_result(buf: &mut impl Buf, cfg: &RecordCfg) -> Result<Option<CallResult>, CodecError> {
    if !read_flag(buf, "ContractAction.result")? {
        return Ok(None);
    }
    let tag = u8::read(buf)?;
    let data = read_bytes(buf, cfg.max_bytes, "ContractAction.result")?;
    match tag {
        RESULT_OUTPUT => Ok(Some(CallResult::Output(data))),
        RESULT_REVERT => Ok(Some(CallResult::RevertReason(data))),
        RESULT_ERROR => Ok(Some(CallResult::Error(data))),
        _ => Err(CodecError::Invalid("ContractAction.result", "unknown result")),
    }
}

impl Write for ContractAction {
    fn write(&self, buf: &mut impl BufMut) {
        self.call_type.tag().write(buf);
        self.call_operation_type.tag().write(buf);
        write_caller(&self.caller, buf);
        write_recipient(&self.recipient, buf);
        self.gas.write(buf);
        self.gas_used.write(buf);
        write_word(&self.value, buf);
        write_bytes(&self.input, buf);
        write_result(&self.result, buf);
        self.call_depth.write(buf);
    }
}

impl EncodeSize for ContractAction {
    fn encode_size(&self) -> usize {
        let party = 1 + 1 + ADDRESS_SIZE;
        let caller = if self.caller.is_some() { party } else { 1 };
        let recipient = if self.recipient.is_some() { party } else { 1 };
        let result = match &self.result {
            Some(
                CallResult::Output(data) | CallResult::RevertReason(data) | CallResult::Error(data),
            ) => 1 + 1 + bytes_size(data),
            None => 1,
        };
        1 + 1 + caller + recipient + 8 + 8 + WORD_SIZE + bytes_size(&self.input) + result + 4
    }
}

impl Read for ContractAction {
    type Cfg = RecordCfg;

    fn read_cfg(buf: &mut impl Buf, cfg: &Self::Cfg) -> Result<Self, CodecError> {
        let call_type = CallType::from_tag(u8::read(buf)?)?;
        let call_operation_type = CallOperationType::from_tag(u8::read(buf)?)?;
        let caller = read_caller(buf)?;
        let recipient = read_recipient(buf)?;
        let gas = u64::read(buf)?;
        let gas_used = u64::read(buf)?;
        let value = read_word(buf)?;
        let input = read_bytes(buf, cfg.max_bytes, "ContractAction.input")?;
        let result = read_result(buf, cfg)?;
        let call_depth = u32::read(buf)?;
        Ok(Self {
            call_type,
            call_operation_type,
            caller,
            recipient,
            gas,
            gas_used,
            value,
            input,
            result,
            call_depth,
        })
    }
}

impl Write for ContractActions {
    fn write(&self, buf: &mut impl BufMut) {
        write_len(self.0.len(), buf);
        for action in &self.0 {
            action.write(buf);
        }
    }
}

impl EncodeSize for ContractActions {
    fn encode_size(&self) -> usize {
        LEN_SIZE + self.0.iter().map(EncodeSize::encode_size).sum::<usize>()
    }
}

impl Read for ContractActions {
    type Cfg = RecordCfg;

    fn read_cfg(buf: &mut impl Buf, cfg: &Self::Cfg) -> Result<Self, CodecError> {
        let count = read_len(buf, cfg.max_actions, "ContractActions")?;
        let mut actions = Vec::with_capacity(count);
        for _ in 0..count {
            actions.push(ContractAction::read_cfg(buf, cfg)?);
        }
        Ok(Self(actions))
    }
}

#[cfg(test)]
mod tests {
    use commonware_codec::{Decode as _, Encode as _};

    use super::*;

    fn nested_frames() -> ContractActions {
        let caller = Address::repeat_byte(0x11);
        let contract = Address::repeat_byte(0x22);
        ContractActions(vec![
            ContractAction {
                value: U256::from(5u64),
                input: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
                ..ContractAction::call(caller, contract, 100_000)
            },
            ContractAction {
                call_type: CallType::Precompile,
                call_operation_type: CallOperationType::StaticCall,
                caller: Some(CallParty::Contract(contract)),
                recipient: Some(CallRecipient::TargetedAddress(Address::with_last_byte(4))),
                gas: 3_000,
                gas_used: 15,
                value: U256::ZERO,
                input: Bytes::new(),
                result: Some(CallResult::RevertReason(Bytes::from_static(b"nope"))),
                call_depth: 1,
            },
            ContractAction {
                caller: None,
                recipient: None,
                result: None,
                ..ContractAction::call(caller, contract, 1)
            },
        ])
    }

    #[test]
    fn encode_size_matches_encoding() {
        let actions = nested_frames();
        assert_eq!(actions.encode().len(), actions.encode_size());
        for action in actions.iter() {
            assert_eq!(action.encode().len(), action.encode_size());
        }
    }

    #[test]
    fn decodes_nested_frames() {
        let actions = nested_frames();
        let decoded = ContractActions::decode_cfg(actions.encode(), &RecordCfg::default())
            .expect("decode actions");
        assert_eq!(decoded, actions);
    }

    #[test]
    fn rejects_unknown_call_type() {
        let mut encoded = nested_frames().encode().to_vec();
        // First byte after the frame count is the call type of frame zero.
        encoded[LEN_SIZE] = 9;
        let err = ContractActions::decode_cfg(&encoded[..], &RecordCfg::default());
        assert!(err.is_err());
    }

    #[test]
    fn rejects_frame_count_over_limit() {
        let actions = nested_frames();
        let cfg = RecordCfg { max_actions: 2, ..Default::default() };
        assert!(ContractActions::decode_cfg(actions.encode(), &cfg).is_err());
    }
}
