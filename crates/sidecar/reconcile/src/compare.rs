//! Kind-specific payload comparison.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use alloy_primitives::{Address, Bytes, U256, hex};
use sidecar_types::{
    ContractAction, ContractActions, ContractBytecode, ContractStateChanges, SidecarPayload,
    StorageChange,
};

/// Longest byte string rendered in full.
const MAX_RENDERED_BYTES: usize = 32;

/// One place where an observed payload departs from the expected one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Difference {
    /// What differs, e.g. `frame[1].gas_used` or `contract 0x.. slot 0`.
    pub location: String,
    /// Rendered expected value.
    pub expected: String,
    /// Rendered observed value.
    pub actual: String,
}

impl Difference {
    fn new(location: impl Into<String>, expected: String, actual: String) -> Self {
        Self { location: location.into(), expected, actual }
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, actual {}", self.location, self.expected, self.actual)
    }
}

/// Compare two payloads; an empty result means they match.
pub fn compare_payloads(expected: &SidecarPayload, actual: &SidecarPayload) -> Vec<Difference> {
    match (expected, actual) {
        (SidecarPayload::Actions(expected), SidecarPayload::Actions(actual)) => {
            compare_actions(expected, actual)
        }
        (SidecarPayload::StateChanges(expected), SidecarPayload::StateChanges(actual)) => {
            compare_state_changes(expected, actual)
        }
        (SidecarPayload::Bytecode(expected), SidecarPayload::Bytecode(actual)) => {
            compare_bytecode(expected, actual)
        }
        _ => vec![Difference::new(
            "kind",
            expected.kind().to_string(),
            actual.kind().to_string(),
        )],
    }
}

fn compare_actions(expected: &ContractActions, actual: &ContractActions) -> Vec<Difference> {
    let mut diffs = Vec::new();
    for index in 0..expected.len().max(actual.len()) {
        match (expected.0.get(index), actual.0.get(index)) {
            (Some(expected), Some(actual)) => compare_frame(index, expected, actual, &mut diffs),
            (expected, actual) => diffs.push(Difference::new(
                format!("frame[{index}]"),
                describe_frame(expected),
                describe_frame(actual),
            )),
        }
    }
    diffs
}

fn compare_frame(
    index: usize,
    expected: &ContractAction,
    actual: &ContractAction,
    diffs: &mut Vec<Difference>,
) {
    let mut field = |name: &str, expected: String, actual: String| {
        if expected != actual {
            diffs.push(Difference::new(format!("frame[{index}].{name}"), expected, actual));
        }
    };
    field("call_type", format!("{:?}", expected.call_type), format!("{:?}", actual.call_type));
    field(
        "call_operation_type",
        format!("{:?}", expected.call_operation_type),
        format!("{:?}", actual.call_operation_type),
    );
    field("caller", format!("{:?}", expected.caller), format!("{:?}", actual.caller));
    field("recipient", format!("{:?}", expected.recipient), format!("{:?}", actual.recipient));
    field("gas", expected.gas.to_string(), actual.gas.to_string());
    field("gas_used", expected.gas_used.to_string(), actual.gas_used.to_string());
    field("value", expected.value.to_string(), actual.value.to_string());
    field("input", describe_bytes(&expected.input), describe_bytes(&actual.input));
    field("result", format!("{:?}", expected.result), format!("{:?}", actual.result));
    field("call_depth", expected.call_depth.to_string(), actual.call_depth.to_string());
}

fn describe_frame(frame: Option<&ContractAction>) -> String {
    match frame {
        Some(frame) => format!(
            "{:?}/{:?} at depth {}",
            frame.call_type, frame.call_operation_type, frame.call_depth
        ),
        None => "no frame".to_owned(),
    }
}

fn compare_state_changes(
    expected: &ContractStateChanges,
    actual: &ContractStateChanges,
) -> Vec<Difference> {
    let contracts: BTreeSet<&Address> = expected.0.keys().chain(actual.0.keys()).collect();
    let mut diffs = Vec::new();
    for contract in contracts {
        let expected = slots_by_index(expected.contract(contract).unwrap_or_default());
        let actual = slots_by_index(actual.contract(contract).unwrap_or_default());
        let slots: BTreeSet<&U256> = expected.keys().chain(actual.keys()).collect();
        for slot in slots {
            let (expected, actual) = (expected.get(slot), actual.get(slot));
            if expected != actual {
                diffs.push(Difference::new(
                    format!("contract {contract} slot {slot}"),
                    describe_slot(expected),
                    describe_slot(actual),
                ));
            }
        }
    }
    diffs
}

/// Group changes by slot, each group sorted so order does not matter.
fn slots_by_index(changes: &[StorageChange]) -> BTreeMap<U256, Vec<StorageChange>> {
    let mut slots: BTreeMap<U256, Vec<StorageChange>> = BTreeMap::new();
    for change in changes {
        slots.entry(change.slot).or_default().push(*change);
    }
    for group in slots.values_mut() {
        group.sort_unstable();
    }
    slots
}

fn describe_slot(changes: Option<&Vec<StorageChange>>) -> String {
    let Some(changes) = changes else {
        return "untouched".to_owned();
    };
    changes
        .iter()
        .map(|change| match change.value_written {
            Some(written) => format!("read {}, wrote {written}", change.value_read),
            None => format!("read {} without write", change.value_read),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn compare_bytecode(expected: &ContractBytecode, actual: &ContractBytecode) -> Vec<Difference> {
    let mut diffs = Vec::new();
    if expected.contract != actual.contract {
        diffs.push(Difference::new(
            "contract",
            expected.contract.to_string(),
            actual.contract.to_string(),
        ));
    }
    if !expected.is_minimal() && expected.effective_initcode() != actual.effective_initcode() {
        diffs.push(Difference::new(
            "initcode",
            describe_code(expected.effective_initcode()),
            describe_code(actual.effective_initcode()),
        ));
    }
    if expected.runtime_bytecode != actual.runtime_bytecode {
        diffs.push(Difference::new(
            "runtime_bytecode",
            describe_bytes(&expected.runtime_bytecode),
            describe_bytes(&actual.runtime_bytecode),
        ));
    }
    diffs
}

fn describe_code(code: Option<&Bytes>) -> String {
    code.map_or_else(|| "none".to_owned(), describe_bytes)
}

fn describe_bytes(bytes: &Bytes) -> String {
    if bytes.len() <= MAX_RENDERED_BYTES {
        return bytes.to_string();
    }
    format!("0x{}.. ({} bytes)", hex::encode(&bytes[..MAX_RENDERED_BYTES]), bytes.len())
}

#[cfg(test)]
mod tests {
    use sidecar_types::{CallRecipient, CallResult};

    use super::*;

    fn contract(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn identical_actions_match() {
        let frames = ContractActions(vec![
            ContractAction::call(contract(1), contract(2), 100_000),
            ContractAction { call_depth: 1, ..ContractAction::call(contract(2), contract(3), 50_000) },
        ]);
        let payload = SidecarPayload::from(frames);
        assert!(compare_payloads(&payload, &payload.clone()).is_empty());
    }

    #[test]
    fn action_fields_are_named() {
        let expected = ContractAction::call(contract(1), contract(2), 100_000);
        let actual = ContractAction {
            gas_used: 42,
            recipient: Some(CallRecipient::TargetedAddress(contract(2))),
            result: Some(CallResult::RevertReason(Bytes::from_static(b"nope"))),
            ..expected.clone()
        };
        let diffs = compare_payloads(
            &ContractActions(vec![expected]).into(),
            &ContractActions(vec![actual]).into(),
        );
        let locations: Vec<_> = diffs.iter().map(|d| d.location.as_str()).collect();
        assert_eq!(locations, ["frame[0].recipient", "frame[0].gas_used", "frame[0].result"]);
    }

    #[test]
    fn missing_frame_is_reported() {
        let frame = ContractAction::call(contract(1), contract(2), 100_000);
        let diffs = compare_payloads(
            &ContractActions(vec![frame.clone(), frame.clone()]).into(),
            &ContractActions(vec![frame]).into(),
        );
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].location, "frame[1]");
        assert_eq!(diffs[0].actual, "no frame");
    }

    #[test]
    fn state_changes_ignore_order() {
        let slot = |i: u64| U256::from(i);
        let expected = ContractStateChanges::new()
            .with_change(contract(1), StorageChange::written(slot(0), slot(1), slot(2)))
            .with_change(contract(1), StorageChange::read_only(slot(1), slot(9)))
            .with_change(contract(2), StorageChange::read_only(slot(0), slot(0)));
        let actual = ContractStateChanges::new()
            .with_change(contract(2), StorageChange::read_only(slot(0), slot(0)))
            .with_change(contract(1), StorageChange::read_only(slot(1), slot(9)))
            .with_change(contract(1), StorageChange::written(slot(0), slot(1), slot(2)));
        assert!(compare_payloads(&expected.into(), &actual.into()).is_empty());
    }

    #[test]
    fn state_change_diff_names_contract_and_slot() {
        let contract_x = contract(0xaa);
        let expected = ContractStateChanges::new().with_change(
            contract_x,
            StorageChange::written(U256::ZERO, U256::from(5), U256::from(7)),
        );
        let actual = ContractStateChanges::new().with_change(
            contract_x,
            StorageChange::written(U256::ZERO, U256::from(5), U256::from(5)),
        );

        let diffs = compare_payloads(&expected.into(), &actual.into());
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].location, format!("contract {contract_x} slot 0"));
        assert_eq!(diffs[0].expected, "read 5, wrote 7");
        assert_eq!(diffs[0].actual, "read 5, wrote 5");
    }

    #[test]
    fn elided_write_differs_from_write() {
        let expected = ContractStateChanges::new()
            .with_change(contract(1), StorageChange::read_only(U256::from(3), U256::from(4)));
        let actual = ContractStateChanges::new().with_change(
            contract(1),
            StorageChange::written(U256::from(3), U256::from(4), U256::from(4)),
        );
        let diffs = compare_payloads(&expected.into(), &actual.into());
        assert_eq!(diffs[0].expected, "read 4 without write");
    }

    #[test]
    fn untouched_contract_is_reported() {
        let expected = ContractStateChanges::new()
            .with_change(contract(1), StorageChange::read_only(U256::ZERO, U256::ZERO));
        let diffs = compare_payloads(&expected.into(), &ContractStateChanges::new().into());
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].actual, "untouched");
    }

    #[test]
    fn minimal_bytecode_ignores_initcode() {
        let runtime = Bytes::from_static(&[0x60, 0x80]);
        let expected = ContractBytecode::minimal(contract(1), runtime.clone());
        let actual = ContractBytecode::new(contract(1), Bytes::from_static(&[0xde, 0xad]), runtime);
        assert!(compare_payloads(&expected.into(), &actual.into()).is_empty());
    }

    #[test]
    fn empty_initcode_counts_as_absent() {
        let runtime = Bytes::from_static(&[0x60, 0x80]);
        let expected = ContractBytecode::new(contract(1), Bytes::new(), runtime.clone());
        let actual = ContractBytecode::minimal(contract(1), runtime.clone());
        assert!(compare_payloads(&expected.clone().into(), &actual.into()).is_empty());

        let actual = ContractBytecode::new(contract(1), Bytes::from_static(&[0x01]), runtime);
        let diffs = compare_payloads(&expected.into(), &actual.into());
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].location, "initcode");
        assert_eq!(diffs[0].expected, "none");
    }

    #[test]
    fn runtime_and_contract_are_exact() {
        let expected = ContractBytecode::minimal(contract(1), Bytes::from_static(&[0x60]));
        let actual = ContractBytecode::minimal(contract(2), Bytes::from(vec![0x61; 40]));
        let diffs = compare_payloads(&expected.into(), &actual.into());
        let locations: Vec<_> = diffs.iter().map(|d| d.location.as_str()).collect();
        assert_eq!(locations, ["contract", "runtime_bytecode"]);
        assert!(diffs[1].actual.ends_with("(40 bytes)"));
    }

    #[test]
    fn kind_disagreement_is_a_single_difference() {
        let diffs = compare_payloads(
            &ContractActions::default().into(),
            &ContractStateChanges::new().into(),
        );
        assert_eq!(diffs, [Difference::new("kind", "ACTIONS".into(), "STATE_CHANGES".into())]);
    }
}
