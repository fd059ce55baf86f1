//! End-to-end test suites.

use std::{
    thread,
    time::{Duration, Instant},
};

use alloy_primitives::Address;
use sidecar_config::CompletionConfig;
use sidecar_types::{ConsensusTimestamp, ContractAction, ContractActions};


/// Generous bound for waits that are expected to succeed.
const WAIT: Duration = Duration::from_secs(10);

fn marker() -> CompletionConfig {
    CompletionConfig::MarkerFile { suffix: ".done".to_owned() }
}

fn ts(seconds: u64) -> ConsensusTimestamp {
    ConsensusTimestamp::from_seconds(seconds)
}

fn transfer(gas: u64) -> ContractActions {
    ContractActions(vec![ContractAction::call(
        Address::repeat_byte(0x11),
        Address::repeat_byte(0x22),
        gas,
    )])
}

/// Poll `condition` until it holds or `timeout` passes.
fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
