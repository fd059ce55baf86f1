//! Decode bounds.

use serde::{Deserialize, Serialize};
use sidecar_codec::DecodeLimits;
use sidecar_types::RecordCfg;

/// Upper bounds applied while decoding stream files.
///
/// Missing fields take the decoder's defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest envelope in bytes.
    pub max_frame_bytes: usize,
    /// Most call frames per sidecar.
    pub max_actions: usize,
    /// Most contracts per state-change sidecar.
    pub max_contracts: usize,
    /// Most slot changes per contract.
    pub max_slots: usize,
    /// Longest byte string.
    pub max_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        DecodeLimits::default().into()
    }
}

impl From<DecodeLimits> for LimitsConfig {
    fn from(limits: DecodeLimits) -> Self {
        Self {
            max_frame_bytes: limits.max_frame_bytes,
            max_actions: limits.record.max_actions,
            max_contracts: limits.record.max_contracts,
            max_slots: limits.record.max_slots,
            max_bytes: limits.record.max_bytes,
        }
    }
}

impl From<LimitsConfig> for DecodeLimits {
    fn from(limits: LimitsConfig) -> Self {
        Self {
            max_frame_bytes: limits.max_frame_bytes,
            record: RecordCfg {
                max_actions: limits.max_actions,
                max_contracts: limits.max_contracts,
                max_slots: limits.max_slots,
                max_bytes: limits.max_bytes,
            },
        }
    }
}
