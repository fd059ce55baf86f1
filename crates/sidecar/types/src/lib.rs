#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod action;
pub use action::{
    CallOperationType, CallParty, CallRecipient, CallResult, CallType, ContractAction,
    ContractActions,
};

mod bytecode;
pub use bytecode::ContractBytecode;

mod kind;
pub use kind::{SidecarKey, SidecarKind};

mod payload;
pub use payload::SidecarPayload;

mod record;
pub use record::{ActualSidecar, ExpectedSidecar, SidecarOrigin, SidecarRecord};

mod state;
pub use state::{ContractStateChanges, StorageChange};

mod timestamp;
pub use timestamp::{ConsensusTimestamp, InvalidTimestamp, NANOS_PER_SECOND};

mod wire;
pub use wire::RecordCfg;
