//! Sidecar kinds and the join key.

use std::fmt;

use crate::ConsensusTimestamp;

/// The shape of a sidecar payload.
///
/// A transaction produces at most one sidecar of each kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SidecarKind {
    /// Ordered call frames of the transaction.
    Actions,
    /// Storage slot transitions per contract.
    StateChanges,
    /// Bytecode of a deployed contract.
    Bytecode,
}

impl SidecarKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 3] = [Self::Actions, Self::StateChanges, Self::Bytecode];

    /// Upper-case label used in reports.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Actions => "ACTIONS",
            Self::StateChanges => "STATE_CHANGES",
            Self::Bytecode => "BYTECODE",
        }
    }
}

impl fmt::Display for SidecarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one sidecar: the transaction's timestamp and the payload kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SidecarKey {
    /// Consensus timestamp of the transaction.
    pub timestamp: ConsensusTimestamp,
    /// Kind of the payload.
    pub kind: SidecarKind,
}

impl SidecarKey {
    /// Create a key.
    pub const fn new(timestamp: ConsensusTimestamp, kind: SidecarKind) -> Self {
        Self { timestamp, kind }
    }
}

impl fmt::Display for SidecarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind, self.timestamp)
    }
}
