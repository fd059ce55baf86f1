//! Problems collected while reconciling.

use std::{fmt, path::PathBuf};

use sidecar_types::{ActualSidecar, ExpectedSidecar, SidecarKey, SidecarOrigin};

use crate::Difference;

/// An expectation whose observed sidecar differs from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    /// What the driver expected.
    pub expected: ExpectedSidecar,
    /// What the node wrote.
    pub actual: ActualSidecar,
    /// Every place the two payloads differ.
    pub differences: Vec<Difference>,
}

impl Mismatch {
    /// Join key shared by both sides.
    pub const fn key(&self) -> SidecarKey {
        self.expected.key()
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mismatched {} for `{}`", self.key(), self.expected.spec_name)?;
        if let Some(origin) = &self.actual.origin {
            write!(f, " in {}", OriginDisplay(origin))?;
        }
        for difference in &self.differences {
            write!(f, "\n  {difference}")?;
        }
        write!(f, "\n  expected: {:?}", self.expected.record.payload)?;
        write!(f, "\n  actual:   {:?}", self.actual.record.payload)
    }
}

/// A reportable problem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportEntry {
    /// A stream file or one of its envelopes could not be decoded.
    Decode {
        /// File being decoded.
        file: PathBuf,
        /// Rendered decode error.
        message: String,
    },
    /// An observed sidecar did not equal its expectation.
    Mismatch(Mismatch),
    /// A second sidecar arrived for a key that already had one.
    DuplicateActual {
        /// The contested key.
        key: SidecarKey,
        /// Where the duplicate came from.
        origin: Option<SidecarOrigin>,
    },
    /// The pipeline stopped on an unrecoverable error.
    Fatal(String),
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode { file, message } => {
                write!(f, "failed to decode {}: {message}", file.display())
            }
            Self::Mismatch(mismatch) => fmt::Display::fmt(mismatch, f),
            Self::DuplicateActual { key, origin } => {
                write!(f, "duplicate sidecar {key}")?;
                if let Some(origin) = origin {
                    write!(f, " in {}", OriginDisplay(origin))?;
                }
                Ok(())
            }
            Self::Fatal(reason) => write!(f, "sidecar pipeline halted: {reason}"),
        }
    }
}

struct OriginDisplay<'a>(&'a SidecarOrigin);

impl fmt::Display for OriginDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (envelope {})", self.0.file.display(), self.0.index)
    }
}

/// Everything that went wrong, plus the expectations still outstanding.
///
/// Renders as one problem per paragraph; an empty report renders as an
/// empty string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorReport {
    /// Problems in the order they were found.
    pub entries: Vec<ReportEntry>,
    /// Expectations no sidecar has arrived for, ordered by key.
    pub pending: Vec<ExpectedSidecar>,
}

impl ErrorReport {
    /// Whether there is nothing to report.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.pending.is_empty()
    }

    /// Number of reported problems, pending expectations included.
    pub fn len(&self) -> usize {
        self.entries.len() + self.pending.len()
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut separator = "";
        for entry in &self.entries {
            write!(f, "{separator}{entry}")?;
            separator = "\n";
        }
        for expected in &self.pending {
            write!(f, "{separator}pending {} for `{}`", expected.key(), expected.spec_name)?;
            separator = "\n";
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, U256};
    use sidecar_types::{
        ConsensusTimestamp, ContractActions, ContractStateChanges, SidecarKind, SidecarRecord,
        StorageChange,
    };

    use super::*;
    use crate::compare_payloads;

    #[test]
    fn empty_report_renders_nothing() {
        let report = ErrorReport::default();
        assert!(report.is_empty());
        assert_eq!(report.to_string(), "");
    }

    #[test]
    fn mismatch_shows_differences_and_both_payloads() {
        let ts = ConsensusTimestamp::from_seconds(200);
        let contract = Address::repeat_byte(0xaa);
        let expected = ExpectedSidecar::new(
            "storage",
            SidecarRecord::new(
                ts,
                ContractStateChanges::new().with_change(
                    contract,
                    StorageChange::written(U256::ZERO, U256::from(5), U256::from(7)),
                ),
            ),
        );
        let actual = ActualSidecar::new(SidecarRecord::new(
            ts,
            ContractStateChanges::new().with_change(
                contract,
                StorageChange::written(U256::ZERO, U256::from(5), U256::from(5)),
            ),
        ))
        .with_origin(PathBuf::from("/sidecars/a_01.rcd"), 2);
        let differences = compare_payloads(&expected.record.payload, &actual.record.payload);
        let entry = ReportEntry::Mismatch(Mismatch { expected, actual, differences });

        let rendered = entry.to_string();
        assert!(rendered.starts_with("mismatched STATE_CHANGES@200.000000000 for `storage`"));
        assert!(rendered.contains("/sidecars/a_01.rcd (envelope 2)"));
        assert!(rendered.contains(&format!("contract {contract} slot 0")));
        assert!(rendered.contains("expected: StateChanges"));
        assert!(rendered.contains("actual:   StateChanges"));
    }

    #[test]
    fn pending_expectations_follow_entries() {
        let ts = ConsensusTimestamp::from_seconds(300);
        let report = ErrorReport {
            entries: vec![ReportEntry::DuplicateActual {
                key: SidecarKey::new(ts, SidecarKind::Actions),
                origin: None,
            }],
            pending: vec![ExpectedSidecar::new(
                "deploy",
                SidecarRecord::new(ts, ContractActions::default()),
            )],
        };
        assert_eq!(report.len(), 2);
        assert_eq!(
            report.to_string(),
            "duplicate sidecar ACTIONS@300.000000000\npending ACTIONS@300.000000000 for `deploy`"
        );
    }
}
