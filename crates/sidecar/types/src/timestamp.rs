//! Consensus timestamps.

use std::fmt;

/// Number of nanoseconds in one second.
pub const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// The instant a ledger assigned to a finalized transaction.
///
/// Timestamps are issued monotonically and uniquely identify one
/// transaction's outcome, which makes them the join key between expected and
/// observed sidecars.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsensusTimestamp {
    seconds: u64,
    nanos: u32,
}

impl ConsensusTimestamp {
    /// Create a timestamp, rejecting a nanosecond part of one second or more.
    pub const fn new(seconds: u64, nanos: u32) -> Result<Self, InvalidTimestamp> {
        if nanos >= NANOS_PER_SECOND {
            return Err(InvalidTimestamp { nanos });
        }
        Ok(Self { seconds, nanos })
    }

    /// Create a timestamp at a whole second.
    pub const fn from_seconds(seconds: u64) -> Self {
        Self { seconds, nanos: 0 }
    }

    /// Whole seconds since the epoch.
    pub const fn seconds(&self) -> u64 {
        self.seconds
    }

    /// Nanoseconds within the second.
    pub const fn nanos(&self) -> u32 {
        self.nanos
    }

    /// The timestamp one nanosecond later, saturating at the maximum.
    pub const fn successor(&self) -> Self {
        if self.nanos + 1 < NANOS_PER_SECOND {
            Self { seconds: self.seconds, nanos: self.nanos + 1 }
        } else if self.seconds < u64::MAX {
            Self { seconds: self.seconds + 1, nanos: 0 }
        } else {
            *self
        }
    }
}

impl fmt::Display for ConsensusTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

/// Error returned when a timestamp's nanosecond part is out of range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidTimestamp {
    /// The rejected nanosecond value.
    pub nanos: u32,
}

impl fmt::Display for InvalidTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timestamp nanos out of range: {}", self.nanos)
    }
}

impl std::error::Error for InvalidTimestamp {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nanos_overflow() {
        assert_eq!(
            ConsensusTimestamp::new(1, NANOS_PER_SECOND),
            Err(InvalidTimestamp { nanos: NANOS_PER_SECOND })
        );
        assert!(ConsensusTimestamp::new(1, NANOS_PER_SECOND - 1).is_ok());
    }

    #[test]
    fn orders_by_seconds_then_nanos() {
        let a = ConsensusTimestamp::new(10, 999).unwrap();
        let b = ConsensusTimestamp::new(11, 0).unwrap();
        let c = ConsensusTimestamp::new(11, 1).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn displays_padded_nanos() {
        let ts = ConsensusTimestamp::new(1_700_000_000, 42).unwrap();
        assert_eq!(ts.to_string(), "1700000000.000000042");
    }

    #[test]
    fn successor_carries_into_seconds() {
        let ts = ConsensusTimestamp::new(5, NANOS_PER_SECOND - 1).unwrap();
        assert_eq!(ts.successor(), ConsensusTimestamp::from_seconds(6));
        assert_eq!(ConsensusTimestamp::from_seconds(6).successor().nanos(), 1);
    }
}
