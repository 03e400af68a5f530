// governance-core/src/primitives/time.rs
// ============================================================================
// Module: Logical Clock
// Description: Monotonic (physical, logical) timestamp pairs.
// Purpose: Give every hashed/signed record a deterministic, replayable time
//          value without reading the wall clock inside the core.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The kernel never reads wall-clock time itself. Callers supply a
//! [`LogicalTimestamp`] with every Action; the `physical` coordinate may be
//! derived from wall-clock time by the embedder, but must be monotonized
//! before use. The `logical` coordinate breaks ties
//! when `physical` repeats, giving total order even under a stalled clock.

use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// A monotonic `(physical, logical)` pair, totally ordered lexicographically.
///
/// # Invariants
/// - Strictly increases per kernel instance across accepted Actions
///   (enforced by the Time Guard, not by this type itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogicalTimestamp {
    physical: u64,
    logical: u64,
}

impl LogicalTimestamp {
    /// The zero timestamp, used for genesis records.
    pub const ZERO: Self = Self { physical: 0, logical: 0 };

    /// Constructs a timestamp from explicit coordinates.
    #[must_use]
    pub const fn new(physical: u64, logical: u64) -> Self {
        Self { physical, logical }
    }

    /// Returns the physical coordinate.
    #[must_use]
    pub const fn physical(self) -> u64 {
        self.physical
    }

    /// Returns the logical coordinate.
    #[must_use]
    pub const fn logical(self) -> u64 {
        self.logical
    }

    /// Produces the next timestamp for a caller-supplied physical coordinate.
    ///
    /// If `physical` has advanced, `logical` resets to zero. If `physical`
    /// is unchanged (or has gone backwards, which a monotonizing embedder
    /// must prevent upstream), `logical` increments, guaranteeing the result
    /// is strictly greater than `self`.
    #[must_use]
    pub const fn tick(self, physical: u64) -> Self {
        if physical > self.physical {
            Self { physical, logical: 0 }
        } else {
            Self { physical: self.physical, logical: self.logical + 1 }
        }
    }
}

impl fmt::Display for LogicalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.physical, self.logical)
    }
}

/// Error returned when parsing a `"physical:logical"` wire string fails.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("malformed logical timestamp: {0}")]
pub struct ParseTimestampError(String);

impl std::str::FromStr for LogicalTimestamp {
    type Err = ParseTimestampError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "0" {
            return Ok(Self::ZERO);
        }
        let (physical, logical) = value
            .split_once(':')
            .ok_or_else(|| ParseTimestampError(value.to_string()))?;
        let physical: u64 = physical
            .parse()
            .map_err(|_| ParseTimestampError(value.to_string()))?;
        let logical: u64 = logical
            .parse()
            .map_err(|_| ParseTimestampError(value.to_string()))?;
        Ok(Self { physical, logical })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_lexicographic() {
        assert!(LogicalTimestamp::new(1, 5) < LogicalTimestamp::new(2, 0));
        assert!(LogicalTimestamp::new(2, 0) < LogicalTimestamp::new(2, 1));
    }

    #[test]
    fn tick_always_advances() {
        let t = LogicalTimestamp::new(5, 3);
        assert!(t.tick(5) > t);
        assert!(t.tick(4) > t);
        assert!(t.tick(6) > t);
    }

    #[test]
    fn wire_round_trip() {
        let t = LogicalTimestamp::new(42, 7);
        let wire = t.to_string();
        assert_eq!(wire, "42:7");
        assert_eq!(wire.parse::<LogicalTimestamp>().unwrap(), t);
        assert_eq!("0".parse::<LogicalTimestamp>().unwrap(), LogicalTimestamp::ZERO);
    }
}
