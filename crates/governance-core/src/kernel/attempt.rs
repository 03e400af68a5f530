// governance-core/src/kernel/attempt.rs
// ============================================================================
// Module: Attempt
// Description: The Kernel-internal wrapper over a submitted Action.
// Purpose: Tracks one Action's progress through the two-phase commit.
// Dependencies: crate::{ontology, primitives}
// ============================================================================

use crate::ontology::Action;
use crate::ontology::AttemptId;
use crate::ontology::EntityId;
use crate::ontology::ProtocolId;
use crate::primitives::LogicalTimestamp;

/// An Attempt's position in the two-phase commit.
///
/// # Invariants
/// - `Pending -> (Accepted|Rejected)`; `Accepted -> (Committed|Aborted)`.
/// - Terminal statuses (`Rejected`, `Committed`, `Aborted`) never transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    /// Submitted, not yet run through the Guard pipeline.
    Pending,
    /// The Guard pipeline passed; eligible for `commit`.
    Accepted,
    /// A Guard rejected the Attempt.
    Rejected,
    /// `commit` applied its mutations and appended `SUCCESS` evidence.
    Committed,
    /// `commit`'s dry-run validation rejected the Attempt after acceptance.
    Aborted,
}

impl AttemptStatus {
    /// Returns whether a transition from `self` to `next` is a legal single
    /// step.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted)
                | (Self::Pending, Self::Rejected)
                | (Self::Accepted, Self::Committed)
                | (Self::Accepted, Self::Aborted)
        )
    }
}

/// The Kernel's internal record of one Action's progress.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// Always the originating Action's id.
    pub id: AttemptId,
    /// The entity this Attempt is submitted on behalf of.
    pub actor: EntityId,
    /// An optional protocol whose side effects `commit` should consider.
    pub protocol_id: Option<ProtocolId>,
    /// The signed Action this Attempt wraps.
    pub intent: Action,
    /// The budget cost this Attempt will consume at `commit`.
    pub cost: u64,
    /// The Action's own timestamp, cached for convenience.
    pub timestamp: LogicalTimestamp,
    /// Current lifecycle position.
    pub status: AttemptStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_cannot_reach_committed_directly() {
        assert!(!AttemptStatus::Pending.can_transition_to(AttemptStatus::Committed));
        assert!(AttemptStatus::Pending.can_transition_to(AttemptStatus::Accepted));
    }

    #[test]
    fn terminal_statuses_do_not_transition() {
        assert!(!AttemptStatus::Committed.can_transition_to(AttemptStatus::Aborted));
        assert!(!AttemptStatus::Rejected.can_transition_to(AttemptStatus::Accepted));
    }
}
