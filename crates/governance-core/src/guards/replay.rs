// governance-core/src/guards/replay.rs
// ============================================================================
// Module: Replay Guard
// Description: At-most-once enforcement over action identifiers.
// Purpose: Third stage of the guard pipeline.
// Dependencies: crate::{guards, ontology}, std::collections::HashSet
// ============================================================================

use std::collections::HashSet;

use crate::guards::ErrorCode;
use crate::guards::GuardOutcome;
use crate::guards::GuardViolation;
use crate::ontology::ActionId;

/// Runs the Replay Guard: `actionId` must not already be in `seen`.
#[must_use]
pub fn check(action_id: &ActionId, seen: &HashSet<ActionId>) -> GuardOutcome {
    if seen.contains(action_id) {
        return Err(GuardViolation::new(ErrorCode::ReplayDetected, action_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_action_passes() {
        let seen = HashSet::new();
        assert!(check(&ActionId::new("a1"), &seen).is_ok());
    }

    #[test]
    fn seen_action_fails() {
        let mut seen = HashSet::new();
        seen.insert(ActionId::new("a1"));
        assert_eq!(check(&ActionId::new("a1"), &seen).unwrap_err().code, ErrorCode::ReplayDetected);
    }
}
