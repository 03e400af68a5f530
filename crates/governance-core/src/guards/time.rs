// governance-core/src/guards/time.rs
// ============================================================================
// Module: Time Guard
// Description: Monotonicity enforcement over action timestamps.
// Purpose: Fourth stage of the guard pipeline.
// Dependencies: crate::{guards, primitives}
// ============================================================================

use crate::guards::ErrorCode;
use crate::guards::GuardOutcome;
use crate::guards::GuardViolation;
use crate::ontology::Action;
use crate::primitives::LogicalTimestamp;

/// Runs the Time Guard: `action.timestamp` must be `>= last_seen`, and
/// `action` must not have expired as of `now`.
#[must_use]
pub fn check(action: &Action, last_seen: LogicalTimestamp, now: LogicalTimestamp) -> GuardOutcome {
    if action.timestamp < last_seen {
        return Err(GuardViolation::new(
            ErrorCode::TemporalParadox,
            format!("action timestamp {} precedes last-seen {last_seen}", action.timestamp),
        ));
    }
    if action.is_expired(now) {
        return Err(GuardViolation::new(
            ErrorCode::ActionExpired,
            format!("action expired at {} as of {now}", action.expires_at),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::ActionId;
    use crate::ontology::ActionPayload;
    use crate::ontology::EntityId;
    use crate::ontology::MetricId;
    use crate::ontology::MetricValue;

    fn sample_action(timestamp: LogicalTimestamp, expires_at: LogicalTimestamp) -> Action {
        Action {
            action_id: ActionId::new("a1"),
            initiator: EntityId::new("alice"),
            payload: ActionPayload { metric_id: MetricId::new("wealth"), value: MetricValue::from_i64(1), protocol_id: None },
            timestamp,
            expires_at,
            signature: "deadbeef".to_string(),
        }
    }

    #[test]
    fn advancing_timestamp_passes() {
        let action = sample_action(LogicalTimestamp::new(2, 0), LogicalTimestamp::ZERO);
        assert!(check(&action, LogicalTimestamp::new(1, 0), LogicalTimestamp::new(2, 0)).is_ok());
    }

    #[test]
    fn equal_timestamp_passes() {
        let action = sample_action(LogicalTimestamp::new(1, 0), LogicalTimestamp::ZERO);
        assert!(check(&action, LogicalTimestamp::new(1, 0), LogicalTimestamp::new(1, 0)).is_ok());
    }

    #[test]
    fn backward_timestamp_fails() {
        let action = sample_action(LogicalTimestamp::new(1, 0), LogicalTimestamp::ZERO);
        assert_eq!(
            check(&action, LogicalTimestamp::new(2, 0), LogicalTimestamp::new(2, 0)).unwrap_err().code,
            ErrorCode::TemporalParadox
        );
    }

    #[test]
    fn no_expiry_never_rejects() {
        let action = sample_action(LogicalTimestamp::new(1, 0), LogicalTimestamp::ZERO);
        assert!(check(&action, LogicalTimestamp::new(1, 0), LogicalTimestamp::new(1_000, 0)).is_ok());
    }

    #[test]
    fn expired_action_is_rejected() {
        let action = sample_action(LogicalTimestamp::new(1, 0), LogicalTimestamp::new(5, 0));
        assert_eq!(
            check(&action, LogicalTimestamp::new(1, 0), LogicalTimestamp::new(6, 0)).unwrap_err().code,
            ErrorCode::ActionExpired
        );
    }

    #[test]
    fn action_expiring_exactly_now_is_not_expired() {
        let action = sample_action(LogicalTimestamp::new(1, 0), LogicalTimestamp::new(5, 0));
        assert!(check(&action, LogicalTimestamp::new(1, 0), LogicalTimestamp::new(5, 0)).is_ok());
    }
}
