// governance-core/src/guards/invariant.rs
// ============================================================================
// Module: Invariant Guard
// Description: Domain-level shape invariants on the action identifier and
//              payload.
// Purpose: Second stage of the guard pipeline.
// Dependencies: crate::{guards, ontology, primitives}
// ============================================================================

use crate::guards::ErrorCode;
use crate::guards::GuardOutcome;
use crate::guards::GuardViolation;
use crate::ontology::Action;
use crate::primitives::canonical_json_bytes;

/// The maximum canonical-encoded payload size the kernel will accept.
pub const MAX_PAYLOAD_BYTES: usize = 16 * 1024;

/// Runs the Invariant Guard: `actionId` must be a non-empty lowercase hex
/// string, the payload must name a metric, and the canonical payload must
/// not exceed [`MAX_PAYLOAD_BYTES`].
#[must_use]
pub fn check(action: &Action) -> GuardOutcome {
    if !is_hex_id(action.action_id.as_str()) {
        return Err(GuardViolation::new(ErrorCode::InvalidIdFormat, action.action_id.to_string()));
    }
    if action.payload.metric_id.as_str().is_empty() {
        return Err(GuardViolation::new(ErrorCode::MissingMetricId, "payload.metricId is empty"));
    }
    let encoded = canonical_json_bytes(&action.payload)
        .map_err(|err| GuardViolation::new(ErrorCode::InvalidIdFormat, err.to_string()))?;
    if encoded.len() > MAX_PAYLOAD_BYTES {
        return Err(GuardViolation::new(
            ErrorCode::PayloadOversize,
            format!("payload is {} bytes, limit is {MAX_PAYLOAD_BYTES}", encoded.len()),
        ));
    }
    Ok(())
}

fn is_hex_id(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::ActionId;
    use crate::ontology::ActionPayload;
    use crate::ontology::EntityId;
    use crate::ontology::MetricId;
    use crate::ontology::MetricValue;
    use crate::primitives::LogicalTimestamp;

    fn sample() -> Action {
        Action {
            action_id: ActionId::new("deadbeef"),
            initiator: EntityId::new("alice"),
            payload: ActionPayload {
                metric_id: MetricId::new("wealth"),
                value: MetricValue::from_i64(1),
                protocol_id: None,
            },
            timestamp: LogicalTimestamp::new(1, 0),
            expires_at: LogicalTimestamp::ZERO,
            signature: "aa".to_string(),
        }
    }

    #[test]
    fn well_formed_action_passes() {
        assert!(check(&sample()).is_ok());
    }

    #[test]
    fn non_hex_action_id_fails() {
        let mut action = sample();
        action.action_id = ActionId::new("not-hex!");
        assert_eq!(check(&action).unwrap_err().code, ErrorCode::InvalidIdFormat);
    }

    #[test]
    fn empty_metric_id_fails() {
        let mut action = sample();
        action.payload.metric_id = MetricId::new("");
        assert_eq!(check(&action).unwrap_err().code, ErrorCode::MissingMetricId);
    }

    #[test]
    fn oversized_payload_fails() {
        let mut action = sample();
        action.payload.value = MetricValue::Text("x".repeat(MAX_PAYLOAD_BYTES * 2));
        assert_eq!(check(&action).unwrap_err().code, ErrorCode::PayloadOversize);
    }
}
