// governance-core/src/guards/scope.rs
// ============================================================================
// Module: Scope Guard
// Description: Capability authorization over the action's target metric.
// Purpose: Fifth stage of the guard pipeline.
// Dependencies: crate::{guards, identity, ontology, primitives}
// ============================================================================

use std::collections::BTreeMap;

use crate::guards::ErrorCode;
use crate::guards::GuardOutcome;
use crate::guards::GuardViolation;
use crate::identity::AuthorityEngine;
use crate::ontology::Action;
use crate::ontology::Capability;
use crate::ontology::EntityId;
use crate::primitives::LogicalTimestamp;

/// The capability domain every metric mutation is checked against:
/// `METRIC.WRITE:<metricId>`.
#[must_use]
pub fn metric_write_capability(metric_id: &str) -> Capability {
    Capability::new(format!("METRIC.WRITE:{metric_id}"))
}

/// Runs the Scope Guard: `authority.authorized(actor, "METRIC.WRITE:" +
/// metricId, ...)` must be true. Root entities always pass.
#[must_use]
pub fn check(
    action: &Action,
    actor: &EntityId,
    actor_is_root: bool,
    authority: &AuthorityEngine,
    now: LogicalTimestamp,
) -> GuardOutcome {
    let capability = metric_write_capability(action.payload.metric_id.as_str());
    let authorized = authority.authorized(
        actor,
        &capability,
        actor_is_root,
        "*",
        now,
        &BTreeMap::new(),
    );
    if authorized {
        Ok(())
    } else {
        Err(GuardViolation::new(ErrorCode::OverscopeAttempt, capability.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::ActionId;
    use crate::ontology::ActionPayload;
    use crate::ontology::MetricId;
    use crate::ontology::MetricValue;

    fn sample_action() -> Action {
        Action {
            action_id: ActionId::new("a1"),
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
    fn root_always_passes() {
        let authority = AuthorityEngine::new();
        let result = check(
            &sample_action(),
            &EntityId::new("alice"),
            true,
            &authority,
            LogicalTimestamp::new(1, 0),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn non_root_without_delegation_fails() {
        let authority = AuthorityEngine::new();
        let result = check(
            &sample_action(),
            &EntityId::new("alice"),
            false,
            &authority,
            LogicalTimestamp::new(1, 0),
        );
        assert_eq!(result.unwrap_err().code, ErrorCode::OverscopeAttempt);
    }
}
