// governance-core/src/protocol/engine.rs
// ============================================================================
// Module: Protocol Engine
// Description: Protocol lifecycle, bundle installation, and precondition
//              evaluation against current state.
// Purpose: Component C6 (closed-DSL half).
// Dependencies: crate::{ontology, metrics, primitives, protocol::bundle}
// ============================================================================

use std::collections::HashMap;

use thiserror::Error;

use crate::metrics::MetricRegistry;
use crate::metrics::StateModel;
use crate::ontology::EntityId;
use crate::ontology::MetricValue;
use crate::ontology::Mutation;
use crate::ontology::Precondition;
use crate::ontology::Protocol;
use crate::ontology::ProtocolBundle;
use crate::ontology::ProtocolId;
use crate::ontology::ProtocolLifecycle;
use crate::ontology::ThresholdOperator;
use crate::primitives::LogicalTimestamp;
use crate::primitives::PublicKey;
use crate::primitives::verify_signature;
use crate::protocol::bundle::BundleError;
use crate::protocol::bundle::detect_conflicts;
use crate::protocol::bundle::verify_bundle_id;
use crate::protocol::bundle::verify_bundle_signature;

/// Errors raised by [`ProtocolEngine`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// `propose` was called with an empty id, name, or version.
    #[error("protocol is missing a required field: {0}")]
    InvalidProtocol(String),
    /// A protocol with this id is already registered.
    #[error("duplicate protocol: {0}")]
    DuplicateProtocol(ProtocolId),
    /// No protocol is registered under this id.
    #[error("protocol not found: {0}")]
    NotFound(ProtocolId),
    /// The protocol exists but is not in the lifecycle state the operation
    /// requires.
    #[error("protocol {0} is not ACTIVE")]
    NotActive(ProtocolId),
    /// The requested lifecycle transition is not a legal single step.
    #[error("illegal lifecycle transition for protocol {0}")]
    IllegalTransition(ProtocolId),
    /// The governance signature over the protocol id did not verify.
    #[error("governance signature invalid for protocol {0}")]
    GovernanceSignatureInvalid(ProtocolId),
    /// Bundle verification failed before any protocol was registered.
    #[error(transparent)]
    Bundle(#[from] BundleError),
    /// More than one ACTIVE protocol's preconditions held and both declare
    /// an execution against the same metric.
    #[error("protocol violation: {0} targeted by multiple triggered protocols")]
    ProtocolViolation(crate::ontology::MetricId),
    /// A `strict` protocol had a precondition that could not be evaluated
    /// (e.g. a `METRIC_THRESHOLD` over an unregistered or non-numeric
    /// metric), rejecting the whole evaluation rather than treating it as
    /// unmet.
    #[error("protocol {0} precondition could not be evaluated")]
    UnevaluablePrecondition(ProtocolId),
}

/// Registry of Protocols and their lifecycles, plus precondition evaluation
/// against current state.
#[derive(Debug, Default)]
pub struct ProtocolEngine {
    protocols: HashMap<ProtocolId, Protocol>,
}

impl ProtocolEngine {
    /// Creates an empty protocol engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new `PROPOSED` protocol.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidProtocol`] if `id`/`name`/`version`
    /// are empty, or [`ProtocolError::DuplicateProtocol`] if already
    /// registered.
    pub fn propose(&mut self, protocol: Protocol) -> Result<(), ProtocolError> {
        if protocol.id.as_str().is_empty() {
            return Err(ProtocolError::InvalidProtocol("id".to_string()));
        }
        if protocol.name.is_empty() {
            return Err(ProtocolError::InvalidProtocol("name".to_string()));
        }
        if protocol.version.is_empty() {
            return Err(ProtocolError::InvalidProtocol("version".to_string()));
        }
        if self.protocols.contains_key(&protocol.id) {
            return Err(ProtocolError::DuplicateProtocol(protocol.id));
        }
        self.protocols.insert(protocol.id.clone(), protocol);
        Ok(())
    }

    /// Transitions `id` from `PROPOSED` to `RATIFIED` after verifying
    /// `governance_signature` (hex-encoded) over the protocol id's raw
    /// bytes, using `governance_public_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotFound`], [`ProtocolError::IllegalTransition`],
    /// or [`ProtocolError::GovernanceSignatureInvalid`].
    pub fn ratify(
        &mut self,
        id: &ProtocolId,
        governance_public_key: &PublicKey,
        governance_signature: &str,
    ) -> Result<(), ProtocolError> {
        let protocol = self.protocols.get_mut(id).ok_or_else(|| ProtocolError::NotFound(id.clone()))?;
        if !protocol.lifecycle.can_transition_to(ProtocolLifecycle::Ratified) {
            return Err(ProtocolError::IllegalTransition(id.clone()));
        }
        let signature_bytes =
            hex_decode(governance_signature).ok_or_else(|| ProtocolError::GovernanceSignatureInvalid(id.clone()))?;
        verify_signature(id.as_str().as_bytes(), &signature_bytes, governance_public_key)
            .map_err(|_| ProtocolError::GovernanceSignatureInvalid(id.clone()))?;
        protocol.lifecycle = ProtocolLifecycle::Ratified;
        Ok(())
    }

    /// Transitions `id` from `RATIFIED` to `ACTIVE`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotFound`] or [`ProtocolError::IllegalTransition`].
    pub fn activate(&mut self, id: &ProtocolId) -> Result<(), ProtocolError> {
        self.transition(id, ProtocolLifecycle::Active)
    }

    /// Transitions `id` from `ACTIVE` to `DEPRECATED`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotFound`] or [`ProtocolError::IllegalTransition`].
    pub fn deprecate(&mut self, id: &ProtocolId) -> Result<(), ProtocolError> {
        self.transition(id, ProtocolLifecycle::Deprecated)
    }

    /// Transitions `id` from `ACTIVE` to `REVOKED`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotFound`] or [`ProtocolError::IllegalTransition`].
    pub fn revoke(&mut self, id: &ProtocolId) -> Result<(), ProtocolError> {
        self.transition(id, ProtocolLifecycle::Revoked)
    }

    fn transition(&mut self, id: &ProtocolId, next: ProtocolLifecycle) -> Result<(), ProtocolError> {
        let protocol = self.protocols.get_mut(id).ok_or_else(|| ProtocolError::NotFound(id.clone()))?;
        if !protocol.lifecycle.can_transition_to(next) {
            return Err(ProtocolError::IllegalTransition(id.clone()));
        }
        protocol.lifecycle = next;
        Ok(())
    }

    /// Loads a signed bundle, registering every protocol it carries
    /// atomically.
    ///
    /// Steps: recompute and check `bundleId`; verify the owner's signature
    /// over it; detect ACTIVE-protocol execution-target conflicts against
    /// the engine's current state and within the bundle itself; only then
    /// register every protocol.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Bundle`] wrapping the specific
    /// [`BundleError`] (`IdMismatch`, `SignatureInvalid`, or `Conflict`).
    pub fn load_bundle(&mut self, bundle: &ProtocolBundle, _actor: &EntityId) -> Result<(), ProtocolError> {
        let bundle_id = verify_bundle_id(bundle)?;
        verify_bundle_signature(bundle, bundle_id)?;
        detect_conflicts(self.protocols.values(), &bundle.protocols)?;

        for protocol in &bundle.protocols {
            self.protocols.insert(protocol.id.clone(), protocol.clone());
        }
        Ok(())
    }

    /// Returns whether a protocol is registered under `id`.
    #[must_use]
    pub fn is_registered(&self, id: &ProtocolId) -> bool {
        self.protocols.contains_key(id)
    }

    /// Returns the registered protocol, if any.
    #[must_use]
    pub fn get(&self, id: &ProtocolId) -> Option<&Protocol> {
        self.protocols.get(id)
    }

    /// Evaluates every `ACTIVE` protocol's preconditions against `state`
    /// (with `registry` resolving metric types and `primary` treated as
    /// already applied) and returns the side-effect mutations of those
    /// that hold.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ProtocolViolation`] if more than one
    /// triggered protocol declares an execution against the same metric, or
    /// [`ProtocolError::UnevaluablePrecondition`] if a `strict` protocol has
    /// a precondition that cannot be evaluated against `state`.
    pub fn evaluate(
        &self,
        registry: &MetricRegistry,
        state: &StateModel,
        timestamp: LogicalTimestamp,
        primary: &Mutation,
    ) -> Result<Vec<Mutation>, ProtocolError> {
        let mut mutations = Vec::new();
        let mut targeted = std::collections::HashSet::new();

        for protocol in self.protocols.values().filter(|p| p.lifecycle == ProtocolLifecycle::Active) {
            let mut holds = true;
            for precondition in &protocol.preconditions {
                match evaluate_precondition(precondition, registry, state, timestamp, primary) {
                    Some(true) => {}
                    Some(false) => {
                        holds = false;
                        break;
                    }
                    None if protocol.strict => {
                        return Err(ProtocolError::UnevaluablePrecondition(protocol.id.clone()));
                    }
                    None => {
                        holds = false;
                        break;
                    }
                }
            }
            if !holds {
                continue;
            }
            for execution in &protocol.execution {
                let crate::ontology::Execution::MutateMetric { metric_id, mutation } = execution;
                if !targeted.insert(metric_id.clone()) {
                    return Err(ProtocolError::ProtocolViolation(metric_id.clone()));
                }
                mutations.push(Mutation::new(metric_id.clone(), mutation.clone()));
            }
        }
        Ok(mutations)
    }
}

/// Evaluates one precondition. `None` means it could not be evaluated at all
/// (e.g. a `METRIC_THRESHOLD` over an unregistered or non-numeric metric),
/// distinct from `Some(false)` meaning it was evaluated and did not hold.
fn evaluate_precondition(
    precondition: &Precondition,
    registry: &MetricRegistry,
    state: &StateModel,
    timestamp: LogicalTimestamp,
    primary: &Mutation,
) -> Option<bool> {
    match precondition {
        Precondition::Always => Some(true),
        Precondition::MetricThreshold { metric_id, operator, value } => {
            let current = projected_numeric_value(registry, state, metric_id, primary)?;
            Some(match operator {
                ThresholdOperator::LessThan => current < *value,
                ThresholdOperator::LessThanOrEqual => current <= *value,
                ThresholdOperator::Equal => (current - *value).abs() < f64::EPSILON,
                ThresholdOperator::GreaterThanOrEqual => current >= *value,
                ThresholdOperator::GreaterThan => current > *value,
            })
        }
        Precondition::TimeWindow { start, end } => {
            Some(start.map_or(true, |s| timestamp >= s) && end.map_or(true, |e| timestamp <= e))
        }
    }
}

fn projected_numeric_value(
    registry: &MetricRegistry,
    state: &StateModel,
    metric_id: &crate::ontology::MetricId,
    primary: &Mutation,
) -> Option<f64> {
    let current = state.get(metric_id).and_then(MetricValue::as_number).and_then(serde_json::Number::as_f64);
    if metric_id != &primary.metric_id {
        return current;
    }
    let delta = primary.value.as_number().and_then(serde_json::Number::as_f64)?;
    let is_counter = registry.get(metric_id).is_some_and(|def| def.metric_type == crate::metrics::MetricType::Counter);
    Some(if is_counter { current.unwrap_or(0.0) + delta } else { delta })
}

fn hex_decode(value: &str) -> Option<Vec<u8>> {
    if value.len() % 2 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(value.len() / 2);
    for chunk in value.as_bytes().chunks(2) {
        let hi = (chunk[0] as char).to_digit(16)?;
        let lo = (chunk[1] as char).to_digit(16)?;
        out.push(((hi << 4) | lo) as u8);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::Execution;

    fn sample_protocol(id: &str, lifecycle: ProtocolLifecycle) -> Protocol {
        Protocol {
            id: ProtocolId::new(id),
            name: "Reputation Bump".to_string(),
            version: "1.0".to_string(),
            category: "incentive".to_string(),
            lifecycle,
            strict: false,
            preconditions: vec![Precondition::Always],
            execution: vec![Execution::MutateMetric {
                metric_id: crate::ontology::MetricId::new("reputation"),
                mutation: MetricValue::from_i64(1),
            }],
        }
    }

    #[test]
    fn propose_rejects_empty_name() {
        let mut engine = ProtocolEngine::new();
        let mut protocol = sample_protocol("p1", ProtocolLifecycle::Proposed);
        protocol.name.clear();
        assert_eq!(engine.propose(protocol), Err(ProtocolError::InvalidProtocol("name".to_string())));
    }

    #[test]
    fn lifecycle_transitions_happen_in_order() {
        let mut engine = ProtocolEngine::new();
        engine.propose(sample_protocol("p1", ProtocolLifecycle::Proposed)).unwrap();
        assert_eq!(engine.activate(&ProtocolId::new("p1")), Err(ProtocolError::IllegalTransition(ProtocolId::new("p1"))));
    }

    #[test]
    fn evaluate_returns_active_protocol_side_effects() {
        let mut engine = ProtocolEngine::new();
        engine.propose(sample_protocol("p1", ProtocolLifecycle::Active)).unwrap();
        let registry = MetricRegistry::new();
        let state = StateModel::new(LogicalTimestamp::ZERO);
        let primary = Mutation::new(crate::ontology::MetricId::new("wealth"), MetricValue::from_i64(100));
        let mutations = engine.evaluate(&registry, &state, LogicalTimestamp::new(1, 0), &primary).unwrap();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].metric_id, crate::ontology::MetricId::new("reputation"));
    }

    #[test]
    fn evaluate_rejects_two_active_protocols_targeting_same_metric() {
        let mut engine = ProtocolEngine::new();
        engine.propose(sample_protocol("p1", ProtocolLifecycle::Active)).unwrap();
        engine.propose(sample_protocol("p2", ProtocolLifecycle::Active)).unwrap();
        let registry = MetricRegistry::new();
        let state = StateModel::new(LogicalTimestamp::ZERO);
        let primary = Mutation::new(crate::ontology::MetricId::new("wealth"), MetricValue::from_i64(100));
        assert_eq!(
            engine.evaluate(&registry, &state, LogicalTimestamp::new(1, 0), &primary),
            Err(ProtocolError::ProtocolViolation(crate::ontology::MetricId::new("reputation")))
        );
    }

    fn protocol_with_unevaluable_precondition(id: &str, strict: bool) -> Protocol {
        let mut protocol = sample_protocol(id, ProtocolLifecycle::Active);
        protocol.strict = strict;
        protocol.preconditions = vec![Precondition::MetricThreshold {
            metric_id: crate::ontology::MetricId::new("unregistered"),
            operator: ThresholdOperator::GreaterThan,
            value: 0.0,
        }];
        protocol
    }

    #[test]
    fn non_strict_unevaluable_precondition_is_treated_as_unmet() {
        let mut engine = ProtocolEngine::new();
        engine.propose(protocol_with_unevaluable_precondition("p1", false)).unwrap();
        let registry = MetricRegistry::new();
        let state = StateModel::new(LogicalTimestamp::ZERO);
        let primary = Mutation::new(crate::ontology::MetricId::new("wealth"), MetricValue::from_i64(100));
        let mutations = engine.evaluate(&registry, &state, LogicalTimestamp::new(1, 0), &primary).unwrap();
        assert!(mutations.is_empty());
    }

    #[test]
    fn strict_unevaluable_precondition_rejects_the_evaluation() {
        let mut engine = ProtocolEngine::new();
        engine.propose(protocol_with_unevaluable_precondition("p1", true)).unwrap();
        let registry = MetricRegistry::new();
        let state = StateModel::new(LogicalTimestamp::ZERO);
        let primary = Mutation::new(crate::ontology::MetricId::new("wealth"), MetricValue::from_i64(100));
        assert_eq!(
            engine.evaluate(&registry, &state, LogicalTimestamp::new(1, 0), &primary),
            Err(ProtocolError::UnevaluablePrecondition(ProtocolId::new("p1")))
        );
    }
}
