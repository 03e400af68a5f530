// governance-core/src/ontology/action.rs
// ============================================================================
// Module: Action & Mutation
// Description: The canonical signed input and the metric mutations it (and
//              triggered protocols) produce.
// Purpose: Define the wire-level Action type and the signed-message
//          construction every Guard and the Kernel agree on.
// Dependencies: crate::{ontology::identifiers, primitives}, serde, serde_json
// ============================================================================

//! ## Overview
//! An Action is the canonical input submitted to the Kernel. Its signed
//! message is the colon-joined string
//! `actionId:initiator:canonical(payload):timestamp:expiresAt`,
//! built once here so the Signature Guard, test fixtures, and replay all
//! agree on the exact bytes that were signed.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Number;

use crate::ontology::identifiers::ActionId;
use crate::ontology::identifiers::EntityId;
use crate::ontology::identifiers::MetricId;
use crate::ontology::identifiers::ProtocolId;
use crate::primitives::HashError;
use crate::primitives::LogicalTimestamp;
use crate::primitives::canonical_json_bytes;

/// A scalar value carried by a [`Mutation`] or an [`Action`] payload.
///
/// # Invariants
/// - `Number` values must be finite; the kernel never constructs a `Number`
///   from a non-finite `f64` (see [`MetricValue::from_f64`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// A JSON number, kept in its original textual precision until a
    /// numeric operation needs to parse it (mirrors how the metric store
    /// parses numbers into exact decimals rather than via `f64` equality).
    Number(Number),
    /// A boolean value, used by `BOOLEAN` metrics.
    Bool(bool),
    /// A string value.
    Text(String),
}

impl MetricValue {
    /// Builds a `Number` value from an `f64`, rejecting non-finite inputs.
    #[must_use]
    pub fn from_f64(value: f64) -> Option<Self> {
        Number::from_f64(value).map(Self::Number)
    }

    /// Builds an integer `Number` value.
    #[must_use]
    pub fn from_i64(value: i64) -> Self {
        Self::Number(Number::from(value))
    }

    /// Returns this value's [`Number`] if it is numeric.
    #[must_use]
    pub const fn as_number(&self) -> Option<&Number> {
        match self {
            Self::Number(number) => Some(number),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }

    /// Returns this value's boolean if it is a `Bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Number(_) | Self::Text(_) => None,
        }
    }
}

/// A single `(metricId, value)` change to apply to the metric store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    /// The target metric.
    pub metric_id: MetricId,
    /// The value to apply. Interpretation (absolute set vs. increment)
    /// depends on the metric's type and, for protocol side effects, on the
    /// execution rule that produced the mutation.
    pub value: MetricValue,
}

impl Mutation {
    /// Creates a new mutation.
    #[must_use]
    pub const fn new(metric_id: MetricId, value: MetricValue) -> Self {
        Self { metric_id, value }
    }
}

/// The payload of an Action: the primary mutation request plus an optional
/// protocol hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPayload {
    /// The metric this Action intends to mutate.
    pub metric_id: MetricId,
    /// The value to apply.
    pub value: MetricValue,
    /// An optional protocol whose side effects should be considered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_id: Option<ProtocolId>,
}

/// The canonical signed input submitted to the Kernel.
///
/// # Invariants
/// - `action_id` is unique (enforced by the Replay Guard, not by this type).
/// - The signed message is exactly
///   `actionId:initiator:canonical(payload):timestamp:expiresAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Unique action identifier; also the Attempt identifier.
    pub action_id: ActionId,
    /// The entity submitting this action.
    pub initiator: EntityId,
    /// The mutation intent and optional protocol hint.
    pub payload: ActionPayload,
    /// When the action was constructed.
    pub timestamp: LogicalTimestamp,
    /// When the action expires; [`LogicalTimestamp::ZERO`] means "never".
    pub expires_at: LogicalTimestamp,
    /// Hex-encoded Ed25519 signature over [`Action::signed_message`], or the
    /// literal string `TRUSTED` for internally-originated actions (replay,
    /// genesis seeding). An externally-submitted action carrying `TRUSTED`
    /// must fail the Signature Guard.
    pub signature: String,
}

impl Action {
    /// The literal signature value honored only for internally-originated
    /// actions.
    pub const TRUSTED_SIGNATURE: &'static str = "TRUSTED";

    /// Builds the exact byte message this action's signature is computed
    /// over: `actionId:initiator:canonical(payload):timestamp:expiresAt`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Canonicalization`] if the payload cannot be
    /// canonicalized.
    pub fn signed_message(&self) -> Result<Vec<u8>, HashError> {
        let canonical_payload = canonical_json_bytes(&self.payload)?;
        let mut message = Vec::new();
        message.extend_from_slice(self.action_id.as_str().as_bytes());
        message.push(b':');
        message.extend_from_slice(self.initiator.as_str().as_bytes());
        message.push(b':');
        message.extend_from_slice(&canonical_payload);
        message.push(b':');
        message.extend_from_slice(self.timestamp.to_string().as_bytes());
        message.push(b':');
        message.extend_from_slice(self.expires_at.to_string().as_bytes());
        Ok(message)
    }

    /// Returns whether this action has expired relative to `now`.
    ///
    /// [`LogicalTimestamp::ZERO`] in `expires_at` means the action never
    /// expires.
    #[must_use]
    pub fn is_expired(&self, now: LogicalTimestamp) -> bool {
        self.expires_at != LogicalTimestamp::ZERO && now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_action() -> Action {
        Action {
            action_id: ActionId::new("a1"),
            initiator: EntityId::new("alice"),
            payload: ActionPayload {
                metric_id: MetricId::new("wealth"),
                value: MetricValue::from_i64(100),
                protocol_id: None,
            },
            timestamp: LogicalTimestamp::new(1, 0),
            expires_at: LogicalTimestamp::ZERO,
            signature: "deadbeef".to_string(),
        }
    }

    #[test]
    fn signed_message_is_deterministic() {
        let action = sample_action();
        assert_eq!(action.signed_message().unwrap(), action.signed_message().unwrap());
    }

    #[test]
    fn zero_expiry_never_expires() {
        let action = sample_action();
        assert!(!action.is_expired(LogicalTimestamp::new(1_000_000, 0)));
    }

    #[test]
    fn expiry_is_enforced_once_set() {
        let mut action = sample_action();
        action.expires_at = LogicalTimestamp::new(5, 0);
        assert!(!action.is_expired(LogicalTimestamp::new(5, 0)));
        assert!(action.is_expired(LogicalTimestamp::new(6, 0)));
    }
}
