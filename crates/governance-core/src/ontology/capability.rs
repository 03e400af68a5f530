// governance-core/src/ontology/capability.rs
// ============================================================================
// Module: Capability Delegation
// Description: Delegation records granted by `AuthorityEngine`.
// Purpose: Canonical representation of "who may do what, where, until when,
//          and with what numeric limits".
// Dependencies: crate::{ontology::identifiers, primitives}, serde
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::ontology::identifiers::Capability;
use crate::ontology::identifiers::DelegationId;
use crate::ontology::identifiers::EntityId;
use crate::primitives::LogicalTimestamp;

/// Numeric limits attached to a delegation (e.g. a maximum per-action
/// spend). Keys are caller-defined limit names; values are the ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DelegationLimits(pub BTreeMap<String, f64>);

impl DelegationLimits {
    /// Returns whether `observed[name] <= limit[name]` for every limit this
    /// delegation declares. A limit name the caller did not supply an
    /// observed value for is treated as violated (fail-closed).
    #[must_use]
    pub fn satisfied_by(&self, observed: &BTreeMap<String, f64>) -> bool {
        self.0
            .iter()
            .all(|(name, limit)| observed.get(name).is_some_and(|value| value <= limit))
    }
}

/// A capability delegation recorded by `AuthorityEngine::grant`.
///
/// # Invariants
/// - No self-delegation (`granter != grantee`).
/// - A delegation may not widen its granter's own capability set (checked
///   by `AuthorityEngine` at grant time, not representable here).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delegation {
    /// Unique delegation identifier.
    pub id: DelegationId,
    /// The entity granting the capability.
    pub granter: EntityId,
    /// The entity receiving the capability.
    pub grantee: EntityId,
    /// The capability pattern granted.
    pub capability: Capability,
    /// The jurisdiction (resource scope qualifier) this delegation applies
    /// within; `*` means unrestricted.
    pub jurisdiction: String,
    /// When the delegation was recorded.
    pub granted_at: LogicalTimestamp,
    /// When the delegation expires; [`LogicalTimestamp::ZERO`] means never.
    pub expires_at: LogicalTimestamp,
    /// Optional numeric limits the grantee's use of this capability must
    /// respect.
    pub limits: Option<DelegationLimits>,
    /// Hex-encoded signature by the granter over the delegation's content.
    pub signature: String,
}

impl Delegation {
    /// Returns whether this delegation is expired relative to `now`.
    #[must_use]
    pub fn is_expired(&self, now: LogicalTimestamp) -> bool {
        self.expires_at != LogicalTimestamp::ZERO && now > self.expires_at
    }
}
