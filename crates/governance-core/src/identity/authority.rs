// governance-core/src/identity/authority.rs
// ============================================================================
// Module: Authority Engine
// Description: Capability delegation grants and authorization checks.
// Purpose: Component C3 (half): "who may do what, where, until when."
// Dependencies: crate::{ontology, primitives}, thiserror
// ============================================================================

//! ## Overview
//! `AuthorityEngine` is deliberately decoupled from [`crate::identity::IdentityManager`]:
//! callers resolve an entity's public key and root flag first (the Kernel
//! does this once per operation) and pass them in. This keeps the two
//! halves of identity/authority independently testable.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::ontology::Capability;
use crate::ontology::Delegation;
use crate::ontology::DelegationId;
use crate::ontology::DelegationLimits;
use crate::ontology::EntityId;
use crate::primitives::HashError;
use crate::primitives::LogicalTimestamp;
use crate::primitives::PublicKey;
use crate::primitives::canonical_json_bytes;
use crate::primitives::verify_signature;

/// Errors raised by [`AuthorityEngine::grant`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthorityError {
    /// A granter may not delegate a capability to themselves.
    #[error("self-delegation is not permitted")]
    SelfDelegation,
    /// The granter's signature over the delegation did not verify.
    #[error("delegation signature invalid")]
    SignatureInvalid,
    /// The granter does not itself hold the capability being delegated.
    #[error("delegation would widen the granter's own capability set")]
    CapabilityWidening,
    /// The delegation's content could not be canonicalized for signing.
    #[error("delegation canonicalization failed: {0}")]
    Canonicalization(#[from] HashError),
}

/// The fields of a [`Delegation`] the granter's signature is computed over
/// (everything except the signature itself).
#[derive(Debug, Serialize)]
struct DelegationContent<'a> {
    id: &'a DelegationId,
    granter: &'a EntityId,
    grantee: &'a EntityId,
    capability: &'a Capability,
    jurisdiction: &'a str,
    granted_at: LogicalTimestamp,
    expires_at: LogicalTimestamp,
    limits: &'a Option<DelegationLimits>,
}

impl<'a> From<&'a Delegation> for DelegationContent<'a> {
    fn from(delegation: &'a Delegation) -> Self {
        Self {
            id: &delegation.id,
            granter: &delegation.granter,
            grantee: &delegation.grantee,
            capability: &delegation.capability,
            jurisdiction: &delegation.jurisdiction,
            granted_at: delegation.granted_at,
            expires_at: delegation.expires_at,
            limits: &delegation.limits,
        }
    }
}

/// Engine tracking capability delegations and evaluating authorization.
#[derive(Debug, Default)]
pub struct AuthorityEngine {
    delegations: Vec<Delegation>,
}

impl AuthorityEngine {
    /// Creates an empty authority engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a delegation after verifying the granter's signature and
    /// rejecting self-delegation or capability widening.
    ///
    /// `granter_is_root` and `granter_public_key` must be resolved by the
    /// caller via `IdentityManager` before calling this.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError::SelfDelegation`], [`AuthorityError::SignatureInvalid`],
    /// or [`AuthorityError::CapabilityWidening`] as appropriate.
    pub fn grant(
        &mut self,
        delegation: Delegation,
        granter_public_key: &PublicKey,
        granter_is_root: bool,
    ) -> Result<(), AuthorityError> {
        if delegation.granter == delegation.grantee {
            return Err(AuthorityError::SelfDelegation);
        }

        let content = DelegationContent::from(&delegation);
        let message = canonical_json_bytes(&content)?;
        let signature_bytes = hex_decode(&delegation.signature)
            .ok_or(AuthorityError::SignatureInvalid)?;
        verify_signature(&message, &signature_bytes, granter_public_key)
            .map_err(|_| AuthorityError::SignatureInvalid)?;

        if !granter_is_root
            && !self.authorized(
                &delegation.granter,
                &delegation.capability,
                false,
                &delegation.jurisdiction,
                delegation.granted_at,
                &BTreeMap::new(),
            )
        {
            return Err(AuthorityError::CapabilityWidening);
        }

        self.delegations.push(delegation);
        Ok(())
    }

    /// Returns whether `actor` is authorized for `capability` within
    /// `jurisdiction` at `now`, given `observed_limits` to check against any
    /// matching delegation's numeric limits.
    ///
    /// Root actors are always authorized. The wildcard capability `*`
    /// matches everything.
    #[must_use]
    pub fn authorized(
        &self,
        actor: &EntityId,
        capability: &Capability,
        actor_is_root: bool,
        jurisdiction: &str,
        now: LogicalTimestamp,
        observed_limits: &BTreeMap<String, f64>,
    ) -> bool {
        if actor_is_root {
            return true;
        }
        self.delegations.iter().any(|delegation| {
            &delegation.grantee == actor
                && delegation.capability.authorizes(capability)
                && (delegation.jurisdiction == "*" || delegation.jurisdiction == jurisdiction)
                && !delegation.is_expired(now)
                && delegation
                    .limits
                    .as_ref()
                    .map_or(true, |limits| limits.satisfied_by(observed_limits))
        })
    }

    /// Returns the delegations granted to `grantee`, most recent last.
    pub fn delegations_for(&self, grantee: &EntityId) -> impl Iterator<Item = &Delegation> {
        self.delegations.iter().filter(move |d| &d.grantee == grantee)
    }
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
    use crate::primitives::PrivateKey;
    use rand::rngs::OsRng;

    fn sign_delegation(key: &PrivateKey, delegation: &Delegation) -> String {
        let content = DelegationContent::from(delegation);
        let message = canonical_json_bytes(&content).unwrap();
        hex_encode(&key.sign(&message))
    }

    fn hex_encode(bytes: &[u8]) -> String {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut out = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            out.push(HEX[(byte >> 4) as usize] as char);
            out.push(HEX[(byte & 0x0f) as usize] as char);
        }
        out
    }

    #[test]
    fn self_delegation_rejected() {
        let mut engine = AuthorityEngine::new();
        let key = PrivateKey::generate(&mut OsRng);
        let mut delegation = Delegation {
            id: DelegationId::new("d1"),
            granter: EntityId::new("alice"),
            grantee: EntityId::new("alice"),
            capability: Capability::new("METRIC.WRITE:stress"),
            jurisdiction: "*".to_string(),
            granted_at: LogicalTimestamp::new(1, 0),
            expires_at: LogicalTimestamp::ZERO,
            limits: None,
            signature: String::new(),
        };
        delegation.signature = sign_delegation(&key, &delegation);
        assert_eq!(
            engine.grant(delegation, &key.public_key(), true),
            Err(AuthorityError::SelfDelegation)
        );
    }

    #[test]
    fn root_grant_then_authorized() {
        let mut engine = AuthorityEngine::new();
        let key = PrivateKey::generate(&mut OsRng);
        let mut delegation = Delegation {
            id: DelegationId::new("d1"),
            granter: EntityId::new("root"),
            grantee: EntityId::new("alice"),
            capability: Capability::new("METRIC.WRITE:stress"),
            jurisdiction: "*".to_string(),
            granted_at: LogicalTimestamp::new(1, 0),
            expires_at: LogicalTimestamp::ZERO,
            limits: None,
            signature: String::new(),
        };
        delegation.signature = sign_delegation(&key, &delegation);
        engine.grant(delegation, &key.public_key(), true).unwrap();
        assert!(engine.authorized(
            &EntityId::new("alice"),
            &Capability::new("METRIC.WRITE:stress"),
            false,
            "*",
            LogicalTimestamp::new(2, 0),
            &BTreeMap::new(),
        ));
        assert!(!engine.authorized(
            &EntityId::new("alice"),
            &Capability::new("METRIC.WRITE:reputation"),
            false,
            "*",
            LogicalTimestamp::new(2, 0),
            &BTreeMap::new(),
        ));
    }

    #[test]
    fn expired_delegation_not_authorized() {
        let mut engine = AuthorityEngine::new();
        let key = PrivateKey::generate(&mut OsRng);
        let mut delegation = Delegation {
            id: DelegationId::new("d1"),
            granter: EntityId::new("root"),
            grantee: EntityId::new("alice"),
            capability: Capability::new("METRIC.WRITE:stress"),
            jurisdiction: "*".to_string(),
            granted_at: LogicalTimestamp::new(1, 0),
            expires_at: LogicalTimestamp::new(5, 0),
            limits: None,
            signature: String::new(),
        };
        delegation.signature = sign_delegation(&key, &delegation);
        engine.grant(delegation, &key.public_key(), true).unwrap();
        assert!(!engine.authorized(
            &EntityId::new("alice"),
            &Capability::new("METRIC.WRITE:stress"),
            false,
            "*",
            LogicalTimestamp::new(6, 0),
            &BTreeMap::new(),
        ));
    }

    #[test]
    fn non_root_cannot_widen_capability() {
        let mut engine = AuthorityEngine::new();
        let key = PrivateKey::generate(&mut OsRng);
        let mut delegation = Delegation {
            id: DelegationId::new("d1"),
            granter: EntityId::new("bob"),
            grantee: EntityId::new("alice"),
            capability: Capability::new("METRIC.WRITE:stress"),
            jurisdiction: "*".to_string(),
            granted_at: LogicalTimestamp::new(1, 0),
            expires_at: LogicalTimestamp::ZERO,
            limits: None,
            signature: String::new(),
        };
        delegation.signature = sign_delegation(&key, &delegation);
        assert_eq!(
            engine.grant(delegation, &key.public_key(), false),
            Err(AuthorityError::CapabilityWidening)
        );
    }
}
