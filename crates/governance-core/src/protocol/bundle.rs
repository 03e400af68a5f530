// governance-core/src/protocol/bundle.rs
// ============================================================================
// Module: Protocol Bundle Verification
// Description: Bundle id recomputation, owner signature check, and
//              ACTIVE-protocol execution-target conflict detection.
// Purpose: The three pure checks `ProtocolEngine::load_bundle` runs before
//          registering anything.
// Dependencies: crate::{ontology::protocol, primitives}
// ============================================================================

use std::collections::HashSet;

use thiserror::Error;

use crate::ontology::BundleId;
use crate::ontology::MetricId;
use crate::ontology::Protocol;
use crate::ontology::ProtocolBundle;
use crate::ontology::ProtocolLifecycle;
use crate::primitives::HashError;
use crate::primitives::PublicKey;
use crate::primitives::SignatureError;
use crate::primitives::hash_canonical_json;
use crate::primitives::verify_signature;

/// Errors raised while verifying a bundle prior to registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BundleError {
    /// The recomputed `bundleId` did not match the bundle's declared id.
    #[error("bundle id mismatch: declared {declared}, computed {computed}")]
    IdMismatch {
        /// The id the bundle claimed.
        declared: String,
        /// The id this verifier computed.
        computed: String,
    },
    /// The owner's signature over `bundleId` did not verify.
    #[error("bundle signature invalid")]
    SignatureInvalid,
    /// Two ACTIVE protocols (one already registered, one in the bundle, or
    /// two within the bundle) would target the same metric.
    #[error("bundle conflicts with an active protocol on metric {0}")]
    Conflict(MetricId),
    /// The owner's public key bytes were malformed.
    #[error("malformed bundle owner public key")]
    MalformedOwnerKey,
    /// Content could not be canonicalized to recompute the bundle id.
    #[error("bundle canonicalization failed: {0}")]
    Canonicalization(#[from] HashError),
}

/// Recomputes `bundleId = hash(canonical(bundle \ {signature, bundleId}))`
/// and checks it against the bundle's declared id.
///
/// # Errors
///
/// Returns [`BundleError::IdMismatch`] on mismatch, or
/// [`BundleError::Canonicalization`] if the content cannot be hashed.
pub fn verify_bundle_id(bundle: &ProtocolBundle) -> Result<BundleId, BundleError> {
    let digest = hash_canonical_json(&bundle.content())?;
    let computed = BundleId::from_digest(digest);
    if computed.to_string() == bundle.bundle_id {
        Ok(computed)
    } else {
        Err(BundleError::IdMismatch { declared: bundle.bundle_id.clone(), computed: computed.to_string() })
    }
}

/// Verifies the owner's signature over `bundle_id`.
///
/// # Errors
///
/// Returns [`BundleError::MalformedOwnerKey`] or
/// [`BundleError::SignatureInvalid`] as appropriate.
pub fn verify_bundle_signature(bundle: &ProtocolBundle, bundle_id: BundleId) -> Result<(), BundleError> {
    let owner_key =
        PublicKey::from_bytes(&bundle.owner.public_key).map_err(|_: SignatureError| BundleError::MalformedOwnerKey)?;
    let signature_bytes = hex_decode(bundle.signature_bytes_hex()).ok_or(BundleError::SignatureInvalid)?;
    let message = bundle_id.to_string();
    verify_signature(message.as_bytes(), &signature_bytes, &owner_key).map_err(|_| BundleError::SignatureInvalid)
}

/// Checks that no protocol in `incoming` targets the same metric as an
/// `ACTIVE` protocol already in `existing`, nor as another `ACTIVE` protocol
/// within `incoming` itself.
///
/// # Errors
///
/// Returns [`BundleError::Conflict`] naming the first colliding metric.
pub fn detect_conflicts<'a>(
    existing: impl Iterator<Item = &'a Protocol>,
    incoming: &[Protocol],
) -> Result<(), BundleError> {
    let mut active_targets: HashSet<MetricId> = HashSet::new();
    for protocol in existing.filter(|p| p.lifecycle == ProtocolLifecycle::Active) {
        active_targets.extend(protocol.execution_targets().cloned());
    }
    for protocol in incoming.iter().filter(|p| p.lifecycle == ProtocolLifecycle::Active) {
        for target in protocol.execution_targets() {
            if !active_targets.insert(target.clone()) {
                return Err(BundleError::Conflict(target.clone()));
            }
        }
    }
    Ok(())
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
