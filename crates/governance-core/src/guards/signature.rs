// governance-core/src/guards/signature.rs
// ============================================================================
// Module: Signature Guard
// Description: Verifies an action's cryptographic signature and entity
//              standing.
// Purpose: First stage of the guard pipeline.
// Dependencies: crate::{guards, identity, ontology, primitives}
// ============================================================================

use crate::guards::ErrorCode;
use crate::guards::GuardOutcome;
use crate::guards::GuardViolation;
use crate::identity::IdentityManager;
use crate::ontology::Action;
use crate::primitives::verify_signature;

/// Runs the Signature Guard.
///
/// `internal_context` is `true` only for internally-originated Actions
/// (replay reconstruction, genesis seeding); an externally-submitted action
/// carrying [`Action::TRUSTED_SIGNATURE`] must fail regardless of its other
/// fields.
#[must_use]
pub fn check(action: &Action, identities: &IdentityManager, internal_context: bool) -> GuardOutcome {
    if action.signature == Action::TRUSTED_SIGNATURE {
        return if internal_context {
            Ok(())
        } else {
            Err(GuardViolation::new(
                ErrorCode::SignatureInvalid,
                "external action may not carry the TRUSTED signature bypass",
            ))
        };
    }

    let entity = identities
        .get(&action.initiator)
        .ok_or_else(|| GuardViolation::new(ErrorCode::UnknownEntity, action.initiator.to_string()))?;

    if entity.is_revoked() {
        return Err(GuardViolation::new(ErrorCode::RevokedEntity, action.initiator.to_string()));
    }

    let message = action
        .signed_message()
        .map_err(|err| GuardViolation::new(ErrorCode::SignatureInvalid, err.to_string()))?;
    let signature_bytes =
        hex_decode(&action.signature).ok_or_else(|| GuardViolation::new(ErrorCode::SignatureInvalid, "malformed signature hex"))?;
    verify_signature(&message, &signature_bytes, &entity.public_key)
        .map_err(|err| GuardViolation::new(ErrorCode::SignatureInvalid, err.to_string()))
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
