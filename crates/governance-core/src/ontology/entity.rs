// governance-core/src/ontology/entity.rs
// ============================================================================
// Module: Entity
// Description: Registered identity type and its lifecycle.
// Purpose: Canonical representation of "who" can act in the kernel.
// Dependencies: crate::{ontology::identifiers, primitives}, serde
// ============================================================================

//! ## Overview
//! An Entity is any identity the kernel can address: an actor, an office, an
//! asset, a system process, or an abstract holder. Status transitions are
//! one-directional once `Revoked`.

use serde::Deserialize;
use serde::Serialize;

use crate::ontology::identifiers::EntityId;
use crate::primitives::LogicalTimestamp;
use crate::primitives::PublicKey;

/// The kind of identity an Entity represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// A human or automated actor that submits Actions.
    Actor,
    /// An institutional office (a role rather than a person).
    Office,
    /// A non-agentive asset tracked by the kernel.
    Asset,
    /// A system process (e.g. the kernel itself, for governance evidence).
    System,
    /// An abstract holder with no further semantics.
    Abstract,
}

/// The lifecycle status of an Entity.
///
/// # Invariants
/// - Once `Revoked`, an entity cannot return to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    /// Entity is in good standing and may act.
    Active,
    /// Entity is temporarily barred from acting.
    Suspended,
    /// Entity has voluntarily or administratively wound down.
    Dissolved,
    /// Entity has been permanently revoked; terminal.
    Revoked,
}

impl EntityStatus {
    /// Returns whether a transition from `self` to `next` is permitted.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        !matches!(self, Self::Revoked) || matches!(next, Self::Revoked)
    }
}

/// A registered identity.
///
/// # Invariants
/// - `id` is unique within an [`crate::identity::IdentityManager`].
/// - `root` grants unrestricted capability and must be assigned sparingly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Opaque unique identifier.
    pub id: EntityId,
    /// Raw Ed25519 public key bytes used to verify this entity's signatures.
    #[serde(with = "public_key_bytes")]
    pub public_key: PublicKey,
    /// The kind of identity this entity represents.
    pub entity_type: EntityType,
    /// Current lifecycle status.
    pub status: EntityStatus,
    /// When the entity was registered.
    pub created_at: LogicalTimestamp,
    /// Caller-supplied identity proof (e.g. an attestation reference).
    pub identity_proof: String,
    /// When the entity was revoked, if it has been.
    pub revoked_at: Option<LogicalTimestamp>,
    /// Whether this entity holds unrestricted capability (bypasses the
    /// Scope Guard entirely).
    pub root: bool,
}

impl Entity {
    /// Returns whether this entity may currently act (not revoked).
    ///
    /// Suspended entities are rejected earlier, at the Signature Guard.
    #[must_use]
    pub const fn is_revoked(&self) -> bool {
        matches!(self.status, EntityStatus::Revoked)
    }
}

mod public_key_bytes {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    use crate::primitives::PublicKey;

    pub fn serialize<S: Serializer>(key: &PublicKey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex_encode(&key.to_bytes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PublicKey, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let bytes = hex_decode(&raw)
            .ok_or_else(|| serde::de::Error::custom("invalid hex public key"))?;
        PublicKey::from_bytes(&bytes).map_err(serde::de::Error::custom)
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoked_is_terminal() {
        assert!(!EntityStatus::Revoked.can_transition_to(EntityStatus::Active));
        assert!(EntityStatus::Revoked.can_transition_to(EntityStatus::Revoked));
        assert!(EntityStatus::Active.can_transition_to(EntityStatus::Suspended));
    }
}
