// governance-core/src/identity/registry.rs
// ============================================================================
// Module: Identity Manager
// Description: Entity registration, revocation, and lookup.
// Purpose: Component C3 (half): "who exists" as distinct from "who may do
//          what" (see `crate::identity::authority`).
// Dependencies: crate::ontology, std::collections::HashMap
// ============================================================================

use std::collections::HashMap;

use thiserror::Error;

use crate::ontology::Entity;
use crate::ontology::EntityId;
use crate::ontology::EntityStatus;
use crate::primitives::LogicalTimestamp;

/// Errors raised by [`IdentityManager`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// An entity with this id is already registered.
    #[error("duplicate entity: {0}")]
    DuplicateEntity(EntityId),
    /// No entity with this id is registered.
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),
    /// The requested status transition is not legal (revoked is terminal).
    #[error("illegal status transition for entity {0}")]
    IllegalTransition(EntityId),
}

/// Registry of known [`Entity`] records.
///
/// Owned by the kernel's collaborators, not the Kernel itself — the Kernel
/// holds a non-owning reference to Identity.
#[derive(Debug, Default)]
pub struct IdentityManager {
    entities: HashMap<EntityId, Entity>,
}

impl IdentityManager {
    /// Creates an empty identity manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new entity.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::DuplicateEntity`] if `entity.id` is already
    /// registered.
    pub fn register(&mut self, entity: Entity) -> Result<(), IdentityError> {
        if self.entities.contains_key(&entity.id) {
            return Err(IdentityError::DuplicateEntity(entity.id));
        }
        self.entities.insert(entity.id.clone(), entity);
        Ok(())
    }

    /// Transitions an entity to `Revoked` and records `revoked_at`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::UnknownEntity`] if `id` is not registered,
    /// or [`IdentityError::IllegalTransition`] if the entity cannot legally
    /// reach `Revoked` (it already can, from any non-terminal status, so
    /// this only triggers when the entity is already revoked in a way that
    /// callers should treat as a no-op failure rather than silently
    /// succeed).
    pub fn revoke(&mut self, id: &EntityId, at: LogicalTimestamp) -> Result<(), IdentityError> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or_else(|| IdentityError::UnknownEntity(id.clone()))?;
        if !entity.status.can_transition_to(EntityStatus::Revoked) {
            return Err(IdentityError::IllegalTransition(id.clone()));
        }
        entity.status = EntityStatus::Revoked;
        entity.revoked_at = Some(at);
        Ok(())
    }

    /// Returns the entity registered under `id`, if any.
    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Returns whether an entity is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::EntityType;
    use crate::primitives::PrivateKey;
    use rand::rngs::OsRng;

    fn sample_entity(id: &str) -> Entity {
        let key = PrivateKey::generate(&mut OsRng);
        Entity {
            id: EntityId::new(id),
            public_key: key.public_key(),
            entity_type: EntityType::Actor,
            status: EntityStatus::Active,
            created_at: LogicalTimestamp::ZERO,
            identity_proof: "test".to_string(),
            revoked_at: None,
            root: false,
        }
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = IdentityManager::new();
        registry.register(sample_entity("alice")).unwrap();
        assert_eq!(
            registry.register(sample_entity("alice")),
            Err(IdentityError::DuplicateEntity(EntityId::new("alice")))
        );
    }

    #[test]
    fn revoke_is_terminal() {
        let mut registry = IdentityManager::new();
        registry.register(sample_entity("alice")).unwrap();
        registry.revoke(&EntityId::new("alice"), LogicalTimestamp::new(1, 0)).unwrap();
        assert!(registry.get(&EntityId::new("alice")).unwrap().is_revoked());
        assert_eq!(
            registry.revoke(&EntityId::new("alice"), LogicalTimestamp::new(2, 0)),
            Err(IdentityError::IllegalTransition(EntityId::new("alice")))
        );
    }

    #[test]
    fn unknown_entity_lookup_fails() {
        let registry = IdentityManager::new();
        assert!(registry.get(&EntityId::new("ghost")).is_none());
    }
}
