// governance-core/src/audit/event_store.rs
// ============================================================================
// Module: Event Store Port
// Description: The storage-backend seam `AuditLog` mirrors to, if any.
// Purpose: Component C10 — durability and ordering are delegated entirely to
//          the implementation; the core only requires append-after-advance.
// Dependencies: crate::ontology::evidence
// ============================================================================

//! ## Overview
//! `governance-core` ships no concrete [`EventStore`]; `governance-store-sqlite`
//! is one implementation proving the port is satisfiable. The in-memory
//! chain inside [`crate::audit::AuditLog`] is always authoritative during a
//! kernel's lifetime — the store is a mirror, not the source of truth for a
//! running kernel (it becomes the source of truth only across process
//! restarts, via the Replay Engine).

use thiserror::Error;

use crate::ontology::Evidence;

/// Errors a concrete [`EventStore`] implementation may surface.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The backend rejected or failed to perform the append.
    #[error("event store append failed: {0}")]
    AppendFailed(String),
    /// The backend failed to read back history.
    #[error("event store read failed: {0}")]
    ReadFailed(String),
}

/// A durable mirror of the audit chain.
///
/// Implementations decide their own ordering/durability guarantees;
/// `AuditLog` only requires that `append` preserves the order it was called
/// in and that `get_history`/`get_latest` reflect every successful
/// `append`.
pub trait EventStore {
    /// Persists one Evidence entry, called after the in-memory chain has
    /// already advanced past it.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::AppendFailed`] if the backend rejects the
    /// write.
    fn append(&mut self, evidence: &Evidence) -> Result<(), EventStoreError>;

    /// Returns the full persisted history, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::ReadFailed`] if the backend cannot be read.
    fn get_history(&self) -> Result<Vec<Evidence>, EventStoreError>;

    /// Returns the most recently persisted entry, if any.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::ReadFailed`] if the backend cannot be read.
    fn get_latest(&self) -> Result<Option<Evidence>, EventStoreError>;
}
