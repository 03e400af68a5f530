// governance-core/src/audit/log.rs
// ============================================================================
// Module: Audit Log
// Description: The in-memory, hash-linked chain of Evidence entries.
// Purpose: Component C5 — the tamper-evident record every replay is
//          reconstructed from.
// Dependencies: crate::{audit::event_store, ontology, primitives}, serde_json
// ============================================================================

//! ## Overview
//! `AuditLog` is the only place an [`Evidence`] entry is ever constructed
//! (outside of the Replay Engine reconstructing one verbatim from a store).
//! Once appended, an entry is never mutated — `append` returns an owned
//! clone, and nothing in this crate exposes a `&mut Evidence` into the
//! chain, which is how Rust expresses a deep-frozen requirement without a
//! runtime freeze mechanism.

use serde_json::Value;
use thiserror::Error;

use crate::audit::event_store::EventStore;
use crate::audit::event_store::EventStoreError;
use crate::ontology::Action;
use crate::ontology::Evidence;
use crate::ontology::EvidenceStatus;
use crate::ontology::evidence::EvidenceContent;
use crate::ontology::identifiers::EvidenceId;
use crate::primitives::HashError;
use crate::primitives::LogicalTimestamp;
use crate::primitives::hash_canonical_json;

/// Errors raised while appending to or verifying the audit log.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The new entry's content could not be canonicalized for hashing.
    #[error("evidence canonicalization failed: {0}")]
    Canonicalization(#[from] HashError),
    /// The mirrored event store rejected the append. The in-memory chain
    /// has already advanced at this point; the caller (the Kernel) must
    /// treat this as fatal and mark itself VIOLATED.
    #[error("event store append failed: {0}")]
    StoreAppendFailed(#[from] EventStoreError),
}

/// Computes the `evidenceId` a new entry would receive, without appending
/// it. Used by [`crate::kernel::Kernel::commit`] to know the id a snapshot's
/// `evidenceId` provenance field will carry before the entry itself is
/// appended.
///
/// # Errors
///
/// Returns [`HashError`] if the content cannot be canonicalized.
pub fn compute_evidence_id(
    previous_evidence_id: EvidenceId,
    action: &Action,
    status: EvidenceStatus,
    metadata: &Option<Value>,
) -> Result<EvidenceId, HashError> {
    let content = EvidenceContent { previous_evidence_id, action, status, metadata };
    hash_canonical_json(&content).map(EvidenceId::from_digest)
}

/// The append-only, hash-linked sequence of Evidence entries.
pub struct AuditLog {
    entries: Vec<Evidence>,
    store: Option<Box<dyn EventStore + Send>>,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("entries", &self.entries.len())
            .field("store", &self.store.is_some())
            .finish()
    }
}

impl AuditLog {
    /// Creates an empty audit log with no backing store.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new(), store: None }
    }

    /// Creates an audit log mirroring every append to `store`.
    #[must_use]
    pub fn with_store(store: Box<dyn EventStore + Send>) -> Self {
        Self { entries: Vec::new(), store: Some(store) }
    }

    /// Reconstructs an audit log from `entries` already known to be valid
    /// (e.g. `store.get_history()` after a restart), optionally continuing
    /// to mirror further appends to `store`. Does not re-append `entries`
    /// to `store` or re-derive their `evidenceId`s; callers that need to
    /// verify the loaded chain should call [`AuditLog::verify_integrity`]
    /// afterward.
    #[must_use]
    pub fn from_history(entries: Vec<Evidence>, store: Option<Box<dyn EventStore + Send>>) -> Self {
        Self { entries, store }
    }

    /// Appends a new entry witnessing `action`'s outcome, computing its
    /// `evidenceId` from the canonical composition of
    /// `(previousEvidenceId, action, status, metadata)`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Canonicalization`] if the entry cannot be
    /// hashed, or [`AuditError::StoreAppendFailed`] if a backing store
    /// rejects the mirrored write — in the latter case the in-memory chain
    /// has already advanced.
    pub fn append(
        &mut self,
        action: Action,
        status: EvidenceStatus,
        timestamp: LogicalTimestamp,
        metadata: Option<Value>,
    ) -> Result<Evidence, AuditError> {
        let previous_evidence_id = self.tip().map_or_else(EvidenceId::zero, |e| e.evidence_id);
        let evidence_id = compute_evidence_id(previous_evidence_id, &action, status, &metadata)?;
        let evidence = Evidence {
            evidence_id,
            previous_evidence_id,
            action,
            status,
            timestamp,
            metadata,
        };
        self.entries.push(evidence.clone());
        if let Some(store) = self.store.as_mut() {
            store.append(&evidence)?;
        }
        Ok(evidence)
    }

    /// Returns the full entry history, append order.
    #[must_use]
    pub fn get_history(&self) -> &[Evidence] {
        &self.entries
    }

    /// Returns the most recently appended entry, if any.
    #[must_use]
    pub fn tip(&self) -> Option<&Evidence> {
        self.entries.last()
    }

    /// Recomputes every entry's `evidenceId` and validates chain linkage.
    ///
    /// Returns `false` on the first mismatch rather than a typed error —
    /// this is a read-only integrity probe, not a fallible operation.
    #[must_use]
    pub fn verify_integrity(&self) -> bool {
        let mut expected_previous = EvidenceId::zero();
        for entry in &self.entries {
            if entry.previous_evidence_id != expected_previous {
                return false;
            }
            let content = EvidenceContent {
                previous_evidence_id: entry.previous_evidence_id,
                action: &entry.action,
                status: entry.status,
                metadata: &entry.metadata,
            };
            let Ok(digest) = hash_canonical_json(&content) else {
                return false;
            };
            if entry.evidence_id != EvidenceId::from_digest(digest) {
                return false;
            }
            expected_previous = entry.evidence_id;
        }
        true
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
