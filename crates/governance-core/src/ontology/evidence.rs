// governance-core/src/ontology/evidence.rs
// ============================================================================
// Module: Evidence
// Description: The immutable audit-log entry type.
// Purpose: Canonical Evidence value type; hashing and freezing live in
//          `crate::audit` which owns the chain itself.
// Dependencies: crate::{ontology::{identifiers, action}, primitives}, serde
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::ontology::action::Action;
use crate::ontology::identifiers::EvidenceId;
use crate::primitives::LogicalTimestamp;

/// The outcome an Evidence entry records for an Attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceStatus {
    /// The Attempt committed successfully.
    Success,
    /// A Guard rejected the Attempt.
    Reject,
    /// Commit's dry-run validation failed after acceptance.
    Aborted,
}

/// One immutable audit-log entry, hash-linked to its predecessor.
///
/// # Invariants
/// - `evidence_id = hash(previousEvidenceId || canonical(action) || status
///   || canonical(metadata))`.
/// - Deep-frozen once appended: [`crate::audit::AuditLog::append`] is the
///   only way to construct one outside of replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// This entry's content-derived identifier.
    pub evidence_id: EvidenceId,
    /// The preceding entry's identifier ([`EvidenceId::zero`] for the
    /// first entry).
    pub previous_evidence_id: EvidenceId,
    /// The action this entry witnesses.
    pub action: Action,
    /// The outcome recorded for the action's Attempt.
    pub status: EvidenceStatus,
    /// When this entry was appended.
    pub timestamp: LogicalTimestamp,
    /// Structured metadata (e.g. a rejection's error code and violation
    /// text); never carries raw signature or key material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// The fields an Evidence entry's identifier is hashed over, in order.
/// Kept as a distinct serializable shape so the canonical bytes used for
/// hashing never drift from the entry's own serialization.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct EvidenceContent<'a> {
    pub previous_evidence_id: EvidenceId,
    pub action: &'a Action,
    pub status: EvidenceStatus,
    pub metadata: &'a Option<Value>,
}
