// governance-core/src/replay/mod.rs
// ============================================================================
// Module: Replay Engine
// Description: Reconstructs a Kernel's state and registered projections from
//              an audit log alone.
// Purpose: Component C9 — the only consumer of Evidence entries that bypasses
//          the Guard pipeline.
// Dependencies: crate::{audit, guards, kernel, ontology, primitives}
// ============================================================================

//! ## Overview
//! Replay re-derives every mutation a SUCCESS entry produced by re-running
//! the same protocol evaluation `Kernel::commit` ran originally, rather than
//! reading a stored mutation diff off the [`Evidence`] entry — an `Evidence`
//! only ever witnesses the originating [`Action`], matching what the audit
//! log actually persists. This is deterministic precisely because protocol
//! preconditions depend only on already-reconstructed state and the entry's
//! own timestamp, never on wall-clock time or external input.
//!
//! Dry-run validation and the Guard pipeline are both skipped: every entry
//! in the log was already accepted once, by the kernel instance that wrote
//! it.

use crate::audit::AuditLog;
use crate::guards::ErrorCode;
use crate::guards::GuardViolation;
use crate::kernel::Kernel;
use crate::ontology::Evidence;
use crate::ontology::EvidenceStatus;
use crate::ontology::Mutation;
use crate::primitives::HashDigest;

fn tip_action_id(log: &AuditLog) -> Option<crate::ontology::ActionId> {
    log.tip().map(|evidence| evidence.action.action_id.clone())
}

/// A read model fed one [`Evidence`] entry at a time during replay.
///
/// Implementations are expected to be cheap and infallible in the common
/// case; [`Projection::apply`] returns a `Result` only so a malformed or
/// unexpected entry can be reported without aborting the rest of replay.
pub trait Projection {
    /// Clears any accumulated state, called once before replay begins.
    fn reset(&mut self);

    /// Folds one entry into this projection's state, in log order.
    ///
    /// # Errors
    ///
    /// Returns a projection-specific failure description; the
    /// [`ProjectionEngine`] collects these without halting other
    /// projections or the kernel-state replay itself.
    fn apply(&mut self, evidence: &Evidence) -> Result<(), String>;
}

/// One projection's failure to fold a specific entry, collected by
/// [`ProjectionEngine::apply`] rather than raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionFailure {
    /// Index of the failing projection within [`ProjectionEngine`]'s
    /// registration order.
    pub projection_index: usize,
    /// The entry being applied when the failure occurred.
    pub evidence_id: crate::ontology::EvidenceId,
    /// The projection's own error message.
    pub message: String,
}

/// A registry of [`Projection`]s folded alongside kernel-state replay.
#[derive(Default)]
pub struct ProjectionEngine {
    projections: Vec<Box<dyn Projection>>,
}

impl ProjectionEngine {
    /// Creates an empty projection engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a projection. Order is preserved and determines each
    /// projection's index in any [`ProjectionFailure`] it raises.
    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    /// Resets every registered projection.
    pub fn reset_all(&mut self) {
        for projection in &mut self.projections {
            projection.reset();
        }
    }

    /// Folds `evidence` into every registered projection, collecting
    /// failures from any that reject it rather than stopping at the first.
    pub fn apply(&mut self, evidence: &Evidence) -> Vec<ProjectionFailure> {
        let mut failures = Vec::new();
        for (projection_index, projection) in self.projections.iter_mut().enumerate() {
            if let Err(message) = projection.apply(evidence) {
                failures.push(ProjectionFailure { projection_index, evidence_id: evidence.evidence_id, message });
            }
        }
        failures
    }
}

/// The outcome of a full replay pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    /// Total entries read from the log, regardless of status.
    pub entries_replayed: usize,
    /// Entries whose status was `SUCCESS` and were applied to state.
    pub mutations_applied: usize,
    /// Failures any registered projection reported, in log order.
    pub projection_failures: Vec<ProjectionFailure>,
    /// The reconstructed state model's final snapshot-chain tip hash.
    pub final_state_hash: HashDigest,
}

/// Rebuilds `kernel`'s replay memory and state model from `log`, folding
/// every entry into `projections` along the way.
///
/// `kernel` must already carry the same metric and protocol definitions the
/// log's entries were originally committed against — loading that catalog is
/// a bootstrap concern outside replay's scope.
///
/// After every entry has been folded, the reconstructed state snapshot
/// chain's tip `action_id` must equal `log`'s own tip `action_id`; this is
/// checked unconditionally, not only when a caller happens to ask for it.
///
/// # Errors
///
/// Returns [`ErrorCode::ReplayFailure`] if re-evaluating a `SUCCESS` entry's
/// protocol side effects conflicts (two triggered protocols targeting the
/// same metric), if applying its mutations is rejected by the state model,
/// or if the reconstructed tip's `action_id` does not match `log`'s tip
/// `action_id`.
pub fn replay(
    log: &AuditLog,
    kernel: &mut Kernel,
    projections: &mut ProjectionEngine,
) -> Result<ReplayReport, GuardViolation> {
    projections.reset_all();
    let mut projection_failures = Vec::new();
    let mut mutations_applied = 0usize;

    for evidence in log.get_history() {
        projection_failures.extend(projections.apply(evidence));
        kernel.mark_seen(evidence.action.action_id.clone());

        if evidence.status == EvidenceStatus::Success {
            let primary = Mutation::new(evidence.action.payload.metric_id.clone(), evidence.action.payload.value.clone());
            let side_effects = kernel
                .protocols()
                .evaluate(kernel.registry(), kernel.state(), evidence.timestamp, &primary)
                .map_err(|err| GuardViolation::new(ErrorCode::ReplayFailure, err.to_string()))?;

            let mut mutations = Vec::with_capacity(1 + side_effects.len());
            mutations.push(primary);
            mutations.extend(side_effects);

            kernel
                .replay_apply(&mutations, evidence.timestamp, &evidence.action.initiator, Some(evidence.action.action_id.clone()), evidence.evidence_id)
                .map_err(|err| GuardViolation::new(ErrorCode::ReplayFailure, err.to_string()))?;
            mutations_applied += 1;
        }
    }

    let final_state_hash = kernel.state().tip().hash;
    let reconstructed_tip_action_id = kernel.state().tip().action_id.clone();
    let log_tip_action_id = tip_action_id(log);
    if reconstructed_tip_action_id != log_tip_action_id {
        return Err(GuardViolation::new(
            ErrorCode::ReplayFailure,
            format!(
                "reconstructed tip action {:?} does not match log tip action {:?}",
                reconstructed_tip_action_id.map(|id| id.to_string()),
                log_tip_action_id.map(|id| id.to_string()),
            ),
        ));
    }

    Ok(ReplayReport {
        entries_replayed: log.get_history().len(),
        mutations_applied,
        projection_failures,
        final_state_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::identity::AuthorityEngine;
    use crate::identity::IdentityManager;
    use crate::metrics::MetricDefinition;
    use crate::metrics::MetricRegistry;
    use crate::metrics::MetricType;
    use crate::ontology::Action;
    use crate::ontology::ActionId;
    use crate::ontology::ActionPayload;
    use crate::ontology::Entity;
    use crate::ontology::EntityId;
    use crate::ontology::EntityStatus;
    use crate::ontology::EntityType;
    use crate::ontology::MetricId;
    use crate::ontology::MetricValue;
    use crate::primitives::Budget;
    use crate::primitives::LogicalTimestamp;
    use crate::primitives::PrivateKey;
    use crate::protocol::ProtocolEngine;
    use rand::rngs::OsRng;

    struct CountingProjection {
        seen: usize,
    }

    impl Projection for CountingProjection {
        fn reset(&mut self) {
            self.seen = 0;
        }

        fn apply(&mut self, _evidence: &Evidence) -> Result<(), String> {
            self.seen += 1;
            Ok(())
        }
    }

    fn build_kernel_with_key() -> (Kernel, PrivateKey) {
        let mut identities = IdentityManager::new();
        let alice_key = PrivateKey::generate(&mut OsRng);
        identities
            .register(Entity {
                id: EntityId::new("alice"),
                public_key: alice_key.public_key(),
                entity_type: EntityType::Actor,
                status: EntityStatus::Active,
                created_at: LogicalTimestamp::ZERO,
                identity_proof: "test".to_string(),
                revoked_at: None,
                root: true,
            })
            .unwrap();
        let mut registry = MetricRegistry::new();
        registry
            .register(MetricDefinition { id: MetricId::new("wealth"), metric_type: MetricType::Counter, unit: "credits".to_string() })
            .unwrap();
        let signing_key = PrivateKey::generate(&mut OsRng);
        let mut kernel = Kernel::new(identities, AuthorityEngine::new(), registry, AuditLog::new(), ProtocolEngine::new(), LogicalTimestamp::ZERO, signing_key);
        kernel.boot().unwrap();
        (kernel, alice_key)
    }

    fn signed_action(key: &PrivateKey, id: &str, value: i64, timestamp: LogicalTimestamp) -> Action {
        let mut action = Action {
            action_id: ActionId::new(id),
            initiator: EntityId::new("alice"),
            payload: ActionPayload { metric_id: MetricId::new("wealth"), value: MetricValue::from_i64(value), protocol_id: None },
            timestamp,
            expires_at: LogicalTimestamp::ZERO,
            signature: String::new(),
        };
        let message = action.signed_message().unwrap();
        let sig = key.sign(&message);
        action.signature = sig.iter().map(|b| format!("{b:02x}")).collect();
        action
    }

    #[test]
    fn replay_reconstructs_identical_tip_hash() {
        let (mut source, key) = build_kernel_with_key();
        let mut budget = Budget::new(1000);
        source.execute(EntityId::new("alice"), None, signed_action(&key, "aa", 10, LogicalTimestamp::new(1, 0)), 1, &mut budget).unwrap();
        source.execute(EntityId::new("alice"), None, signed_action(&key, "bb", 5, LogicalTimestamp::new(2, 0)), 1, &mut budget).unwrap();
        let source_tip = source.state().tip().hash;

        let (mut target, _key2) = build_kernel_with_key();
        let mut projections = ProjectionEngine::new();
        projections.register(Box::new(CountingProjection { seen: 0 }));
        let report = replay(source.audit(), &mut target, &mut projections).unwrap();

        assert_eq!(report.entries_replayed, 2);
        assert_eq!(report.mutations_applied, 2);
        assert!(report.projection_failures.is_empty());
        assert_eq!(report.final_state_hash, source_tip);
        assert_eq!(target.state().get(&MetricId::new("wealth")).unwrap().as_number().unwrap().as_i64(), Some(15));
    }

    #[test]
    fn replay_marks_rejected_actions_seen_without_mutating_state() {
        let (mut source, key) = build_kernel_with_key();
        let mut budget = Budget::new(1000);
        source.execute(EntityId::new("alice"), None, signed_action(&key, "aa", 10, LogicalTimestamp::new(1, 0)), 1, &mut budget).unwrap();
        let replayed = signed_action(&key, "aa", 10, LogicalTimestamp::new(2, 0));
        assert!(source.submit(EntityId::new("alice"), None, replayed, 1).is_err());

        let (mut target, _key2) = build_kernel_with_key();
        let mut projections = ProjectionEngine::new();
        let report = replay(source.audit(), &mut target, &mut projections).unwrap();
        assert_eq!(report.entries_replayed, 1);
        assert!(target.has_seen(&ActionId::new("aa")));
    }

    #[test]
    fn trailing_aborted_entry_leaves_tip_mismatched() {
        let (mut source, key) = build_kernel_with_key();
        let mut budget = Budget::new(1000);
        source.execute(EntityId::new("alice"), None, signed_action(&key, "aa", 10, LogicalTimestamp::new(1, 0)), 1, &mut budget).unwrap();
        // A COUNTER mutation driving "wealth" negative aborts after the
        // Guard pipeline, so it is still appended to the log as ABORTED
        // without ever touching the state snapshot chain.
        assert!(source.execute(EntityId::new("alice"), None, signed_action(&key, "bb", -20, LogicalTimestamp::new(2, 0)), 1, &mut budget).is_err());
        assert_eq!(source.audit().tip().unwrap().action.action_id, ActionId::new("bb"));

        let (mut target, _key2) = build_kernel_with_key();
        let mut projections = ProjectionEngine::new();
        let err = replay(source.audit(), &mut target, &mut projections).unwrap_err();
        assert_eq!(err.code, ErrorCode::ReplayFailure);
    }
}
