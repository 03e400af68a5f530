// governance-core/src/kernel/engine.rs
// ============================================================================
// Module: Kernel
// Description: The two-phase attempt/commit transaction and kernel lifecycle.
// Purpose: Component C7 — the single-writer orchestrator wiring every other
//          collaborator together.
// Dependencies: crate::{audit, guards, identity, metrics, ontology, primitives,
//               protocol, kernel::{attempt, lifecycle}}, serde_json
// ============================================================================

//! ## Overview
//! `Kernel` owns its collaborators outright rather than holding non-owning
//! references to them: Rust's ownership model already gives a single
//! `Kernel` instance exclusive, statically-checked access to its
//! `IdentityManager`, `AuthorityEngine`, `MetricRegistry`, `StateModel`,
//! `AuditLog`, and `ProtocolEngine` without runtime reference bookkeeping —
//! a second `Kernel` instance simply cannot alias any of it.
//!
//! Every fallible operation here returns [`GuardViolation`] — the error-code
//! taxonomy is declared once in [`crate::guards`] and shared by Guard
//! rejections, commit aborts, and fatal kernel errors, so the Kernel reuses
//! that type rather than introducing a parallel one.

use std::collections::HashMap;
use std::collections::HashSet;

use serde_json::json;

use crate::audit::AuditLog;
use crate::audit::compute_evidence_id;
use crate::guards::ErrorCode;
use crate::guards::GuardOutcome;
use crate::guards::GuardViolation;
use crate::guards::budget;
use crate::guards::invariant;
use crate::guards::replay;
use crate::guards::scope;
use crate::guards::signature;
use crate::guards::time;
use crate::identity::AuthorityEngine;
use crate::identity::IdentityManager;
use crate::kernel::attempt::Attempt;
use crate::kernel::attempt::AttemptStatus;
use crate::kernel::lifecycle::KernelLifecycle;
use crate::metrics::MetricRegistry;
use crate::metrics::StateError;
use crate::metrics::StateModel;
use crate::ontology::Action;
use crate::ontology::ActionId;
use crate::ontology::ActionPayload;
use crate::ontology::AttemptId;
use crate::ontology::Capability;
use crate::ontology::Delegation;
use crate::ontology::Entity;
use crate::ontology::EntityId;
use crate::ontology::EvidenceStatus;
use crate::ontology::MetricId;
use crate::ontology::MetricValue;
use crate::ontology::Mutation;
use crate::ontology::ProtocolId;
use crate::ontology::ProtocolLifecycle;
use crate::primitives::Budget;
use crate::primitives::HashDigest;
use crate::primitives::LogicalTimestamp;
use crate::primitives::PrivateKey;
use crate::primitives::PublicKey;
use crate::primitives::canonical_json_bytes;
use crate::primitives::hash_bytes;
use crate::protocol::ProtocolEngine;
use crate::protocol::ProtocolError;

/// The entity id the Kernel signs its own governance evidence under.
const KERNEL_ENTITY_ID: &str = "__kernel__";

/// The receipt returned by a successful [`Kernel::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// The committed Attempt's id.
    pub attempt_id: AttemptId,
    /// The Action's own timestamp.
    pub timestamp: LogicalTimestamp,
    /// The resulting snapshot chain tip's content hash.
    pub new_state_hash: HashDigest,
    /// Always [`AttemptStatus::Committed`] on success.
    pub status: AttemptStatus,
}

/// The governance kernel: single-writer orchestrator of identity, authority,
/// metrics, protocols, and the audit log across the two-phase commit.
///
/// Constructing a `Kernel` is itself the `UNINITIALIZED -> CONSTITUTED`
/// transition; there is no separate constitution step to call.
pub struct Kernel {
    lifecycle: KernelLifecycle,
    identities: IdentityManager,
    authority: AuthorityEngine,
    registry: MetricRegistry,
    state: StateModel,
    audit: AuditLog,
    protocols: ProtocolEngine,
    attempts: HashMap<AttemptId, Attempt>,
    seen_actions: HashSet<ActionId>,
    last_timestamp: LogicalTimestamp,
    signing_key: PrivateKey,
    governance_sequence: u64,
}

impl Kernel {
    /// Constitutes a new kernel from its collaborators, seeding the state
    /// model's genesis snapshot at `genesis_timestamp`.
    ///
    /// `signing_key` is the Kernel's own Ed25519 identity, used to sign
    /// governance evidence for which there is no external caller-supplied
    /// Action, signed with the kernel's own key rather than a placeholder
    /// signature.
    #[must_use]
    pub fn new(
        identities: IdentityManager,
        authority: AuthorityEngine,
        registry: MetricRegistry,
        audit: AuditLog,
        protocols: ProtocolEngine,
        genesis_timestamp: LogicalTimestamp,
        signing_key: PrivateKey,
    ) -> Self {
        Self {
            lifecycle: KernelLifecycle::Constituted,
            identities,
            authority,
            registry,
            state: StateModel::new(genesis_timestamp),
            audit,
            protocols,
            attempts: HashMap::new(),
            seen_actions: HashSet::new(),
            last_timestamp: genesis_timestamp,
            signing_key,
            governance_sequence: 0,
        }
    }

    /// Transitions `CONSTITUTED -> ACTIVE` or `RECOVERED -> ACTIVE`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::StateTransitionFailed`] from any other lifecycle
    /// state.
    pub fn boot(&mut self) -> Result<(), GuardViolation> {
        if !self.lifecycle.can_transition_to(KernelLifecycle::Active) {
            return Err(GuardViolation::new(
                ErrorCode::StateTransitionFailed,
                format!("cannot boot from {:?}", self.lifecycle),
            ));
        }
        self.lifecycle = KernelLifecycle::Active;
        Ok(())
    }

    /// Transitions `ACTIVE -> SUSPENDED`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::StateTransitionFailed`] if not currently ACTIVE.
    pub fn suspend(&mut self) -> Result<(), GuardViolation> {
        self.transition_lifecycle(KernelLifecycle::Suspended)
    }

    /// Transitions `ACTIVE|SUSPENDED -> DISSOLVED`, a terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::StateTransitionFailed`] if neither ACTIVE nor
    /// SUSPENDED.
    pub fn dissolve(&mut self) -> Result<(), GuardViolation> {
        self.transition_lifecycle(KernelLifecycle::Dissolved)
    }

    fn transition_lifecycle(&mut self, next: KernelLifecycle) -> Result<(), GuardViolation> {
        if !self.lifecycle.can_transition_to(next) {
            return Err(GuardViolation::new(
                ErrorCode::StateTransitionFailed,
                format!("cannot transition from {:?} to {next:?}", self.lifecycle),
            ));
        }
        self.lifecycle = next;
        Ok(())
    }

    /// Remediates a `VIOLATED` kernel to `RECOVERED`, appending a governance
    /// evidence entry describing the remediation. `boot()` must still be
    /// called before the kernel accepts further Attempts. How `RECOVERED`
    /// is reached is otherwise unconstrained; this path is root-gated since
    /// it lifts a fatal-error bar.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::StateTransitionFailed`] unless the kernel is
    /// `VIOLATED`, [`ErrorCode::UnknownEntity`] if `actor` is not registered,
    /// or [`ErrorCode::OverscopeAttempt`] if `actor` is not root.
    pub fn recover(
        &mut self,
        actor: &EntityId,
        evidence_of_remediation: String,
        now: LogicalTimestamp,
    ) -> Result<(), GuardViolation> {
        if self.lifecycle != KernelLifecycle::Violated {
            return Err(GuardViolation::new(
                ErrorCode::StateTransitionFailed,
                "recover is only callable from VIOLATED",
            ));
        }
        let entity = self
            .identities
            .get(actor)
            .ok_or_else(|| GuardViolation::new(ErrorCode::UnknownEntity, actor.to_string()))?;
        if !entity.root {
            return Err(GuardViolation::new(ErrorCode::OverscopeAttempt, "recover requires a root-capability actor"));
        }
        let action = self.sign_governance_action("KERNEL.RECOVER", evidence_of_remediation, now)?;
        self.audit
            .append(action, EvidenceStatus::Success, now, None)
            .map_err(|err| GuardViolation::new(ErrorCode::IntegrityBreach, err.to_string()))?;
        self.lifecycle = KernelLifecycle::Recovered;
        Ok(())
    }

    /// Returns the current kernel lifecycle state.
    #[must_use]
    pub const fn lifecycle(&self) -> KernelLifecycle {
        self.lifecycle
    }

    /// Returns the Kernel's own Ed25519 public key, for verifying the
    /// signature on governance evidence it produced.
    #[must_use]
    pub fn signing_public_key(&self) -> PublicKey {
        self.signing_key.public_key()
    }

    /// Returns the current state model.
    #[must_use]
    pub const fn state(&self) -> &StateModel {
        &self.state
    }

    /// Returns the audit log.
    #[must_use]
    pub const fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Returns the metric registry.
    #[must_use]
    pub const fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Returns the protocol engine.
    #[must_use]
    pub const fn protocols(&self) -> &ProtocolEngine {
        &self.protocols
    }

    /// Returns a mutable reference to the protocol engine, for registering
    /// protocols (`propose`/`ratify`/`activate`/`load_bundle`) outside the
    /// Attempt pipeline.
    pub fn protocols_mut(&mut self) -> &mut ProtocolEngine {
        &mut self.protocols
    }

    /// Returns the identity manager.
    #[must_use]
    pub const fn identities(&self) -> &IdentityManager {
        &self.identities
    }

    /// Returns the authority engine.
    #[must_use]
    pub const fn authority(&self) -> &AuthorityEngine {
        &self.authority
    }

    /// Returns whether `action_id` has already been recorded as seen, either
    /// via a committed Attempt or via [`Kernel::mark_seen`] during replay.
    #[must_use]
    pub fn has_seen(&self, action_id: &ActionId) -> bool {
        self.seen_actions.contains(action_id)
    }

    /// Records `action_id` as seen without running the Guard pipeline,
    /// restoring replay memory.
    pub fn mark_seen(&mut self, action_id: ActionId) {
        self.seen_actions.insert(action_id);
    }

    /// Applies `mutations` directly to the state model, bypassing Guards —
    /// replay trusts entries already validated when first written. Used
    /// only by the Replay Engine.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the mutations are malformed; this should
    /// never occur for entries the Guard pipeline already accepted.
    pub fn replay_apply(
        &mut self,
        mutations: &[Mutation],
        timestamp: LogicalTimestamp,
        actor: &EntityId,
        action_id: Option<ActionId>,
        evidence_id: crate::ontology::EvidenceId,
    ) -> Result<(), StateError> {
        self.state.apply_trusted(&self.registry, mutations, timestamp, actor, action_id, evidence_id)?;
        self.last_timestamp = timestamp;
        Ok(())
    }

    fn require_active(&self) -> Result<(), GuardViolation> {
        if self.lifecycle == KernelLifecycle::Active {
            Ok(())
        } else {
            Err(GuardViolation::new(ErrorCode::KernelNotActive, format!("kernel is {:?}, not ACTIVE", self.lifecycle)))
        }
    }

    fn violate(&mut self, code: ErrorCode, reason: impl Into<String>) -> GuardViolation {
        self.lifecycle = KernelLifecycle::Violated;
        GuardViolation::new(code, reason)
    }

    /// Creates a `PENDING` Attempt from `action`, using `action.action_id`
    /// as the Attempt id.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::KernelNotActive`] if not ACTIVE, or
    /// [`ErrorCode::ReplayDetected`] if an Attempt with this id already
    /// exists.
    pub fn submit(
        &mut self,
        actor: EntityId,
        protocol_id: Option<ProtocolId>,
        action: Action,
        cost: u64,
    ) -> Result<AttemptId, GuardViolation> {
        self.require_active()?;
        let attempt_id = action.action_id.clone();
        if self.attempts.contains_key(&attempt_id) {
            return Err(GuardViolation::new(ErrorCode::ReplayDetected, format!("attempt already exists for action {attempt_id}")));
        }
        let timestamp = action.timestamp;
        self.attempts.insert(
            attempt_id.clone(),
            Attempt { id: attempt_id.clone(), actor, protocol_id, intent: action, cost, timestamp, status: AttemptStatus::Pending },
        );
        Ok(attempt_id)
    }

    /// Runs the Guard pipeline in order — Signature, Invariant, Replay,
    /// Time, Scope, Protocol-registered — against a `PENDING` Attempt.
    ///
    /// On the first failure the Attempt moves to `REJECTED` and a `REJECT`
    /// evidence entry is appended with the violation in its metadata; on
    /// success the Attempt moves to `ACCEPTED`.
    ///
    /// # Errors
    ///
    /// Returns the first [`GuardViolation`] encountered, or
    /// [`ErrorCode::AttemptNotFound`]/[`ErrorCode::StateTransitionFailed`]
    /// if `attempt_id` does not name a `PENDING` Attempt.
    pub fn guard(&mut self, attempt_id: &AttemptId) -> GuardOutcome {
        self.require_active()?;
        let (actor, internal, action, protocol_id) = {
            let attempt = self
                .attempts
                .get(attempt_id)
                .ok_or_else(|| GuardViolation::new(ErrorCode::AttemptNotFound, attempt_id.to_string()))?;
            if attempt.status != AttemptStatus::Pending {
                return Err(GuardViolation::new(ErrorCode::StateTransitionFailed, format!("attempt {attempt_id} is not PENDING")));
            }
            (attempt.actor.clone(), attempt.intent.signature == Action::TRUSTED_SIGNATURE, attempt.intent.clone(), attempt.protocol_id.clone())
        };

        let outcome = self.run_guard_pipeline(&action, &actor, internal, protocol_id.as_ref());
        let timestamp = action.timestamp;

        if let Err(violation) = &outcome {
            let metadata = json!({ "code": violation.code, "reason": violation.reason });
            if let Err(err) = self.audit.append(action, EvidenceStatus::Reject, timestamp, Some(metadata)) {
                return Err(self.violate(ErrorCode::IntegrityBreach, err.to_string()));
            }
        }

        let next_status = if outcome.is_ok() { AttemptStatus::Accepted } else { AttemptStatus::Rejected };
        // The Attempt is guaranteed present: the single-writer model means
        // nothing can remove it between the lookup above and here.
        if let Some(attempt) = self.attempts.get_mut(attempt_id) {
            attempt.status = next_status;
        }

        outcome
    }

    fn run_guard_pipeline(
        &self,
        action: &Action,
        actor: &EntityId,
        internal: bool,
        protocol_id: Option<&ProtocolId>,
    ) -> GuardOutcome {
        signature::check(action, &self.identities, internal)?;
        invariant::check(action)?;
        replay::check(&action.action_id, &self.seen_actions)?;
        time::check(action, self.last_timestamp, action.timestamp)?;
        let actor_entity = self
            .identities
            .get(actor)
            .ok_or_else(|| GuardViolation::new(ErrorCode::UnknownEntity, actor.to_string()))?;
        scope::check(action, actor, actor_entity.root, &self.authority, action.timestamp)?;
        if let Some(protocol_id) = protocol_id {
            let protocol = self
                .protocols
                .get(protocol_id)
                .ok_or_else(|| GuardViolation::new(ErrorCode::ProtocolNotFound, protocol_id.to_string()))?;
            if protocol.lifecycle != ProtocolLifecycle::Active {
                return Err(GuardViolation::new(ErrorCode::ProtocolNotActive, protocol_id.to_string()));
            }
        }
        Ok(())
    }

    /// Commits an `ACCEPTED` Attempt: runs the Budget Guard, evaluates
    /// triggered protocol side effects, dry-run validates every mutation,
    /// consumes the budget, applies all mutations in one snapshot, and
    /// appends a `SUCCESS` evidence entry.
    ///
    /// Any failure after budget consumption (step 6) transitions the kernel
    /// to `VIOLATED` and returns [`ErrorCode::IntegrityBreach`] — the
    /// region from consumption through evidence append must leave no
    /// partial snapshot or budget spend behind.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::BudgetExceeded`] (Attempt remains `ACCEPTED`,
    /// retryable), [`ErrorCode::ProtocolViolation`] or
    /// [`ErrorCode::CommitFailed`] (Attempt moves to `ABORTED`, state
    /// untouched), or [`ErrorCode::IntegrityBreach`] (fatal).
    pub fn commit(&mut self, attempt_id: &AttemptId, budget: &mut Budget) -> Result<CommitReceipt, GuardViolation> {
        self.require_active()?;
        let (actor, intent, cost) = {
            let attempt = self
                .attempts
                .get(attempt_id)
                .ok_or_else(|| GuardViolation::new(ErrorCode::AttemptNotFound, attempt_id.to_string()))?;
            if attempt.status != AttemptStatus::Accepted {
                return Err(GuardViolation::new(ErrorCode::StateTransitionFailed, format!("attempt {attempt_id} is not ACCEPTED")));
            }
            (attempt.actor.clone(), attempt.intent.clone(), attempt.cost)
        };

        // Step 1: Budget Guard. Exhaustion is a local rejection; the
        // Attempt stays ACCEPTED and nothing below has run yet.
        budget::check(budget, cost)?;

        let timestamp = intent.timestamp;
        let primary = Mutation::new(intent.payload.metric_id.clone(), intent.payload.value.clone());

        // Step 3: protocol side effects.
        let side_effects = match self.protocols.evaluate(&self.registry, &self.state, timestamp, &primary) {
            Ok(effects) => effects,
            Err(ProtocolError::ProtocolViolation(metric_id)) => {
                let reason = format!("protocol violation on metric {metric_id}");
                return self.abort_attempt(attempt_id, intent, timestamp, ErrorCode::ProtocolViolation, reason);
            }
            Err(err @ ProtocolError::UnevaluablePrecondition(_)) => {
                return self.abort_attempt(attempt_id, intent, timestamp, ErrorCode::ProtocolViolation, err.to_string());
            }
            Err(other) => return self.abort_attempt(attempt_id, intent, timestamp, ErrorCode::CommitFailed, other.to_string()),
        };

        let mut mutations = Vec::with_capacity(1 + side_effects.len());
        mutations.push(primary);
        mutations.extend(side_effects);

        // Step 5: dry-run validation. Any failure aborts the whole batch;
        // budget and state remain untouched.
        for mutation in &mutations {
            if let Err(err) = self.state.validate_mutation(&self.registry, mutation) {
                let code = state_error_code(&err);
                return self.abort_attempt(attempt_id, intent, timestamp, code, err.to_string());
            }
        }

        // Step 6: consume budget. Everything from here on must succeed or
        // the kernel is VIOLATED.
        budget.consume(cost);

        let previous_evidence_id = self.audit.tip().map_or_else(crate::ontology::EvidenceId::zero, |e| e.evidence_id);
        let evidence_id = match compute_evidence_id(previous_evidence_id, &intent, EvidenceStatus::Success, &None) {
            Ok(id) => id,
            Err(err) => return Err(self.violate(ErrorCode::IntegrityBreach, err.to_string())),
        };

        // Step 7: apply all mutations as a single new snapshot.
        let snapshot = match self.state.apply_trusted(
            &self.registry,
            &mutations,
            timestamp,
            &actor,
            Some(intent.action_id.clone()),
            evidence_id,
        ) {
            Ok(snapshot) => snapshot,
            Err(err) => return Err(self.violate(ErrorCode::IntegrityBreach, err.to_string())),
        };
        let new_state_hash = snapshot.hash;

        // seenActions is updated before the SUCCESS evidence is appended,
        // so a crash-then-replay cannot re-admit the action.
        self.seen_actions.insert(intent.action_id.clone());

        // Step 9: append SUCCESS evidence.
        if let Err(err) = self.audit.append(intent, EvidenceStatus::Success, timestamp, None) {
            return Err(self.violate(ErrorCode::IntegrityBreach, err.to_string()));
        }

        // Step 10.
        self.last_timestamp = timestamp;
        if let Some(attempt) = self.attempts.get_mut(attempt_id) {
            attempt.status = AttemptStatus::Committed;
        }

        Ok(CommitReceipt { attempt_id: attempt_id.clone(), timestamp, new_state_hash, status: AttemptStatus::Committed })
    }

    fn abort_attempt(
        &mut self,
        attempt_id: &AttemptId,
        action: Action,
        timestamp: LogicalTimestamp,
        code: ErrorCode,
        reason: String,
    ) -> Result<CommitReceipt, GuardViolation> {
        let metadata = json!({ "code": code, "reason": reason });
        if let Err(err) = self.audit.append(action, EvidenceStatus::Aborted, timestamp, Some(metadata)) {
            return Err(self.violate(ErrorCode::IntegrityBreach, err.to_string()));
        }
        if let Some(attempt) = self.attempts.get_mut(attempt_id) {
            attempt.status = AttemptStatus::Aborted;
        }
        Err(GuardViolation::new(code, reason))
    }

    /// Convenience wrapper: `submit` + `guard` + `commit`. Since [`Kernel::guard`]
    /// already returns the specific [`GuardViolation`] on rejection, there is
    /// no separate re-run step to recover the violation code from.
    ///
    /// # Errors
    ///
    /// Returns whichever stage's [`GuardViolation`] first fails.
    pub fn execute(
        &mut self,
        actor: EntityId,
        protocol_id: Option<ProtocolId>,
        action: Action,
        cost: u64,
        budget: &mut Budget,
    ) -> Result<CommitReceipt, GuardViolation> {
        let attempt_id = self.submit(actor, protocol_id, action, cost)?;
        self.guard(&attempt_id)?;
        self.commit(&attempt_id, budget)
    }

    fn require_capability(&self, caller: &EntityId, capability: &Capability, now: LogicalTimestamp) -> Result<(), GuardViolation> {
        let entity = self
            .identities
            .get(caller)
            .ok_or_else(|| GuardViolation::new(ErrorCode::UnknownEntity, caller.to_string()))?;
        if entity.is_revoked() {
            return Err(GuardViolation::new(ErrorCode::RevokedEntity, caller.to_string()));
        }
        if self.authority.authorized(caller, capability, entity.root, "*", now, &std::collections::BTreeMap::new()) {
            Ok(())
        } else {
            Err(GuardViolation::new(ErrorCode::OverscopeAttempt, capability.to_string()))
        }
    }

    /// Registers a new entity, gated on the caller holding
    /// `GOVERNANCE:IDENTITY.CREATE`. Not routed through the Attempt
    /// pipeline: it mutates identity rather than a metric.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::KernelNotActive`], [`ErrorCode::OverscopeAttempt`],
    /// or [`ErrorCode::StateTransitionFailed`] wrapping a duplicate entity.
    pub fn create_identity(&mut self, caller: &EntityId, entity: Entity, now: LogicalTimestamp) -> Result<(), GuardViolation> {
        self.require_active()?;
        self.require_capability(caller, &Capability::new("GOVERNANCE:IDENTITY.CREATE"), now)?;
        let entity_id = entity.id.clone();
        self.identities
            .register(entity)
            .map_err(|err| GuardViolation::new(ErrorCode::StateTransitionFailed, err.to_string()))?;
        self.append_governance_evidence("IDENTITY.CREATE", entity_id.to_string(), now)
    }

    /// Records a capability delegation, gated on the caller holding
    /// `GOVERNANCE:DELEGATION.GRANT`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::KernelNotActive`], [`ErrorCode::OverscopeAttempt`],
    /// [`ErrorCode::UnknownEntity`] if the delegation's granter is not
    /// registered, or a mapped [`AuthorityError`](crate::identity::AuthorityError).
    pub fn grant_delegation(&mut self, caller: &EntityId, delegation: Delegation, now: LogicalTimestamp) -> Result<(), GuardViolation> {
        self.require_active()?;
        self.require_capability(caller, &Capability::new("GOVERNANCE:DELEGATION.GRANT"), now)?;
        let granter = delegation.granter.clone();
        let grantee = delegation.grantee.clone();
        let granter_entity = self
            .identities
            .get(&granter)
            .ok_or_else(|| GuardViolation::new(ErrorCode::UnknownEntity, granter.to_string()))?;
        let granter_public_key = granter_entity.public_key;
        let granter_is_root = granter_entity.root;
        self.authority
            .grant(delegation, &granter_public_key, granter_is_root)
            .map_err(map_authority_error)?;
        self.append_governance_evidence("DELEGATION.GRANT", grantee.to_string(), now)
    }

    /// Revokes an entity, gated on the caller holding
    /// `GOVERNANCE:IDENTITY.REVOKE`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::KernelNotActive`], [`ErrorCode::OverscopeAttempt`],
    /// or [`ErrorCode::StateTransitionFailed`] if `target` is unknown or
    /// already revoked.
    pub fn revoke_identity(&mut self, caller: &EntityId, target: &EntityId, now: LogicalTimestamp) -> Result<(), GuardViolation> {
        self.require_active()?;
        self.require_capability(caller, &Capability::new("GOVERNANCE:IDENTITY.REVOKE"), now)?;
        self.identities
            .revoke(target, now)
            .map_err(|err| GuardViolation::new(ErrorCode::StateTransitionFailed, err.to_string()))?;
        self.append_governance_evidence("IDENTITY.REVOKE", target.to_string(), now)
    }

    fn append_governance_evidence(&mut self, verb: &str, detail: String, now: LogicalTimestamp) -> Result<(), GuardViolation> {
        let action = self.sign_governance_action(verb, detail, now)?;
        self.audit
            .append(action, EvidenceStatus::Success, now, None)
            .map_err(|err| self.violate(ErrorCode::IntegrityBreach, err.to_string()))?;
        Ok(())
    }

    /// Builds and signs a governance Action under the Kernel's own key.
    /// `action_id` is derived from a content hash rather than caller input,
    /// so governance evidence needs no externally-supplied identifier.
    fn sign_governance_action(&mut self, verb: &str, detail: String, timestamp: LogicalTimestamp) -> Result<Action, GuardViolation> {
        self.governance_sequence += 1;
        let payload = ActionPayload {
            metric_id: MetricId::new(format!("__governance__:{verb}")),
            value: MetricValue::Text(detail),
            protocol_id: None,
        };
        let seed_bytes = canonical_json_bytes(&(verb, timestamp, self.governance_sequence))
            .map_err(|err| GuardViolation::new(ErrorCode::IntegrityBreach, err.to_string()))?;
        let action_id = ActionId::new(hash_bytes(&seed_bytes).to_hex());
        let mut action = Action {
            action_id,
            initiator: EntityId::new(KERNEL_ENTITY_ID),
            payload,
            timestamp,
            expires_at: LogicalTimestamp::ZERO,
            signature: String::new(),
        };
        let message = action
            .signed_message()
            .map_err(|err| GuardViolation::new(ErrorCode::IntegrityBreach, err.to_string()))?;
        action.signature = hex_encode(&self.signing_key.sign(&message));
        Ok(action)
    }
}

fn state_error_code(err: &StateError) -> ErrorCode {
    match err {
        StateError::NonFinite(_) => ErrorCode::NonFiniteMetric,
        StateError::CounterNegative(_) => ErrorCode::NegativeBalance,
        StateError::UnregisteredMetric(_) | StateError::ValidatorRejected(_) | StateError::Canonicalization(_) => {
            ErrorCode::CommitFailed
        }
    }
}

fn map_authority_error(err: crate::identity::AuthorityError) -> GuardViolation {
    use crate::identity::AuthorityError;
    let code = match err {
        AuthorityError::SelfDelegation => ErrorCode::SelfDelegation,
        AuthorityError::SignatureInvalid => ErrorCode::SignatureInvalid,
        AuthorityError::CapabilityWidening => ErrorCode::OverscopeAttempt,
        AuthorityError::Canonicalization(_) => ErrorCode::IntegrityBreach,
    };
    GuardViolation::new(code, err.to_string())
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
