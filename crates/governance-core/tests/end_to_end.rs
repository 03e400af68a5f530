// governance-core/tests/end_to_end.rs
// ============================================================================
// Module: End-to-End Kernel Scenarios
// Description: Full-lifecycle scenarios spanning identity, metrics, guards,
//              protocol side effects, budgets, bundle verification, and
//              replay reconstruction across two independent kernels.
// Purpose: Exercise the kernel the way an embedder actually would, not just
//          one component at a time.
// Dependencies: governance-core, rand
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use governance_core::Action;
use governance_core::ActionId;
use governance_core::ActionPayload;
use governance_core::AuditLog;
use governance_core::AuthorityEngine;
use governance_core::Budget;
use governance_core::Entity;
use governance_core::EntityId;
use governance_core::EntityStatus;
use governance_core::EntityType;
use governance_core::ErrorCode;
use governance_core::IdentityManager;
use governance_core::Kernel;
use governance_core::LogicalTimestamp;
use governance_core::MetricDefinition;
use governance_core::MetricRegistry;
use governance_core::MetricType;
use governance_core::MetricValue;
use governance_core::PrivateKey;
use governance_core::Protocol;
use governance_core::ProtocolBundle;
use governance_core::ProtocolEngine;
use governance_core::ProtocolError;
use governance_core::ProtocolId;
use governance_core::ProtocolLifecycle;
use governance_core::ProjectionEngine;
use governance_core::ontology::BundleOwner;
use governance_core::ontology::Execution;
use governance_core::ontology::Precondition;
use governance_core::primitives::hash_canonical_json;
use governance_core::protocol::BundleError;
use governance_core::replay;
use rand::rngs::OsRng;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

fn root_entity(id: &str, key: &PrivateKey) -> Entity {
    Entity {
        id: EntityId::new(id),
        public_key: key.public_key(),
        entity_type: EntityType::Actor,
        status: EntityStatus::Active,
        created_at: LogicalTimestamp::ZERO,
        identity_proof: "test".to_string(),
        revoked_at: None,
        root: true,
    }
}

fn signed_action(key: &PrivateKey, id: &str, metric: &str, value: i64, protocol_id: Option<ProtocolId>, timestamp: LogicalTimestamp) -> Action {
    let mut action = Action {
        action_id: ActionId::new(id),
        initiator: EntityId::new("alice"),
        payload: ActionPayload { metric_id: governance_core::MetricId::new(metric), value: MetricValue::from_i64(value), protocol_id },
        timestamp,
        expires_at: LogicalTimestamp::ZERO,
        signature: String::new(),
    };
    let message = action.signed_message().expect("canonicalize action payload");
    action.signature = hex_encode(&key.sign(&message));
    action
}

fn active_protocol(id: &str, target_metric: &str, increment: i64) -> Protocol {
    Protocol {
        id: ProtocolId::new(id),
        name: format!("protocol-{id}"),
        version: "1.0.0".to_string(),
        category: "test".to_string(),
        lifecycle: ProtocolLifecycle::Active,
        strict: false,
        preconditions: vec![Precondition::Always],
        execution: vec![Execution::MutateMetric {
            metric_id: governance_core::MetricId::new(target_metric),
            mutation: MetricValue::from_i64(increment),
        }],
    }
}

/// Builds and signs a one-protocol bundle owned by `owner_key`.
fn signed_bundle(owner_id: &str, owner_key: &PrivateKey, protocols: Vec<Protocol>) -> ProtocolBundle {
    let owner = BundleOwner { entity_id: EntityId::new(owner_id), public_key: owner_key.public_key().to_bytes().to_vec() };
    let content = governance_core::ontology::protocol::BundleContent { protocols: &protocols, owner: &owner };
    let bundle_id = hash_canonical_json(&content).expect("canonicalize bundle content");
    let bundle_id_string = governance_core::BundleId::from_digest(bundle_id).to_string();
    let signature = hex_encode(&owner_key.sign(bundle_id_string.as_bytes()));
    ProtocolBundle { bundle_id: bundle_id_string, protocols, owner, signature }
}

/// Registers `alice` (root), `wealth`/`reputation` counters, and boots a
/// kernel with no protocols loaded yet.
fn build_kernel(alice_key: &PrivateKey) -> Kernel {
    let mut identities = IdentityManager::new();
    identities.register(root_entity("alice", alice_key)).expect("register alice");

    let mut registry = MetricRegistry::new();
    registry
        .register(MetricDefinition { id: governance_core::MetricId::new("wealth"), metric_type: MetricType::Counter, unit: "credits".to_string() })
        .expect("register wealth");
    registry
        .register(MetricDefinition { id: governance_core::MetricId::new("reputation"), metric_type: MetricType::Counter, unit: "points".to_string() })
        .expect("register reputation");

    let signing_key = PrivateKey::generate(&mut OsRng);
    let mut kernel = Kernel::new(identities, AuthorityEngine::new(), registry, AuditLog::new(), ProtocolEngine::new(), LogicalTimestamp::ZERO, signing_key);
    kernel.boot().expect("boot kernel");
    kernel
}

// ============================================================================
// SECTION: Scenario 1 — Happy path
// ============================================================================

#[test]
fn happy_path_commits_and_chains_evidence() {
    let alice_key = PrivateKey::generate(&mut OsRng);
    let mut kernel = build_kernel(&alice_key);

    let action = signed_action(&alice_key, "a1", "wealth", 100, None, LogicalTimestamp::new(1, 0));
    let mut budget = Budget::new(100);
    let receipt = kernel.execute(EntityId::new("alice"), None, action, 1, &mut budget).expect("commit succeeds");

    assert_eq!(receipt.status, governance_core::AttemptStatus::Committed);
    assert_eq!(kernel.state().get(&governance_core::MetricId::new("wealth")).unwrap().as_number().unwrap().as_i64(), Some(100));
    assert_eq!(kernel.state().snapshot_chain().len(), 2);
    assert!(kernel.audit().verify_integrity());
}

// ============================================================================
// SECTION: Scenario 2 — Replay rejection
// ============================================================================

#[test]
fn resubmitting_the_same_action_is_rejected_and_state_is_unchanged() {
    let alice_key = PrivateKey::generate(&mut OsRng);
    let mut kernel = build_kernel(&alice_key);

    let action = signed_action(&alice_key, "a1", "wealth", 100, None, LogicalTimestamp::new(1, 0));
    let mut budget = Budget::new(100);
    kernel.execute(EntityId::new("alice"), None, action, 1, &mut budget).expect("first commit succeeds");
    let chain_len_before = kernel.state().snapshot_chain().len();

    let replay_attempt = signed_action(&alice_key, "a1", "wealth", 100, None, LogicalTimestamp::new(2, 0));
    let err = kernel.submit(EntityId::new("alice"), None, replay_attempt, 1).expect_err("resubmission is rejected");

    assert_eq!(err.code, ErrorCode::ReplayDetected);
    assert_eq!(kernel.state().snapshot_chain().len(), chain_len_before);
}

// ============================================================================
// SECTION: Scenario 3 — Protocol side effect
// ============================================================================

#[test]
fn active_protocol_mutates_a_second_metric_in_the_same_snapshot() {
    let alice_key = PrivateKey::generate(&mut OsRng);
    let owner_key = PrivateKey::generate(&mut OsRng);
    let mut kernel = build_kernel(&alice_key);

    let bundle = signed_bundle("alice", &owner_key, vec![active_protocol("P", "reputation", 1)]);
    kernel.protocols_mut().load_bundle(&bundle, &EntityId::new("alice")).expect("load protocol bundle");

    let action = signed_action(&alice_key, "a1", "wealth", 50, Some(ProtocolId::new("P")), LogicalTimestamp::new(1, 0));
    let mut budget = Budget::new(100);
    let receipt = kernel.execute(EntityId::new("alice"), Some(ProtocolId::new("P")), action, 1, &mut budget).expect("commit succeeds");

    assert_eq!(receipt.status, governance_core::AttemptStatus::Committed);
    assert_eq!(kernel.state().get(&governance_core::MetricId::new("wealth")).unwrap().as_number().unwrap().as_i64(), Some(50));
    assert_eq!(kernel.state().get(&governance_core::MetricId::new("reputation")).unwrap().as_number().unwrap().as_i64(), Some(1));
    assert_eq!(kernel.state().snapshot_chain().len(), 2);
}

// ============================================================================
// SECTION: Scenario 4 — Budget exhaustion then retry
// ============================================================================

#[test]
fn budget_exhaustion_is_retryable_without_losing_the_attempt() {
    let alice_key = PrivateKey::generate(&mut OsRng);
    let mut kernel = build_kernel(&alice_key);

    let action = signed_action(&alice_key, "a1", "wealth", 10, None, LogicalTimestamp::new(1, 0));
    let attempt_id = kernel.submit(EntityId::new("alice"), None, action, 50).expect("submit accepted");
    kernel.guard(&attempt_id).expect("guard pipeline passes");

    let mut starved = Budget::new(10);
    let err = kernel.commit(&attempt_id, &mut starved).expect_err("budget too small");
    assert_eq!(err.code, ErrorCode::BudgetExceeded);
    assert_eq!(kernel.state().snapshot_chain().len(), 1);

    let mut enough = Budget::new(100);
    let receipt = kernel.commit(&attempt_id, &mut enough).expect("retried commit succeeds");
    assert_eq!(receipt.status, governance_core::AttemptStatus::Committed);
    assert_eq!(enough.consumed(), 50);
}

// ============================================================================
// SECTION: Scenario 5 — Bundle tampering
// ============================================================================

#[test]
fn tampered_bundle_content_fails_id_check_then_tampered_signature_fails_separately() {
    let owner_key = PrivateKey::generate(&mut OsRng);
    let good = signed_bundle("owner", &owner_key, vec![active_protocol("Q", "reputation", 1)]);

    let mut engine = ProtocolEngine::new();
    engine.load_bundle(&good, &EntityId::new("owner")).expect("well-formed bundle loads");

    let mut id_mismatch = good.clone();
    id_mismatch.protocols[0].name = "renamed-without-resigning".to_string();
    let err = engine.load_bundle(&id_mismatch, &EntityId::new("owner")).expect_err("stale bundle id is rejected");
    assert!(matches!(err, ProtocolError::Bundle(BundleError::IdMismatch { .. })));

    let mut bad_signature = good;
    let mut raw = hex_decode(&bad_signature.signature).expect("valid hex signature");
    raw[0] ^= 0x01;
    bad_signature.signature = hex_encode(&raw);
    let err = engine.load_bundle(&bad_signature, &EntityId::new("owner")).expect_err("flipped signature is rejected");
    assert!(matches!(err, ProtocolError::Bundle(BundleError::SignatureInvalid)));
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

// ============================================================================
// SECTION: Scenario 6 — Reconstruction across two kernels
// ============================================================================

#[test]
fn a_second_kernel_replays_to_the_same_tip_and_rejects_both_seen_actions() {
    let alice_key = PrivateKey::generate(&mut OsRng);
    let owner_key = PrivateKey::generate(&mut OsRng);
    let bundle = signed_bundle("alice", &owner_key, vec![active_protocol("P", "reputation", 1)]);

    let mut kernel_a = build_kernel(&alice_key);
    kernel_a.protocols_mut().load_bundle(&bundle, &EntityId::new("alice")).expect("load bundle into A");
    let mut budget = Budget::new(1000);
    kernel_a
        .execute(EntityId::new("alice"), None, signed_action(&alice_key, "a1", "wealth", 100, None, LogicalTimestamp::new(1, 0)), 1, &mut budget)
        .expect("first action commits");
    kernel_a
        .execute(
            EntityId::new("alice"),
            Some(ProtocolId::new("P")),
            signed_action(&alice_key, "a2", "wealth", 10, Some(ProtocolId::new("P")), LogicalTimestamp::new(2, 0)),
            1,
            &mut budget,
        )
        .expect("second action commits");
    let tip_a = kernel_a.state().tip().hash;

    let mut kernel_b = build_kernel(&alice_key);
    kernel_b.protocols_mut().load_bundle(&bundle, &EntityId::new("alice")).expect("load bundle into B");
    let mut projections = ProjectionEngine::new();
    let report = replay(kernel_a.audit(), &mut kernel_b, &mut projections).expect("replay succeeds");

    assert_eq!(report.entries_replayed, 2);
    assert_eq!(report.mutations_applied, 2);
    assert_eq!(report.final_state_hash, tip_a);
    assert!(kernel_b.has_seen(&ActionId::new("a1")));
    assert!(kernel_b.has_seen(&ActionId::new("a2")));

    kernel_b.boot().expect("B re-boots after replay");
    let resubmitted = signed_action(&alice_key, "a1", "wealth", 100, None, LogicalTimestamp::new(3, 0));
    let err = kernel_b.submit(EntityId::new("alice"), None, resubmitted, 1).expect_err("B also rejects a1");
    assert_eq!(err.code, ErrorCode::ReplayDetected);
}
