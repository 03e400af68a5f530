// governance-core/src/lib.rs
// ============================================================================
// Module: Governance Core Library
// Description: Public API surface for the governance kernel core.
// Purpose: Expose the deterministic execution core — primitives, ontology,
//          identity, metrics, audit, guards, protocol, kernel, replay — with
//          no I/O of its own.
// Dependencies: crate::{primitives, ontology, identity, metrics, audit,
//               guards, protocol, kernel, replay}
// ============================================================================

//! ## Overview
//! Governance Core is the deterministic heart of the governance kernel: an
//! event-sourced, replayable ledger of Attempts and Actions committed under
//! cryptographic signature and a fixed Guard pipeline. It performs no I/O —
//! persistence is a port ([`audit::EventStore`]) implemented elsewhere
//! (`governance-store-sqlite`), and every hash, signature, and canonical
//! encoding here is reproducible byte-for-byte across processes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod guards;
pub mod identity;
pub mod kernel;
pub mod metrics;
pub mod ontology;
pub mod primitives;
pub mod protocol;
pub mod replay;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditError;
pub use audit::AuditLog;
pub use audit::EventStore;
pub use audit::EventStoreError;
pub use audit::compute_evidence_id;
pub use guards::ErrorCode;
pub use guards::GuardOutcome;
pub use guards::GuardViolation;
pub use identity::AuthorityEngine;
pub use identity::AuthorityError;
pub use identity::IdentityError;
pub use identity::IdentityManager;
pub use kernel::Attempt;
pub use kernel::AttemptStatus;
pub use kernel::CommitReceipt;
pub use kernel::Kernel;
pub use kernel::KernelLifecycle;
pub use metrics::MetricDefinition;
pub use metrics::MetricRegistry;
pub use metrics::MetricType;
pub use metrics::RegistryError;
pub use metrics::StateError;
pub use metrics::StateModel;
pub use metrics::StateSnapshot;
pub use ontology::Action;
pub use ontology::ActionId;
pub use ontology::ActionPayload;
pub use ontology::AttemptId;
pub use ontology::BundleId;
pub use ontology::Capability;
pub use ontology::Delegation;
pub use ontology::DelegationId;
pub use ontology::Entity;
pub use ontology::EntityId;
pub use ontology::EntityStatus;
pub use ontology::EntityType;
pub use ontology::Evidence;
pub use ontology::EvidenceId;
pub use ontology::EvidenceStatus;
pub use ontology::MetricId;
pub use ontology::MetricValue;
pub use ontology::Mutation;
pub use ontology::Protocol;
pub use ontology::ProtocolBundle;
pub use ontology::ProtocolId;
pub use ontology::ProtocolLifecycle;
pub use primitives::Budget;
pub use primitives::HashDigest;
pub use primitives::HashError;
pub use primitives::LogicalTimestamp;
pub use primitives::PrivateKey;
pub use primitives::PublicKey;
pub use primitives::SignatureError;
pub use protocol::BundleError;
pub use protocol::ProtocolEngine;
pub use protocol::ProtocolError;
pub use replay::Projection;
pub use replay::ProjectionEngine;
pub use replay::ProjectionFailure;
pub use replay::ReplayReport;
pub use replay::replay;
