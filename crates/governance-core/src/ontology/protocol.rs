// governance-core/src/ontology/protocol.rs
// ============================================================================
// Module: Protocol
// Description: Declarative policy packages: lifecycle, preconditions, and
//              deterministic side-effect execution rules.
// Purpose: Canonical Protocol and Protocol Bundle types.
// Dependencies: crate::{ontology::{identifiers, action, entity}, primitives}, serde
// ============================================================================

//! ## Overview
//! A Protocol's precondition/execution language is a closed tagged union:
//! `ALWAYS | METRIC_THRESHOLD | TIME_WINDOW` for
//! preconditions, `MUTATE_METRIC` for execution. Adding a variant is a
//! deliberate core change, not something a bundle author can extend.

use serde::Deserialize;
use serde::Serialize;

use crate::ontology::identifiers::EntityId;
use crate::ontology::identifiers::MetricId;
use crate::ontology::identifiers::ProtocolId;
use crate::primitives::LogicalTimestamp;

/// A Protocol's lifecycle stage.
///
/// # Invariants
/// - `Proposed -> Ratified -> Active -> (Deprecated | Revoked)`, each
///   transition one-directional; `Deprecated` and `Revoked` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolLifecycle {
    /// Registered but not yet governance-approved.
    Proposed,
    /// Governance-approved, not yet taking effect.
    Ratified,
    /// In effect: evaluated for every committed Action.
    Active,
    /// Superseded; retained for audit history, never evaluated.
    Deprecated,
    /// Permanently withdrawn; retained for audit history, never evaluated.
    Revoked,
}

impl ProtocolLifecycle {
    /// Returns whether a transition from `self` to `next` is a legal single
    /// step in the lifecycle state machine.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Proposed, Self::Ratified)
                | (Self::Ratified, Self::Active)
                | (Self::Active, Self::Deprecated)
                | (Self::Active, Self::Revoked)
        )
    }
}

/// Numeric comparison used by a `METRIC_THRESHOLD` precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdOperator {
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `=`
    Equal,
    /// `>=`
    GreaterThanOrEqual,
    /// `>`
    GreaterThan,
}

/// A closed-union precondition predicate over kernel state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Precondition {
    /// Always holds.
    Always,
    /// Holds when `metric_id`'s current numeric value compares to `value`
    /// via `operator`.
    MetricThreshold {
        /// The metric being compared.
        metric_id: MetricId,
        /// The comparison to apply.
        operator: ThresholdOperator,
        /// The threshold value.
        value: f64,
    },
    /// Holds when the evaluation timestamp falls within `[start, end]`
    /// (either bound may be omitted to mean unbounded).
    TimeWindow {
        /// Inclusive lower bound, if any.
        start: Option<LogicalTimestamp>,
        /// Inclusive upper bound, if any.
        end: Option<LogicalTimestamp>,
    },
}

/// A side-effect mutation a Protocol declares for its execution phase.
///
/// Numeric mutations are additive increments for `COUNTER` metrics and
/// absolute sets for `GAUGE` metrics; non-numeric mutations are always
/// absolute sets. The primary mutation carried by the Action's own payload
/// is never rewritten by an execution rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Execution {
    /// Produces a side-effect mutation against `metric_id`.
    MutateMetric {
        /// The metric to mutate.
        metric_id: MetricId,
        /// The numeric increment, absolute set, or scalar value to apply.
        mutation: crate::ontology::action::MetricValue,
    },
}

impl Execution {
    /// Returns the metric identifier this execution rule targets.
    #[must_use]
    pub const fn metric_id(&self) -> &MetricId {
        match self {
            Self::MutateMetric { metric_id, .. } => metric_id,
        }
    }
}

/// A declarative policy package: preconditions gating one or more
/// deterministic side-effect mutations.
///
/// # Invariants
/// - `id` is unique within a [`crate::protocol::ProtocolEngine`].
/// - At most one `Active` protocol may declare an execution for a given
///   metric at bundle-load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    /// Unique protocol identifier.
    pub id: ProtocolId,
    /// Human-readable name.
    pub name: String,
    /// Protocol version string.
    pub version: String,
    /// Free-form category label.
    pub category: String,
    /// Current lifecycle stage.
    pub lifecycle: ProtocolLifecycle,
    /// When true, any precondition evaluation error rejects the whole
    /// evaluation (`PROTOCOL_VIOLATION`) rather than treating the
    /// precondition as unmet.
    pub strict: bool,
    /// Preconditions that must all hold for this protocol's execution rules
    /// to fire.
    pub preconditions: Vec<Precondition>,
    /// Side-effect mutations produced when preconditions hold.
    pub execution: Vec<Execution>,
}

impl Protocol {
    /// Returns the metric identifiers this protocol's execution rules
    /// target, used by the bundle conflict check.
    pub fn execution_targets(&self) -> impl Iterator<Item = &MetricId> {
        self.execution.iter().map(Execution::metric_id)
    }
}

/// The owner of a Protocol Bundle: an entity plus the raw public key bytes
/// the bundle signature is verified against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleOwner {
    /// The entity that owns (and is accountable for) this bundle.
    pub entity_id: EntityId,
    /// Raw Ed25519 public key bytes.
    pub public_key: Vec<u8>,
}

/// A signed collection of Protocols installed atomically with conflict
/// checking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolBundle {
    /// Content hash of the bundle (computed, then carried alongside it).
    pub bundle_id: String,
    /// The protocols this bundle installs.
    pub protocols: Vec<Protocol>,
    /// The bundle's owner and verification key.
    pub owner: BundleOwner,
    /// Hex-encoded signature over `bundle_id`, optionally prefixed
    /// `ed25519:`.
    pub signature: String,
}

/// The fields of a [`ProtocolBundle`] that feed into the `bundle_id` hash;
/// `bundle_id` and `signature` themselves are excluded.
#[derive(Debug, Clone, Serialize)]
pub struct BundleContent<'a> {
    /// The protocols this bundle installs.
    pub protocols: &'a [Protocol],
    /// The bundle's owner and verification key.
    pub owner: &'a BundleOwner,
}

impl ProtocolBundle {
    /// Returns the hashable content of this bundle (everything except
    /// `bundle_id` and `signature`).
    #[must_use]
    pub fn content(&self) -> BundleContent<'_> {
        BundleContent {
            protocols: &self.protocols,
            owner: &self.owner,
        }
    }

    /// Parses the signature field, stripping an optional `ed25519:` prefix.
    #[must_use]
    pub fn signature_bytes_hex(&self) -> &str {
        self.signature
            .strip_prefix("ed25519:")
            .unwrap_or(&self.signature)
    }
}
