// governance-core/src/guards/mod.rs
// ============================================================================
// Module: Guards
// Description: The full error-code taxonomy and the pure validator pipeline.
// Purpose: Component C6 — every Guard is a pure function returning ok or a
//          typed violation; none mutate state.
// Dependencies: crate::{ontology, identity, metrics, protocol, primitives}
// ============================================================================

//! ## Overview
//! Guard dispatch is an **ordered list of plain functions** invoked by the
//! Kernel in a fixed sequence, not a trait-object hierarchy — there is no
//! `dyn Guard`. Each guard here takes
//! exactly the typed inputs it needs and returns [`GuardOutcome`]. The
//! Kernel (component C7) is the only caller that sequences them.

pub mod budget;
pub mod invariant;
pub mod replay;
pub mod scope;
pub mod signature;
pub mod time;

use serde::Serialize;

/// The complete error-code taxonomy, shared by Guard rejections, commit
/// aborts, and fatal kernel errors. Errors are typed by code, not by
/// exception class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Cryptographic verification of the action's signed message failed.
    SignatureInvalid,
    /// The initiator entity is revoked.
    RevokedEntity,
    /// The initiator entity is not registered.
    UnknownEntity,
    /// A delegation would grant capability to its own granter.
    SelfDelegation,
    /// The actor is not authorized for the requested capability.
    OverscopeAttempt,
    /// A matching delegation exists but has expired.
    ExpiredAuthority,
    /// No delegation exists covering the requested capability.
    AuthorityNotFound,
    /// More than one ACTIVE protocol would mutate the same metric.
    ProtocolViolation,
    /// The referenced protocol is not registered.
    ProtocolNotFound,
    /// The referenced protocol is registered but not ACTIVE.
    ProtocolNotActive,
    /// An identifier failed its format invariant (e.g. hex pattern).
    InvalidIdFormat,
    /// The action payload did not name a metric.
    MissingMetricId,
    /// The budget's remaining headroom is less than the attempt's cost.
    BudgetExceeded,
    /// A numeric mutation evaluated to `NaN` or `±Infinity`.
    NonFiniteMetric,
    /// A `COUNTER` mutation would drive the running total negative.
    NegativeBalance,
    /// The action payload exceeds the configured size limit.
    PayloadOversize,
    /// The action's timestamp is not ≥ the last-seen timestamp.
    TemporalParadox,
    /// The action's `expiresAt` has passed as of the evaluation time.
    ActionExpired,
    /// The action's id has already been seen (at-most-once violation).
    ReplayDetected,
    /// The action's physical clock coordinate diverges from the kernel's
    /// monotonized clock beyond the configured tolerance.
    ClockSkewRejected,
    /// An operation was attempted while the kernel is not ACTIVE.
    KernelNotActive,
    /// No Attempt exists under the given id.
    AttemptNotFound,
    /// The commit dry-run rejected one or more mutations.
    CommitFailed,
    /// Replay's reconstructed state tip diverged from the log's recorded tip.
    ReplayFailure,
    /// An internal invariant was violated after an irreversible step; the
    /// kernel must transition to VIOLATED.
    IntegrityBreach,
    /// A requested lifecycle transition is not legal from the current state.
    StateTransitionFailed,
    /// A protocol bundle's recomputed id did not match its declared id.
    BundleIdMismatch,
    /// A protocol bundle's owner signature did not verify.
    BundleSignatureInvalid,
    /// A protocol bundle would register two ACTIVE protocols targeting the
    /// same metric.
    BundleConflict,
}

/// A Guard's rejection: a typed code plus a human-readable (but never
/// secret-bearing) reason, carried into Evidence metadata verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardViolation {
    /// The taxonomy code identifying the failure.
    pub code: ErrorCode,
    /// A short, machine-checkable reason string. Never includes raw
    /// signature or key material.
    pub reason: String,
}

impl GuardViolation {
    /// Builds a violation from a code and a reason.
    #[must_use]
    pub fn new(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self { code, reason: reason.into() }
    }
}

/// The result of running a single Guard: `Ok(())` or a typed violation.
pub type GuardOutcome = Result<(), GuardViolation>;
