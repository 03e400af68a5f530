// governance-core/src/kernel/lifecycle.rs
// ============================================================================
// Module: Kernel Lifecycle
// Description: The Kernel's own state machine, independent of any Attempt.
// Purpose: `{UNINITIALIZED -> CONSTITUTED -> ACTIVE -> (SUSPENDED|VIOLATED)
//          -> RECOVERED -> DISSOLVED}`, plus the supplemented RECOVERED ->
//          ACTIVE re-entry via `boot()`.
// Dependencies: none
// ============================================================================

/// The Kernel's own lifecycle, distinct from any individual Attempt's.
///
/// # Invariants
/// - Every operation but [`crate::kernel::Kernel::boot`] and
///   [`crate::kernel::Kernel::recover`] fails with `KERNEL_NOT_ACTIVE` unless
///   the kernel is `Active`.
/// - `Recovered` is not itself usable for execution: `boot()` must be called
///   again to reach `Active` (no diagram arrow runs directly from
///   `Recovered` to `Active`'s Attempt pipeline).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelLifecycle {
    /// No collaborators wired in yet. Never produced by
    /// [`crate::kernel::Kernel::new`], which constitutes directly.
    Uninitialized,
    /// Collaborators are wired in; `boot()` has not yet been called.
    Constituted,
    /// Accepting Attempts and governance operations.
    Active,
    /// Temporarily not accepting Attempts; resumable.
    Suspended,
    /// A fatal internal invariant failed; only `recover()` is callable.
    Violated,
    /// Remediated from `Violated`; requires `boot()` before further Attempts.
    Recovered,
    /// Permanently wound down; terminal.
    Dissolved,
}

impl KernelLifecycle {
    /// Returns whether a transition from `self` to `next` is a legal single
    /// step.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Uninitialized, Self::Constituted)
                | (Self::Constituted, Self::Active)
                | (Self::Recovered, Self::Active)
                | (Self::Active, Self::Suspended)
                | (Self::Active, Self::Violated)
                | (Self::Active, Self::Dissolved)
                | (Self::Suspended, Self::Active)
                | (Self::Suspended, Self::Dissolved)
                | (Self::Violated, Self::Recovered)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovered_cannot_skip_boot() {
        assert!(!KernelLifecycle::Recovered.can_transition_to(KernelLifecycle::Recovered));
        assert!(KernelLifecycle::Recovered.can_transition_to(KernelLifecycle::Active));
    }

    #[test]
    fn violated_only_reaches_recovered() {
        assert!(KernelLifecycle::Violated.can_transition_to(KernelLifecycle::Recovered));
        assert!(!KernelLifecycle::Violated.can_transition_to(KernelLifecycle::Active));
    }
}
