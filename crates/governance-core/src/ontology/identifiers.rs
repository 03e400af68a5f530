// governance-core/src/ontology/identifiers.rs
// ============================================================================
// Module: Identifiers
// Description: Opaque, strongly-typed identifiers used across the kernel.
// Purpose: Avoid stringly-typed confusion between entity/action/metric/...
//          identifier spaces while keeping wire representation as plain
//          strings.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Cycles and back-references (entity-to-delegation, snapshot-to-evidence)
//! are represented as IDs, never pointers. Each
//! identifier here is a thin newtype over `String` (or, for hash-derived
//! identifiers, over [`crate::primitives::HashDigest`]) with a stable
//! `Display`/serde string form.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::primitives::HashDigest;

macro_rules! string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Creates a new `", stringify!($name), "`.")]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id!(EntityId, "Identifies an Entity (actor, office, asset, system, or abstract).");
string_id!(ActionId, "Identifies an Action; also used as the id of its Attempt.");
string_id!(MetricId, "Identifies a registered metric definition.");
string_id!(ProtocolId, "Identifies a Protocol.");
string_id!(DelegationId, "Identifies a capability delegation granted by `AuthorityEngine`.");

/// The Attempt identifier is always the originating Action's identifier.
pub type AttemptId = ActionId;

/// A dotted capability pattern, e.g. `METRIC.WRITE:stress` or
/// `GOVERNANCE:IDENTITY.CREATE`. The literal string `*` matches any
/// capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(String);

impl Capability {
    /// Wildcard capability matching any other capability pattern.
    pub const WILDCARD: &'static str = "*";

    /// Creates a new capability pattern.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// Returns the pattern as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether this capability pattern authorizes `requested`.
    ///
    /// The wildcard `*` authorizes everything. Otherwise patterns must
    /// match exactly, except a pattern without a `:resource` qualifier
    /// authorizes any resource under the same `DOMAIN.VERB` prefix.
    #[must_use]
    pub fn authorizes(&self, requested: &Capability) -> bool {
        if self.0 == Self::WILDCARD {
            return true;
        }
        if self.0 == requested.0 {
            return true;
        }
        match self.0.split_once(':') {
            None => requested
                .0
                .split_once(':')
                .is_some_and(|(verb, _)| verb == self.0),
            Some(_) => false,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Capability {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifies an Evidence entry by its content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceId(HashDigest);

impl EvidenceId {
    /// Wraps a digest as an evidence identifier.
    #[must_use]
    pub const fn from_digest(digest: HashDigest) -> Self {
        Self(digest)
    }

    /// Returns the underlying digest.
    #[must_use]
    pub const fn digest(&self) -> HashDigest {
        self.0
    }

    /// The zero identifier, used as `previousEvidenceId` for the first entry.
    #[must_use]
    pub const fn zero() -> Self {
        Self(crate::primitives::ZERO_DIGEST)
    }
}

impl fmt::Display for EvidenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

/// Identifies a Protocol Bundle by its content hash
/// (`bundleId = hash(canonical(bundle \ {signature, bundleId}))`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleId(HashDigest);

impl BundleId {
    /// Wraps a digest as a bundle identifier.
    #[must_use]
    pub const fn from_digest(digest: HashDigest) -> Self {
        Self(digest)
    }

    /// Returns the underlying digest.
    #[must_use]
    pub const fn digest(&self) -> HashDigest {
        self.0
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_authorizes_everything() {
        let wildcard = Capability::new("*");
        assert!(wildcard.authorizes(&Capability::new("METRIC.WRITE:stress")));
    }

    #[test]
    fn domain_verb_without_resource_authorizes_any_resource() {
        let broad = Capability::new("METRIC.WRITE");
        assert!(broad.authorizes(&Capability::new("METRIC.WRITE:stress")));
        assert!(!broad.authorizes(&Capability::new("METRIC.READ:stress")));
    }

    #[test]
    fn exact_match_required_when_resource_qualified() {
        let narrow = Capability::new("METRIC.WRITE:stress");
        assert!(!narrow.authorizes(&Capability::new("METRIC.WRITE:reputation")));
        assert!(narrow.authorizes(&Capability::new("METRIC.WRITE:stress")));
    }
}
