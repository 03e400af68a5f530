// governance-core/src/primitives/mod.rs
// ============================================================================
// Module: Primitives
// Description: Logical time, budgets, canonical encoding, hashing, signing.
// Purpose: The deterministic, dependency-free foundation every other
//          component builds on (component C1 of the kernel).
// Dependencies: serde, serde_jcs, sha2, ed25519-dalek, subtle
// ============================================================================

pub mod budget;
pub mod hashing;
pub mod signature;
pub mod time;

pub use budget::Budget;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::ZERO_DIGEST;
pub use hashing::canonical_json_bytes;
pub use hashing::hash_bytes;
pub use hashing::hash_canonical_json;
pub use hashing::hash_chain;
pub use signature::PrivateKey;
pub use signature::PublicKey;
pub use signature::SignatureError;
pub use signature::verify_signature;
pub use time::LogicalTimestamp;
pub use time::ParseTimestampError;
