// governance-core/src/primitives/hashing.rs
// ============================================================================
// Module: Canonical Hashing
// Description: Deterministic JSON canonicalization and content hashing.
// Purpose: Single source of determinism for every hashed or signed structure.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Every place in the kernel that hashes or signs structured data goes
//! through [`canonical_json_bytes`] first. Canonicalization follows RFC 8785
//! (JCS): object keys are sorted, arrays preserve order, numbers render
//! stably. Two semantically equal values always produce identical bytes.

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

/// The zero digest used as `previousEvidenceId`/`previousHash` for genesis
/// records.
pub const ZERO_DIGEST: HashDigest = HashDigest([0u8; 32]);

/// Errors raised while canonicalizing or hashing structured data.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed (the value was not representable).
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

/// A 32-byte SHA-256 digest.
///
/// # Invariants
/// - Always exactly 32 bytes (no variable-length digests are supported).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct HashDigest(#[serde(with = "hex_digest")] [u8; 32]);

impl HashDigest {
    /// Wraps raw bytes as a digest.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the digest as a byte slice.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the digest as a lowercase hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }

    /// Parses a digest from a lowercase hex string.
    #[must_use]
    pub fn from_hex(value: &str) -> Option<Self> {
        let bytes = hex_decode(value)?;
        if bytes.len() != 32 {
            return None;
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Some(Self(out))
    }
}

impl std::fmt::Debug for HashDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HashDigest").field(&self.to_hex()).finish()
    }
}

mod hex_digest {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::hex_encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let raw = String::deserialize(deserializer)?;
        let bytes = super::hex_decode(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid hex digest: {raw}"))
        })?;
        if bytes.len() != 32 {
            return Err(serde::de::Error::custom("digest must be 32 bytes"));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(out)
    }
}

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes the canonical JSON encoding of a value.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(&bytes))
}

/// Hashes raw bytes with SHA-256.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> HashDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    HashDigest(out)
}

/// Hashes a sequence of byte slices as a single concatenated message.
///
/// Used for hash-linking records (`hash(previous || payload || ...)`)
/// without requiring callers to allocate an intermediate buffer.
#[must_use]
pub fn hash_chain(parts: &[&[u8]]) -> HashDigest {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    HashDigest(out)
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

fn hex_decode(value: &str) -> Option<Vec<u8>> {
    if value.len() % 2 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(value.len() / 2);
    let bytes = value.as_bytes();
    for chunk in bytes.chunks(2) {
        let hi = (chunk[0] as char).to_digit(16)?;
        let lo = (chunk[1] as char).to_digit(16)?;
        out.push(((hi << 4) | lo) as u8);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonicalization_is_order_independent() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(
            canonical_json_bytes(&a).unwrap(),
            canonical_json_bytes(&b).unwrap()
        );
        assert_eq!(hash_canonical_json(&a).unwrap(), hash_canonical_json(&b).unwrap());
    }

    #[test]
    fn hex_round_trips() {
        let digest = hash_bytes(b"hello");
        let hex = digest.to_hex();
        assert_eq!(HashDigest::from_hex(&hex), Some(digest));
    }

    #[test]
    fn zero_digest_is_all_zero_bytes() {
        assert_eq!(ZERO_DIGEST.as_bytes(), &[0u8; 32]);
    }
}
