// governance-core/src/primitives/signature.rs
// ============================================================================
// Module: Signature Primitives
// Description: Ed25519 signing and verification over canonical byte messages.
// Purpose: Provide the single signature primitive used by Guards, the
//          protocol bundle registry, and governance evidence.
// Dependencies: ed25519-dalek, subtle
// ============================================================================

//! ## Overview
//! All signed messages in the kernel are plain byte strings built by callers
//! (the Action's colon-joined canonical message, a bundle's `bundleId`,
//! ...); this module only verifies/produces Ed25519 signatures over bytes it
//! is handed. Key material never touches [`crate::primitives::hashing`]
//! directly — it is compared with [`subtle::ConstantTimeEq`] where equality
//! checks are security-relevant.

use ed25519_dalek::Signature;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use ed25519_dalek::Verifier;
use ed25519_dalek::VerifyingKey;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Errors raised while parsing or verifying signatures and keys.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// A hex-encoded key or signature did not decode to the expected length.
    #[error("malformed key or signature material")]
    Malformed,
    /// Signature verification failed.
    #[error("signature verification failed")]
    Invalid,
}

/// An Ed25519 public verification key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Parses a public key from 32 raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Malformed`] when the bytes are not a valid
    /// compressed Edwards point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| SignatureError::Malformed)?;
        VerifyingKey::from_bytes(&array)
            .map(Self)
            .map_err(|_| SignatureError::Malformed)
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn to_bytes(self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

/// Constant-time key equality: two public keys are compared without
/// short-circuiting on the first differing byte.
impl ConstantTimeEq for PublicKey {
    fn ct_eq(&self, other: &Self) -> subtle::Choice {
        self.0.to_bytes().ct_eq(&other.0.to_bytes())
    }
}

/// An Ed25519 signing key, held only by the kernel itself (for governance
/// evidence) or by test fixtures that stand in for external callers.
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Generates a fresh signing key from a caller-supplied CSPRNG.
    #[must_use]
    pub fn generate<R: rand::CryptoRng + rand::RngCore>(rng: &mut R) -> Self {
        Self(SigningKey::generate(rng))
    }

    /// Derives the matching public key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// Signs a message, returning the signature's raw bytes.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.0.sign(message).to_bytes()
    }
}

/// Verifies a signature over `message` against `public_key`.
///
/// # Errors
///
/// Returns [`SignatureError::Malformed`] if `signature` is not 64 bytes, or
/// [`SignatureError::Invalid`] if verification fails.
pub fn verify_signature(
    message: &[u8],
    signature: &[u8],
    public_key: &PublicKey,
) -> Result<(), SignatureError> {
    let array: [u8; 64] = signature.try_into().map_err(|_| SignatureError::Malformed)?;
    let sig = Signature::from_bytes(&array);
    public_key
        .0
        .verify(message, &sig)
        .map_err(|_| SignatureError::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn sign_then_verify_round_trips() {
        let key = PrivateKey::generate(&mut OsRng);
        let public = key.public_key();
        let message = b"actionId:initiator:payload:1:0";
        let signature = key.sign(message);
        assert!(verify_signature(message, &signature, &public).is_ok());
    }

    #[test]
    fn flipped_message_byte_fails_verification() {
        let key = PrivateKey::generate(&mut OsRng);
        let public = key.public_key();
        let mut message = b"actionId:initiator:payload:1:0".to_vec();
        let signature = key.sign(&message);
        message[0] ^= 0x01;
        assert_eq!(
            verify_signature(&message, &signature, &public),
            Err(SignatureError::Invalid)
        );
    }

    #[test]
    fn flipped_signature_byte_fails_verification() {
        let key = PrivateKey::generate(&mut OsRng);
        let public = key.public_key();
        let message = b"actionId:initiator:payload:1:0";
        let mut signature = key.sign(message);
        signature[0] ^= 0x01;
        assert_eq!(
            verify_signature(message, &signature, &public),
            Err(SignatureError::Invalid)
        );
    }
}
