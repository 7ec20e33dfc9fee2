//! secp256k1 primitives: keygen, ECDSA sign/verify, SHA-256
//!
//! All key and signature material crosses this module boundary as hex
//! strings: 64 hex chars for a private scalar, 66 for a compressed public
//! point, 128 for a compact `r || s` signature. Hex decoding is
//! case-insensitive and tolerates no whitespace.
//!
//! Signing is deterministic (RFC 6979 nonces), so a `(key, digest)` pair
//! always produces the same signature. Verification never surfaces an
//! error: any malformed input yields `false`.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::{CryptoError, Result};

/// The only signature algorithm this library produces or accepts.
pub const ALGORITHM: &str = "secp256k1";

/// Private scalar length in bytes.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Compressed public point length in bytes.
pub const PUBLIC_KEY_LEN: usize = 33;

/// Compact signature length in bytes (`r || s`).
pub const SIGNATURE_LEN: usize = 64;

/// A secp256k1 keypair as hex strings.
///
/// The private scalar is zeroized when the pair is dropped and redacted
/// from `Debug` output so key material cannot leak through logging.
#[derive(Clone)]
pub struct KeyPair {
    /// 32-byte private scalar, 64 hex chars.
    pub private_key: String,
    /// 33-byte compressed public point, 66 hex chars.
    pub public_key: String,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl KeyPair {
    /// Rebuild a pair from a private scalar, deriving the public point.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKey` if the hex does not decode to a
    /// valid scalar.
    pub fn derive(private_hex: &str) -> Result<Self> {
        let signing_key = signing_key_from_hex(private_hex)?;
        Ok(Self::from_signing_key(&signing_key))
    }

    fn from_signing_key(signing_key: &SigningKey) -> Self {
        let public_key = hex::encode(signing_key.verifying_key().to_sec1_bytes());
        let private_key = hex::encode(signing_key.to_bytes());
        Self {
            private_key,
            public_key,
        }
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

/// Generate a fresh keypair from a uniformly random valid scalar.
#[must_use]
pub fn generate_keypair() -> KeyPair {
    let signing_key = SigningKey::random(&mut rand::thread_rng());
    KeyPair::from_signing_key(&signing_key)
}

/// Derive the compressed public point for a private scalar.
///
/// Deterministic: the same scalar always yields the same point.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKey` if the scalar is malformed.
pub fn derive_public(private_hex: &str) -> Result<String> {
    let signing_key = signing_key_from_hex(private_hex)?;
    Ok(hex::encode(signing_key.verifying_key().to_sec1_bytes()))
}

/// SHA-256 digest of raw bytes.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 digest of raw bytes as lowercase hex.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Sign a 32-byte digest, returning the 64-byte compact signature as hex.
///
/// Nonces follow RFC 6979, so signing is deterministic per `(key, digest)`.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKey` for a malformed scalar and
/// `CryptoError::InvalidDigest` for a digest that does not decode.
pub fn sign(private_hex: &str, digest_hex: &str) -> Result<String> {
    let signing_key = signing_key_from_hex(private_hex)?;
    let digest = hex::decode(digest_hex).map_err(|_| CryptoError::InvalidDigest)?;
    let signature: EcdsaSignature = signing_key
        .sign_prehash(&digest)
        .map_err(|_| CryptoError::SigningFailed)?;
    Ok(hex::encode(signature.to_bytes()))
}

/// Verify a compact signature against a digest and a compressed public key.
///
/// Never fails with an error: malformed hex, an invalid point, a bad
/// signature encoding, and a failed curve check all return `false`.
#[must_use]
pub fn verify(public_hex: &str, digest_hex: &str, signature_hex: &str) -> bool {
    verify_inner(public_hex, digest_hex, signature_hex).unwrap_or(false)
}

fn verify_inner(public_hex: &str, digest_hex: &str, signature_hex: &str) -> Option<bool> {
    let public_bytes = hex::decode(public_hex).ok()?;
    let verifying_key = VerifyingKey::from_sec1_bytes(&public_bytes).ok()?;
    let digest = hex::decode(digest_hex).ok()?;
    let signature_bytes = hex::decode(signature_hex).ok()?;
    let signature = EcdsaSignature::from_slice(&signature_bytes).ok()?;
    Some(verifying_key.verify_prehash(&digest, &signature).is_ok())
}

fn signing_key_from_hex(private_hex: &str) -> Result<SigningKey> {
    let bytes = hex::decode(private_hex).map_err(|_| CryptoError::InvalidKey)?;
    let signing_key = SigningKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidKey)?;
    Ok(signing_key)
}
