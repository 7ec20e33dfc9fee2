//! Error types for the Enact signing library
//!
//! Sign-side operations surface typed errors because the caller has a
//! legitimate choice to make (fix the document, fix the key). Verification
//! never surfaces errors: every decoding or cryptographic failure maps to a
//! plain `false` so a verifier cannot be probed for the reason a signature
//! was rejected.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EnactError>;

/// Top-level error type aggregating the domain errors of each subsystem.
#[derive(Debug, Error)]
pub enum EnactError {
    /// Cryptographic primitive failure (keys, signatures, digests).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// PEM encoding or decoding failure.
    #[error(transparent)]
    Pem(#[from] PemError),

    /// Field selection failure during canonicalization.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// A key with this id already exists in the store.
    #[error("key '{0}' already exists in the store")]
    KeyExists(String),

    /// The requested key is not present in the store.
    #[error("key '{0}' not found in the store")]
    KeyNotFound(String),

    /// Filesystem failure on a store write path.
    ///
    /// Read paths never surface this: unreadable entries degrade to an
    /// absent result or to defaults.
    #[error("I/O failure at {path}: {source}")]
    Io {
        /// File or directory the operation was writing.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization failure.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Errors from the secp256k1 primitives.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The private key is not a valid secp256k1 scalar.
    #[error("invalid private key: not a valid secp256k1 scalar")]
    InvalidKey,

    /// The public key is not a valid compressed secp256k1 point.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// The digest passed to `sign` could not be used.
    #[error("invalid digest")]
    InvalidDigest,

    /// Signing produced no usable signature.
    #[error("signing failed")]
    SigningFailed,

    /// Only secp256k1 is supported.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Errors from the PEM codec.
#[derive(Debug, Error)]
pub enum PemError {
    /// The decoded body has a length no supported key shape uses.
    #[error("unsupported key material length: {0} bytes")]
    UnsupportedLength(usize),

    /// The input could not be placed in any supported PEM shape.
    #[error("malformed PEM: {0}")]
    Malformed(String),
}

/// Errors from the field selector.
#[derive(Debug, Error)]
pub enum FieldError {
    /// A field that is required by the active default set and selected for
    /// signing is absent from the document or empty.
    #[error("required field '{0}' is missing or empty")]
    MissingRequired(String),
}
