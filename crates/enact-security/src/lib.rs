//! Field-selective document signing and trust verification for Enact
//!
//! Enact tool manifests travel between registries, hosts, and agents; this
//! library signs and verifies them over a well-defined subset of their
//! fields, chosen by a selection policy at sign time. Verification replays
//! the same policy, so a signature pins exactly the fields it was produced
//! over and nothing else.
//!
//! # Architecture
//!
//! ```text
//! document --> field selection --> canonical bytes --> SHA-256 --> ECDSA
//!                                                                (secp256k1)
//! verify: policy (config store) --> threshold --> per-signature check
//!           against trusted keys (key store), with fallback scan
//! ```
//!
//! # Components
//!
//! - **Crypto** ([`crypto`]): secp256k1 keygen, deterministic ECDSA,
//!   SHA-256, hex codec
//! - **PEM** ([`pem`]): hex to PEM and back, tolerant of the raw and
//!   uncompressed shapes third-party producers emit
//! - **Signing** ([`sign`]): field selection, canonical serialization, the
//!   signing service, and both verification profiles
//! - **Key store** ([`keystore`]): persistent trusted-key directory with
//!   metadata and owner-only private material
//! - **Config store** ([`config`]): persistent verification policy
//!
//! # Profiles
//!
//! A trusted host builds a [`Verifier`] over a [`KeyStore`] and a
//! [`ConfigStore`] rooted at `$HOME/.enact/` (or `ENACT_HOME`). An
//! untrusted environment calls [`verify_untrusted`], which checks
//! signatures only against their embedded keys and touches no storage.
//!
//! # Security
//!
//! - Verification returns a bare `false` with no failure reason
//! - The trusted-key set, not the embedded key hint, is the authority in
//!   the trusted-host profile; an empty trust set fails closed
//! - Private key material is written owner-only and zeroized in memory

pub mod config;
pub mod crypto;
pub mod error;
pub mod keystore;
pub mod pem;
pub mod sign;

use std::path::PathBuf;

pub use config::{ConfigStore, SecurityConfig, SecurityConfigUpdate};
pub use crypto::{derive_public, generate_keypair, sha256_hex, KeyPair, ALGORITHM};
pub use error::{CryptoError, EnactError, FieldError, PemError, Result};
pub use keystore::{KeyMetadata, KeyStore};
pub use pem::{hex_to_pem, is_pem, pem_to_hex, PemLabel};
pub use sign::{
    canonical_document, document_hash, enact_default_fields, generic_default_fields, sign,
    signed_fields, verify_untrusted, Document, FieldConfig, Signature, SigningOptions, Verifier,
};

/// The host root both stores default to: `ENACT_HOME` when set, otherwise
/// `$HOME/.enact/`.
#[must_use]
pub fn default_root() -> PathBuf {
    if let Ok(root) = std::env::var("ENACT_HOME") {
        if !root.is_empty() {
            return PathBuf::from(root);
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".enact"))
        .unwrap_or_else(|| PathBuf::from(".enact"))
}
