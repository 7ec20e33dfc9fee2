//! Document signing: field selection, canonicalization, and verification
//!
//! The signing pipeline projects a free-form document down to a
//! policy-chosen field subset, serializes it deterministically, and signs
//! the SHA-256 digest of those bytes:
//!
//! ```text
//! document --> field selection --> canonical JSON bytes --> SHA-256
//!   --> ECDSA secp256k1 --> Signature
//! ```
//!
//! Verification replays the same projection, so signer and verifier must
//! agree on the selection options. Two verification profiles exist:
//!
//! - **Trusted host** ([`Verifier`]): threshold policy from the config
//!   store, trusted keys from the key store, fallback scan for signatures
//!   without a usable key hint.
//! - **Untrusted** ([`verify_untrusted`]): embedded keys only, no stores.

pub mod canonical;
pub mod fields;
pub mod service;
pub mod types;

pub use canonical::canonical_bytes;
pub use fields::{
    enact_default_fields, generic_default_fields, is_empty_value, selected_field_names,
    FieldConfig,
};
pub use service::{
    canonical_document, document_hash, sign, signed_fields, verify_untrusted, Verifier,
};
pub use types::{Document, Signature, SigningOptions};
