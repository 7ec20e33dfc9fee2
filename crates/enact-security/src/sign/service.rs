//! Signing service and verification policy
//!
//! Signing is pure: project, serialize, digest, sign. Verification comes in
//! two profiles. The trusted-host [`Verifier`] consults the persistent
//! security config and the trusted-key store, enforces the multi-signature
//! threshold, and falls back to scanning every trusted key when a signature
//! carries no usable public-key hint. [`verify_untrusted`] checks each
//! signature only against its own embedded key, for environments without a
//! persistent store.
//!
//! ```text
//! document + options --> field selection --> canonical bytes --> SHA-256
//!   --> ECDSA sign --> Signature { sig, publicKey, algorithm, timestamp }
//! ```
//!
//! Verification never surfaces an error. A failed projection, a malformed
//! signature entry, and a failed curve check all yield `false`; the
//! negative result deliberately carries no reason.

use chrono::Utc;

use crate::config::{ConfigStore, SecurityConfig};
use crate::crypto;
use crate::error::{CryptoError, Result};
use crate::keystore::KeyStore;
use crate::sign::canonical::canonical_bytes;
use crate::sign::fields::{project, selected_field_names};
use crate::sign::types::{Document, Signature, SigningOptions};

/// Sign the canonical projection of a document.
///
/// The returned signature carries the public key derived from
/// `private_key_hex` and the current wall clock. Attaching it to the
/// document's `signatures` sequence is the caller's concern.
///
/// # Errors
///
/// Returns `FieldError::MissingRequired` when the selection names a
/// required field the document lacks, `CryptoError::InvalidKey` for a
/// malformed private key, and `CryptoError::UnsupportedAlgorithm` when the
/// options request anything but secp256k1.
pub fn sign(
    document: &Document,
    private_key_hex: &str,
    options: &SigningOptions,
) -> Result<Signature> {
    check_algorithm(options)?;
    let digest_hex = document_hash(document, options)?;
    let signature = crypto::sign(private_key_hex, &digest_hex)?;
    let public_key = crypto::derive_public(private_key_hex)?;
    Ok(Signature {
        signature,
        public_key,
        algorithm: crypto::ALGORITHM.to_string(),
        timestamp: Utc::now().timestamp_millis(),
    })
}

/// SHA-256 of the canonical bytes, as hex. Pure function of
/// `(document, options)`.
///
/// # Errors
///
/// Same selection errors as [`sign`].
pub fn document_hash(document: &Document, options: &SigningOptions) -> Result<String> {
    let projected = project(document, options)?;
    let bytes = canonical_bytes(&projected)?;
    Ok(crypto::sha256_hex(&bytes))
}

/// The projected, ordered mapping the given options would sign. Exposed
/// for inspection and testing.
///
/// # Errors
///
/// Same selection errors as [`sign`].
pub fn canonical_document(document: &Document, options: &SigningOptions) -> Result<Document> {
    project(document, options)
}

/// The sorted field names the given options select.
#[must_use]
pub fn signed_fields(options: &SigningOptions) -> Vec<String> {
    selected_field_names(options)
}

fn check_algorithm(options: &SigningOptions) -> Result<()> {
    match options.algorithm.as_deref() {
        None => Ok(()),
        Some(alg) if alg == crypto::ALGORITHM => Ok(()),
        Some(other) => Err(CryptoError::UnsupportedAlgorithm(other.to_string()).into()),
    }
}

/// Verify using only the public keys embedded in the signatures.
///
/// No trust check, no fallback scan, no policy load: every resolved
/// signature must verify against its own embedded key, and a signature
/// without one fails. Intended for environments where no persistent store
/// exists.
#[must_use]
pub fn verify_untrusted(
    document: &Document,
    provided: &Signature,
    options: &SigningOptions,
) -> bool {
    let Ok(digest_hex) = document_hash(document, options) else {
        return false;
    };
    let entries = embedded_signature_entries(document, provided);
    if entries.is_empty() {
        return false;
    }
    entries.iter().all(|entry| match entry {
        Some(signature) if !signature.public_key.is_empty() => {
            crypto::verify(&signature.public_key, &digest_hex, &signature.signature)
        }
        _ => false,
    })
}

/// Trusted-host verification over a key store and a config store.
///
/// The effective policy is reloaded from the config store on every
/// [`Verifier::verify`] call, and the trusted-key set is the snapshot taken
/// at the start of that call.
#[derive(Debug, Clone, Copy)]
pub struct Verifier<'a> {
    keys: &'a KeyStore,
    config: &'a ConfigStore,
}

impl<'a> Verifier<'a> {
    /// Bind a verifier to the two stores of a host root.
    #[must_use]
    pub fn new(keys: &'a KeyStore, config: &'a ConfigStore) -> Self {
        Self { keys, config }
    }

    /// Verify under the persisted security policy.
    #[must_use]
    pub fn verify(
        &self,
        document: &Document,
        provided: &Signature,
        options: &SigningOptions,
    ) -> bool {
        let policy = self.config.load();
        self.verify_with_policy(document, provided, options, &policy)
    }

    /// Verify under an explicit policy, bypassing the config store.
    #[must_use]
    pub fn verify_with_policy(
        &self,
        document: &Document,
        provided: &Signature,
        options: &SigningOptions,
        policy: &SecurityConfig,
    ) -> bool {
        let entries = document_signature_entries(document, provided);
        let count = entries.len();
        let minimum = policy.minimum_signatures as usize;

        if count < minimum {
            if policy.allow_local_unsigned && count == 0 {
                tracing::debug!("accepting unsigned document under permissive policy");
                return true;
            }
            tracing::debug!(count, minimum, "signature count below policy threshold");
            return false;
        }

        // Shared digest for every signature in the document.
        let Ok(digest_hex) = document_hash(document, options) else {
            return false;
        };
        let trusted = self.keys.all_trusted_public_hex();

        entries.iter().all(|entry| {
            let Some(signature) = entry else {
                return false;
            };
            verify_one(signature, &digest_hex, &trusted)
        })
    }
}

/// Verify a single signature against the trusted set.
///
/// A non-empty embedded key that the host trusts is checked directly.
/// Anything else (missing, empty, or untrusted embedded key) goes through
/// the fallback scan: the signature passes as soon as any trusted key
/// verifies it.
fn verify_one(signature: &Signature, digest_hex: &str, trusted: &[String]) -> bool {
    let embedded = &signature.public_key;
    if !embedded.is_empty() && trusted.contains(embedded) {
        return crypto::verify(embedded, digest_hex, &signature.signature);
    }
    trusted
        .iter()
        .any(|public_key| crypto::verify(public_key, digest_hex, &signature.signature))
}

/// Resolve which signatures a trusted-host verification covers.
///
/// A `signatures` sequence on the document is authoritative: non-empty, it
/// is the list; present but empty, the document is explicitly unsigned and
/// the list is empty (so the unsigned-document policy applies). Only a
/// document without the sequence falls back to the provided signature.
/// Entries that do not parse stay in the list as failures.
fn document_signature_entries(document: &Document, provided: &Signature) -> Vec<Option<Signature>> {
    match document.get("signatures").and_then(|v| v.as_array()) {
        Some(list) if !list.is_empty() => list
            .iter()
            .map(|value| serde_json::from_value(value.clone()).ok())
            .collect(),
        Some(_) => Vec::new(),
        None => vec![Some(provided.clone())],
    }
}

/// Same resolution as [`document_signature_entries`], except an empty
/// `signatures` sequence falls back to the provided signature: without a
/// policy there is no unsigned-document allowance to apply.
fn embedded_signature_entries(document: &Document, provided: &Signature) -> Vec<Option<Signature>> {
    match document.get("signatures").and_then(|v| v.as_array()) {
        Some(list) if !list.is_empty() => list
            .iter()
            .map(|value| serde_json::from_value(value.clone()).ok())
            .collect(),
        _ => vec![Some(provided.clone())],
    }
}
