//! Core types for document signing
//!
//! A document is an open mapping from field names to arbitrary JSON values;
//! the library never imposes a schema beyond the fields a selection policy
//! names. Signatures and options are plain serde structs matching the wire
//! shapes documents exchange.

use serde::{Deserialize, Serialize};

use crate::crypto;

/// An open document: string field names mapped to arbitrary values.
///
/// Nested maps keep their parsed key order (`serde_json` is built with
/// `preserve_order`), which the canonical serialization relies on.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// A detached signature over the canonical projection of a document.
///
/// `timestamp` is the producer's wall clock in milliseconds at sign time;
/// it is informational only and never part of the signed bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// Compact `r || s` pair, 128 hex chars.
    pub signature: String,
    /// Signer's 33-byte compressed public key, 66 hex chars. Producers may
    /// strip this; verification then falls back to the trusted-key scan.
    #[serde(default)]
    pub public_key: String,
    /// Always `"secp256k1"`.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Milliseconds since the Unix epoch at sign time.
    #[serde(default)]
    pub timestamp: i64,
}

fn default_algorithm() -> String {
    crypto::ALGORITHM.to_string()
}

/// Field-selection policy for signing and verification.
///
/// Verification must use the same options the signature was produced with;
/// a different selection projects different bytes and fails.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SigningOptions {
    /// Use the Enact tool-manifest default field set instead of the generic
    /// record defaults.
    pub use_enact_defaults: bool,
    /// Explicit list of fields to sign. Overrides the default set entirely.
    pub include_fields: Option<Vec<String>>,
    /// Fields removed from the selection after defaults/include resolve.
    pub exclude_fields: Vec<String>,
    /// Extra fields appended when defaults are in effect. Ignored when
    /// `include_fields` is set.
    pub additional_critical_fields: Vec<String>,
    /// Reserved. Only `secp256k1` is accepted.
    pub algorithm: Option<String>,
}

impl SigningOptions {
    /// Options selecting the Enact tool-manifest defaults.
    #[must_use]
    pub fn enact() -> Self {
        Self {
            use_enact_defaults: true,
            ..Self::default()
        }
    }

    /// Options signing exactly the named fields.
    #[must_use]
    pub fn with_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include_fields: Some(fields.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }
}
