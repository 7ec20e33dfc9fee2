//! Canonical byte serialization of projected documents
//!
//! The projected mapping serializes as a compact JSON object: keys in the
//! order the selector inserted them (ascending byte-lexicographic), no
//! insignificant whitespace, standard string escaping, numbers in minimal
//! form, UTF-8 bytes. Nested values serialize exactly as parsed; recursive
//! key reordering is deliberately not applied, matching the cross-platform
//! contract other producers observe.

use crate::error::{EnactError, Result};
use crate::sign::types::Document;

/// Serialize a projected mapping to its canonical bytes.
///
/// # Errors
///
/// Returns `EnactError::Serialization` if the mapping cannot be encoded,
/// which no JSON-sourced document triggers in practice.
pub fn canonical_bytes(projected: &Document) -> Result<Vec<u8>> {
    serde_json::to_vec(projected).map_err(|e| EnactError::Serialization(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sign::fields::project;
    use crate::sign::types::SigningOptions;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn serialization_is_compact_and_sorted() {
        let document = doc(json!({
            "name": "t",
            "command": "echo",
            "description": "d",
            "enact": "1.0.0"
        }));
        let projected = project(&document, &SigningOptions::enact()).unwrap();
        let bytes = canonical_bytes(&projected).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"command":"echo","description":"d","enact":"1.0.0","name":"t"}"#
        );
    }

    #[test]
    fn serialization_is_deterministic() {
        let document = doc(json!({
            "name": "t",
            "description": "d",
            "command": "c",
            "inputSchema": {"type": "object", "properties": {"b": 1, "a": 2}}
        }));
        let options = SigningOptions::enact();
        let first = canonical_bytes(&project(&document, &options).unwrap()).unwrap();
        let second = canonical_bytes(&project(&document, &options).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn nested_objects_keep_parsed_key_order() {
        let document: Document =
            serde_json::from_str(r#"{"id":"1","content":{"zeta":1,"alpha":2},"timestamp":3}"#)
                .unwrap();
        let projected = project(&document, &SigningOptions::default()).unwrap();
        let text = String::from_utf8(canonical_bytes(&projected).unwrap()).unwrap();
        // Top level sorts; the nested object stays as parsed.
        assert_eq!(text, r#"{"content":{"zeta":1,"alpha":2},"id":"1","timestamp":3}"#);
    }

    #[test]
    fn strings_escape_per_json() {
        let document = doc(json!({"id": "a\"b\\c\nd", "content": "x", "timestamp": 1}));
        let projected = project(&document, &SigningOptions::default()).unwrap();
        let text = String::from_utf8(canonical_bytes(&projected).unwrap()).unwrap();
        assert!(text.contains(r#""a\"b\\c\nd""#));
    }

    #[test]
    fn projection_then_serialization_is_idempotent() {
        let document = doc(json!({"id": "1", "content": "x", "timestamp": 42}));
        let options = SigningOptions::default();
        let once = project(&document, &options).unwrap();
        let twice = project(&once, &options).unwrap();
        assert_eq!(
            canonical_bytes(&once).unwrap(),
            canonical_bytes(&twice).unwrap()
        );
    }
}
