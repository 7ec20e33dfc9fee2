//! Policy-driven field selection
//!
//! Projects a free-form document down to the subset of fields a signature
//! covers. Two built-in default sets exist: the Enact tool-manifest profile
//! and a generic record profile. The selection is deterministic: names are
//! sorted byte-lexicographically and only non-empty values survive.

use serde_json::Value;

use crate::error::{FieldError, Result};
use crate::sign::types::{Document, SigningOptions};

/// A field the selection policy knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldConfig {
    /// Field name as it appears in documents.
    pub name: &'static str,
    /// Whether a document must carry a non-empty value when this field is
    /// selected for signing.
    pub required: bool,
    /// Whether the field is part of the default signed set.
    pub security_critical: bool,
    /// Human-readable purpose of the field.
    pub description: &'static str,
}

/// Default field set for the Enact tool-manifest profile.
const ENACT_FIELDS: &[FieldConfig] = &[
    FieldConfig {
        name: "annotations",
        required: false,
        security_critical: true,
        description: "Behavioral hints for tool consumers",
    },
    FieldConfig {
        name: "command",
        required: true,
        security_critical: true,
        description: "Command the tool executes",
    },
    FieldConfig {
        name: "description",
        required: true,
        security_critical: true,
        description: "What the tool does",
    },
    FieldConfig {
        name: "enact",
        required: false,
        security_critical: true,
        description: "Protocol version",
    },
    FieldConfig {
        name: "env",
        required: false,
        security_critical: true,
        description: "Environment variables the command needs",
    },
    FieldConfig {
        name: "from",
        required: false,
        security_critical: true,
        description: "Container image the command runs in",
    },
    FieldConfig {
        name: "inputSchema",
        required: false,
        security_critical: true,
        description: "JSON Schema of the tool inputs",
    },
    FieldConfig {
        name: "name",
        required: true,
        security_critical: true,
        description: "Tool name",
    },
    FieldConfig {
        name: "timeout",
        required: false,
        security_critical: true,
        description: "Execution timeout",
    },
    FieldConfig {
        name: "version",
        required: false,
        security_critical: true,
        description: "Tool version",
    },
];

/// Default field set for generic records.
const GENERIC_FIELDS: &[FieldConfig] = &[
    FieldConfig {
        name: "id",
        required: true,
        security_critical: true,
        description: "Record identifier",
    },
    FieldConfig {
        name: "content",
        required: true,
        security_critical: true,
        description: "Record payload",
    },
    FieldConfig {
        name: "timestamp",
        required: true,
        security_critical: true,
        description: "Record creation time",
    },
    FieldConfig {
        name: "metadata",
        required: false,
        security_critical: false,
        description: "Auxiliary, unsigned by default",
    },
];

/// The Enact tool-manifest default set.
#[must_use]
pub fn enact_default_fields() -> &'static [FieldConfig] {
    ENACT_FIELDS
}

/// The generic record default set.
#[must_use]
pub fn generic_default_fields() -> &'static [FieldConfig] {
    GENERIC_FIELDS
}

fn active_defaults(options: &SigningOptions) -> &'static [FieldConfig] {
    if options.use_enact_defaults {
        ENACT_FIELDS
    } else {
        GENERIC_FIELDS
    }
}

/// Resolve the names the given options select, sorted ascending.
///
/// `include_fields` overrides the default set entirely;
/// `additional_critical_fields` only extend defaults. Exclusions apply
/// last. Duplicates collapse.
#[must_use]
pub fn selected_field_names(options: &SigningOptions) -> Vec<String> {
    let mut fields: Vec<String> = match &options.include_fields {
        Some(include) => include.clone(),
        None => active_defaults(options)
            .iter()
            .filter(|field| field.security_critical)
            .map(|field| field.name.to_string())
            .chain(options.additional_critical_fields.iter().cloned())
            .collect(),
    };
    fields.retain(|name| !options.exclude_fields.contains(name));
    fields.sort();
    fields.dedup();
    fields
}

/// Project a document to its selected fields as an ordered mapping.
///
/// Keys are inserted in sorted order; values are carried over verbatim.
/// Values that are `null`, an empty string, an empty sequence, or an empty
/// mapping are dropped, as are selected fields the document does not carry.
///
/// # Errors
///
/// Returns `FieldError::MissingRequired` when a field that is required by
/// the active default set and selected for signing is absent or empty.
pub fn project(document: &Document, options: &SigningOptions) -> Result<Document> {
    let fields = selected_field_names(options);

    for config in active_defaults(options).iter().filter(|f| f.required) {
        if !fields.iter().any(|name| name == config.name) {
            continue;
        }
        let present = document
            .get(config.name)
            .is_some_and(|value| !is_empty_value(value));
        if !present {
            return Err(FieldError::MissingRequired(config.name.to_string()).into());
        }
    }

    let mut projected = Document::new();
    for name in &fields {
        if let Some(value) = document.get(name) {
            if !is_empty_value(value) {
                projected.insert(name.clone(), value.clone());
            }
        }
    }
    Ok(projected)
}

/// Emptiness as the canonical contract defines it: `null`, empty string,
/// empty sequence, or mapping with zero keys. Numbers and booleans are
/// never empty.
#[must_use]
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
