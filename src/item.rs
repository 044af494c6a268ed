//! Sanitized, display-ready items.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::remote::RawItem;
use crate::resource::ResourceSpec;

/// Placeholder shown for any missing or empty value.
pub const NOT_AVAILABLE: &str = "N/A";

/// Values that backends emit for "no value".
const NULLISH: [&str; 3] = ["none", "null", "undefined"];

/// A backend record with every field reduced to a displayable string.
///
/// Reads never yield an empty string: anything missing is `N/A`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayItem {
    pub id: String,
    pub fields: BTreeMap<String, String>,
}

impl DisplayItem {
    pub fn from_raw(raw: &RawItem, spec: &ResourceSpec) -> Self {
        let mut fields: BTreeMap<String, String> = raw
            .iter()
            .map(|(k, v)| (k.clone(), sanitize(v)))
            .collect();

        let named = spec
            .search_fields
            .iter()
            .chain(&spec.display_fields)
            .chain(std::iter::once(&spec.id_field))
            .chain(std::iter::once(&spec.option_fields.city))
            .chain(std::iter::once(&spec.option_fields.postcode))
            .chain(spec.option_fields.category.as_ref());
        for field in named {
            fields
                .entry(field.clone())
                .or_insert_with(|| NOT_AVAILABLE.to_string());
        }

        let id = fields
            .get(&spec.id_field)
            .cloned()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Self { id, fields }
    }

    pub fn get(&self, field: &str) -> &str {
        self.fields
            .get(field)
            .map(String::as_str)
            .unwrap_or(NOT_AVAILABLE)
    }

    /// Items without an identity are never merged with one another.
    pub fn has_identity(&self) -> bool {
        self.id != NOT_AVAILABLE
    }
}

fn sanitize_str(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.is_empty() || NULLISH.iter().any(|n| trimmed.eq_ignore_ascii_case(n)) {
        NOT_AVAILABLE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Reduce one JSON value to its display string.
pub fn sanitize(value: &Value) -> String {
    match value {
        Value::Null => NOT_AVAILABLE.to_string(),
        Value::String(s) => sanitize_str(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(values) => {
            let parts: Vec<String> = values
                .iter()
                .map(sanitize)
                .filter(|s| s != NOT_AVAILABLE)
                .collect();
            if parts.is_empty() {
                NOT_AVAILABLE.to_string()
            } else {
                parts.join(", ")
            }
        }
        // Related records are shown by name
        Value::Object(map) => map
            .get("name")
            .map(sanitize)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    }
}
