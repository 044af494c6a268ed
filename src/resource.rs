//! Resource descriptions for the listable backend entities.
//!
//! A `ResourceSpec` tells the list controller everything it needs to know
//! about one endpoint: which field identifies an item, which fields the
//! client-side search looks at, which filters are hierarchical, and which
//! filters define the "context" that scopes search and dropdown options.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{LeadboardError, Result};

/// A parent/child filter pair, e.g. city -> postcode.
///
/// The child filter is only meaningful within its parent, so changing the
/// parent always clears the child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterHierarchy {
    pub parent: String,
    pub child: String,
}

impl FilterHierarchy {
    pub fn new(parent: &str, child: &str) -> Self {
        Self {
            parent: parent.to_string(),
            child: child.to_string(),
        }
    }
}

/// Item fields used to build filter dropdown options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionFields {
    #[serde(default = "default_city_field")]
    pub city: String,
    #[serde(default = "default_postcode_field")]
    pub postcode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

fn default_city_field() -> String {
    "city".to_string()
}

fn default_postcode_field() -> String {
    "postcode".to_string()
}

impl Default for OptionFields {
    fn default() -> Self {
        Self {
            city: default_city_field(),
            postcode: default_postcode_field(),
            category: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Path segment under the API base URL (`{base}/{name}/`)
    pub name: String,
    /// Field carrying the item's identity, used for deduplication
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// Fields scanned by client-side search
    #[serde(default)]
    pub search_fields: Vec<String>,
    /// Fields shown as table columns
    #[serde(default)]
    pub display_fields: Vec<String>,
    /// Filters that are also enforced client-side by equality
    #[serde(default)]
    pub client_filter_keys: Vec<String>,
    /// Filters that define the listing context (category tabs)
    #[serde(default)]
    pub context_keys: Vec<String>,
    #[serde(default)]
    pub hierarchies: Vec<FilterHierarchy>,
    #[serde(default)]
    pub option_fields: OptionFields,
    /// Per-resource debounce override in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
    /// Also send the search text to the server as `search=`
    #[serde(default)]
    pub server_search: bool,
}

fn default_id_field() -> String {
    "id".to_string()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl ResourceSpec {
    /// A bare resource with no search, filter or display configuration.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id_field: default_id_field(),
            search_fields: Vec::new(),
            display_fields: Vec::new(),
            client_filter_keys: Vec::new(),
            context_keys: Vec::new(),
            hierarchies: Vec::new(),
            option_fields: OptionFields::default(),
            debounce_ms: None,
            server_search: false,
        }
    }

    pub fn shops() -> Self {
        Self {
            search_fields: strings(&[
                "shop_name", "phone", "postcode", "address", "city", "category",
            ]),
            display_fields: strings(&[
                "id", "shop_name", "category", "city", "postcode", "phone",
            ]),
            client_filter_keys: strings(&["city", "postcode"]),
            context_keys: strings(&["category"]),
            hierarchies: vec![FilterHierarchy::new("city", "postcode")],
            option_fields: OptionFields {
                category: Some("category".to_string()),
                ..OptionFields::default()
            },
            ..Self::new("shops")
        }
    }

    pub fn leads() -> Self {
        Self {
            search_fields: strings(&[
                "shop_name",
                "contact_name",
                "phone",
                "email",
                "postcode",
                "address",
                "city",
            ]),
            display_fields: strings(&[
                "id",
                "shop_name",
                "contact_name",
                "status",
                "city",
                "postcode",
                "phone",
            ]),
            client_filter_keys: strings(&["city", "postcode", "status"]),
            context_keys: strings(&["category"]),
            hierarchies: vec![FilterHierarchy::new("city", "postcode")],
            option_fields: OptionFields {
                category: Some("category".to_string()),
                ..OptionFields::default()
            },
            debounce_ms: Some(1000),
            ..Self::new("leads")
        }
    }

    pub fn cases() -> Self {
        Self {
            search_fields: strings(&[
                "reference", "shop_name", "phone", "postcode", "city", "status",
            ]),
            display_fields: strings(&[
                "id", "reference", "shop_name", "status", "city", "postcode",
            ]),
            client_filter_keys: strings(&["city", "postcode", "status"]),
            context_keys: strings(&["status"]),
            hierarchies: vec![FilterHierarchy::new("city", "postcode")],
            ..Self::new("cases")
        }
    }

    /// Built-in resources keyed by name.
    pub fn builtins() -> BTreeMap<String, ResourceSpec> {
        [Self::shops(), Self::leads(), Self::cases()]
            .into_iter()
            .map(|spec| (spec.name.clone(), spec))
            .collect()
    }

    /// Children of `parent`, followed transitively (city -> postcode -> ...).
    pub fn dependent_filters(&self, parent: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut frontier = vec![parent.to_string()];

        while let Some(current) = frontier.pop() {
            for h in self.hierarchies.iter().filter(|h| h.parent == current) {
                if h.child != parent && !out.contains(&h.child) {
                    out.push(h.child.clone());
                    frontier.push(h.child.clone());
                }
            }
        }

        out
    }

    pub fn is_client_filter(&self, key: &str) -> bool {
        self.client_filter_keys.iter().any(|k| k == key)
    }

    pub fn is_context_key(&self, key: &str) -> bool {
        self.context_keys.iter().any(|k| k == key)
    }

    /// Reject specs that could not be listed.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.name.contains('/') {
            return Err(LeadboardError::Config(format!(
                "invalid resource name '{}'",
                self.name
            )));
        }
        if self.id_field.trim().is_empty() {
            return Err(LeadboardError::Config(format!(
                "resource '{}' has an empty id_field",
                self.name
            )));
        }
        for h in &self.hierarchies {
            if h.parent == h.child {
                return Err(LeadboardError::Config(format!(
                    "resource '{}' has a filter hierarchy from '{}' to itself",
                    self.name, h.parent
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_valid() {
        let builtins = ResourceSpec::builtins();
        assert_eq!(builtins.len(), 3);
        for spec in builtins.values() {
            spec.validate().unwrap();
        }
    }

    #[test]
    fn test_dependent_filters_direct() {
        let spec = ResourceSpec::shops();
        assert_eq!(spec.dependent_filters("city"), vec!["postcode".to_string()]);
        assert!(spec.dependent_filters("postcode").is_empty());
        assert!(spec.dependent_filters("category").is_empty());
    }

    #[test]
    fn test_dependent_filters_transitive() {
        let mut spec = ResourceSpec::new("sites");
        spec.hierarchies = vec![
            FilterHierarchy::new("region", "city"),
            FilterHierarchy::new("city", "postcode"),
        ];
        let deps = spec.dependent_filters("region");
        assert_eq!(deps.len(), 2);
        assert!(deps.contains(&"city".to_string()));
        assert!(deps.contains(&"postcode".to_string()));
    }

    #[test]
    fn test_dependent_filters_cycle_terminates() {
        let mut spec = ResourceSpec::new("sites");
        spec.hierarchies = vec![
            FilterHierarchy::new("a", "b"),
            FilterHierarchy::new("b", "a"),
        ];
        assert_eq!(spec.dependent_filters("a"), vec!["b".to_string()]);
    }

    #[test]
    fn test_validate_rejects_self_hierarchy() {
        let mut spec = ResourceSpec::new("sites");
        spec.hierarchies = vec![FilterHierarchy::new("city", "city")];
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_slash_in_name() {
        assert!(ResourceSpec::new("a/b").validate().is_err());
        assert!(ResourceSpec::new("  ").validate().is_err());
    }

    #[test]
    fn test_spec_yaml_defaults() {
        let spec: ResourceSpec = serde_yaml_ng::from_str("name: visits\n").unwrap();
        assert_eq!(spec.id_field, "id");
        assert_eq!(spec.option_fields.city, "city");
        assert!(!spec.server_search);
    }
}
