//! Backend collaborator boundary.
//!
//! This module defines the query and response shapes exchanged with the
//! REST backend, and the `ListBackend` seam the list controller fetches
//! through. The HTTP implementation lives in `http`; one-off record
//! mutations live in `records`.

pub mod credentials;
pub mod error;
pub mod http;
pub mod records;

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LeadboardError, Result};

pub use credentials::{CredentialProvider, MemoryCredentials, NoCredentials};
pub use http::HttpBackend;
pub use records::{CallOutcome, CallRecord, LeadDraft};

/// Query parameter names owned by the list protocol. Filters may not use them.
pub const RESERVED_PARAMS: [&str; 2] = ["page", "search"];

/// One record as returned by the backend. The schema is backend-defined.
pub type RawItem = serde_json::Map<String, Value>;

/// Active filter values keyed by filter name.
///
/// Ordered so that two filter sets with the same entries compare, hash and
/// serialize identically. Empty values are never stored: setting a key to an
/// empty string removes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filters(BTreeMap<String, String>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if value.trim().is_empty() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The entries whose key is listed in `keys`.
    pub fn subset(&self, keys: &[String]) -> Filters {
        self.0
            .iter()
            .filter(|(k, _)| keys.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl FromIterator<(String, String)> for Filters {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (k, v) in iter {
            filters.set(k, v);
        }
        filters
    }
}

/// What the list controller asks the backend for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListQuery {
    pub filters: Filters,
    /// 1-based page number
    pub page: u32,
    pub search_text: String,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: Filters::new(),
            page: 1,
            search_text: String::new(),
        }
    }
}

impl ListQuery {
    pub fn new(filters: Filters, page: u32) -> Self {
        Self {
            filters,
            page: page.max(1),
            search_text: String::new(),
        }
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    /// Query parameters in wire order: `page`, `search` (if any), then filters.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("page".to_string(), self.page.to_string())];
        let search = self.search_text.trim();
        if !search.is_empty() {
            pairs.push(("search".to_string(), search.to_string()));
        }
        pairs.extend(self.filters.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        pairs
    }

    /// Encode as a URL query string for persisting list state.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.to_query_pairs())
            .finish()
    }

    /// Restore a query persisted with `to_query_string`.
    ///
    /// A missing or unparsable page becomes 1.
    pub fn from_query_string(s: &str) -> Self {
        let s = s.trim().trim_start_matches('?');
        let mut query = ListQuery::default();

        for (key, value) in url::form_urlencoded::parse(s.as_bytes()) {
            match key.as_ref() {
                "page" => {
                    query.page = value.trim().parse::<u32>().unwrap_or(1).max(1);
                }
                "search" => query.search_text = value.into_owned(),
                _ => query.filters.set(key.into_owned(), value.into_owned()),
            }
        }

        query
    }

    /// Reject filter names that collide with protocol parameters.
    pub fn validate(&self) -> Result<()> {
        for (key, _) in self.filters.iter() {
            if key.trim().is_empty() {
                return Err(LeadboardError::InvalidQuery(
                    "filter name cannot be empty".to_string(),
                ));
            }
            if RESERVED_PARAMS.contains(&key) {
                return Err(LeadboardError::InvalidQuery(format!(
                    "'{key}' is reserved and cannot be used as a filter"
                )));
            }
        }
        Ok(())
    }
}

/// A validated backend page.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPage {
    pub results: Vec<RawItem>,
    pub total_pages: u32,
    pub current_page: u32,
    pub count: Option<u64>,
}

fn read_u64(envelope: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .filter_map(|k| envelope.get(*k))
        .find_map(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
}

/// Read a page number or count that must fit in `u32`.
fn read_page_number(
    envelope: &serde_json::Map<String, Value>,
    keys: &[&str],
) -> Result<Option<u32>> {
    read_u64(envelope, keys)
        .map(|n| {
            u32::try_from(n).map_err(|_| {
                LeadboardError::Format(format!("'{}' value {n} is out of range", keys[0]))
            })
        })
        .transpose()
}

impl RawPage {
    /// Validate a response body.
    ///
    /// `results` must be an array of objects. Page count comes from
    /// `totalPages`, else from `count` and `page_size`, else from the
    /// presence of a `next` link.
    pub fn from_json(value: Value, requested_page: u32, page_size: Option<u32>) -> Result<Self> {
        let Value::Object(mut envelope) = value else {
            return Err(LeadboardError::Format(
                "expected a JSON object with a 'results' array".to_string(),
            ));
        };

        let results = match envelope.remove("results") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(LeadboardError::Format(
                    "'results' is not an array".to_string(),
                ));
            }
            None => {
                return Err(LeadboardError::Format(
                    "missing 'results' array".to_string(),
                ));
            }
        };

        let results = results
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(map),
                _ => Err(LeadboardError::Format(format!(
                    "result {i} is not an object"
                ))),
            })
            .collect::<Result<Vec<RawItem>>>()?;

        let count = read_u64(&envelope, &["count", "total"]);
        let current_page = read_page_number(&envelope, &["currentPage", "current_page"])?
            .filter(|p| *p >= 1)
            .unwrap_or(requested_page.max(1));
        let has_next = envelope.get("next").is_some_and(|v| !v.is_null());

        let derived = match (count, page_size) {
            (Some(count), Some(size)) if size > 0 => {
                let pages = count.div_ceil(u64::from(size));
                Some(u32::try_from(pages).map_err(|_| {
                    LeadboardError::Format(format!("'count' of {count} implies too many pages"))
                })?)
            }
            _ => None,
        };
        let total_pages = read_page_number(&envelope, &["totalPages", "total_pages"])?
            .or(derived)
            .unwrap_or_else(|| {
                if has_next {
                    current_page.saturating_add(1)
                } else if results.is_empty() {
                    0
                } else {
                    current_page
                }
            });

        Ok(Self {
            results,
            total_pages,
            current_page,
            count,
        })
    }
}

/// Source of list pages.
///
/// Implementations must be cheap to share across concurrently running
/// fetches; the list controller holds one behind an `Arc`.
pub trait ListBackend: Send + Sync + 'static {
    /// Fetch exactly one page of `resource` for `query`.
    fn fetch_page(
        &self,
        resource: &str,
        query: &ListQuery,
    ) -> impl Future<Output = Result<RawPage>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filters_empty_value_removes() {
        let mut filters = Filters::new();
        filters.set("city", "Leeds");
        assert_eq!(filters.get("city"), Some("Leeds"));
        filters.set("city", "  ");
        assert!(filters.get("city").is_none());
        assert!(filters.is_empty());
    }

    #[test]
    fn test_filters_structural_equality_ignores_insert_order() {
        let mut a = Filters::new();
        a.set("city", "Leeds");
        a.set("category", "cafe");
        let mut b = Filters::new();
        b.set("category", "cafe");
        b.set("city", "Leeds");
        assert_eq!(a, b);
    }

    #[test]
    fn test_filters_subset() {
        let filters: Filters = [
            ("category".to_string(), "cafe".to_string()),
            ("city".to_string(), "Leeds".to_string()),
        ]
        .into_iter()
        .collect();
        let context = filters.subset(&["category".to_string()]);
        assert_eq!(context.len(), 1);
        assert_eq!(context.get("category"), Some("cafe"));
    }

    #[test]
    fn test_query_pairs_order_and_empty_search() {
        let mut filters = Filters::new();
        filters.set("category", "cafe");
        let query = ListQuery::new(filters, 2);
        assert_eq!(
            query.to_query_pairs(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("category".to_string(), "cafe".to_string()),
            ]
        );

        let query = query.with_search(" joe ");
        assert_eq!(query.to_query_pairs()[1], ("search".to_string(), "joe".to_string()));
    }

    #[test]
    fn test_query_string_encoding() {
        let mut filters = Filters::new();
        filters.set("category", "cafe & bar");
        let query = ListQuery::new(filters, 3).with_search("joe's");
        insta::assert_snapshot!(query.to_query_string(), @"page=3&search=joe%27s&category=cafe+%26+bar");
    }

    #[test]
    fn test_query_string_restore() {
        let query = ListQuery::from_query_string("?page=4&search=joes&city=Leeds&postcode=LS1");
        assert_eq!(query.page, 4);
        assert_eq!(query.search_text, "joes");
        assert_eq!(query.filters.get("city"), Some("Leeds"));
        assert_eq!(query.filters.get("postcode"), Some("LS1"));
    }

    #[test]
    fn test_query_string_restore_bad_page_defaults_to_one() {
        assert_eq!(ListQuery::from_query_string("page=abc").page, 1);
        assert_eq!(ListQuery::from_query_string("page=0").page, 1);
        assert_eq!(ListQuery::from_query_string("").page, 1);
    }

    #[test]
    fn test_validate_rejects_reserved_filter() {
        let mut query = ListQuery::default();
        query.filters.set("page", "2");
        assert!(matches!(
            query.validate(),
            Err(LeadboardError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_raw_page_with_total_pages() {
        let page = RawPage::from_json(
            json!({"results": [{"id": 1, "shop_name": "Joe's Café"}], "totalPages": 3}),
            1,
            None,
        )
        .unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 1);
    }

    #[test]
    fn test_raw_page_derives_total_from_count() {
        let page = RawPage::from_json(
            json!({"results": [{"id": 1}], "count": 21, "current_page": 2}),
            2,
            Some(10),
        )
        .unwrap();
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.count, Some(21));
    }

    #[test]
    fn test_raw_page_next_link_implies_another_page() {
        let page = RawPage::from_json(
            json!({"results": [{"id": 1}], "next": "https://api/shops/?page=2"}),
            1,
            None,
        )
        .unwrap();
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn test_raw_page_next_link_on_last_representable_page() {
        let page = RawPage::from_json(
            json!({"results": [{"id": 1}], "currentPage": u32::MAX, "next": "x"}),
            1,
            None,
        )
        .unwrap();
        assert_eq!(page.current_page, u32::MAX);
        assert_eq!(page.total_pages, u32::MAX);
    }

    #[test]
    fn test_raw_page_out_of_range_numbers_are_format_errors() {
        for body in [
            json!({"results": [], "totalPages": 1_099_511_627_776_u64}),
            json!({"results": [], "currentPage": u64::MAX}),
        ] {
            let err = RawPage::from_json(body, 1, None).unwrap_err();
            assert!(matches!(err, LeadboardError::Format(_)), "got {err:?}");
        }

        let err = RawPage::from_json(json!({"results": [], "count": u64::MAX}), 1, Some(1))
            .unwrap_err();
        assert!(matches!(err, LeadboardError::Format(_)));
    }

    #[test]
    fn test_raw_page_empty_has_zero_pages() {
        let page = RawPage::from_json(json!({"results": []}), 1, None).unwrap();
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn test_raw_page_missing_results_is_format_error() {
        let err = RawPage::from_json(json!({"detail": "ok"}), 1, None).unwrap_err();
        assert!(matches!(err, LeadboardError::Format(_)));

        let err = RawPage::from_json(json!({"results": {"id": 1}}), 1, None).unwrap_err();
        assert!(matches!(err, LeadboardError::Format(_)));

        let err = RawPage::from_json(json!([{"id": 1}]), 1, None).unwrap_err();
        assert!(matches!(err, LeadboardError::Format(_)));
    }

    #[test]
    fn test_raw_page_non_object_entry_is_format_error() {
        let err = RawPage::from_json(json!({"results": [{"id": 1}, 7]}), 1, None).unwrap_err();
        assert!(matches!(err, LeadboardError::Format(msg) if msg.contains("result 1")));
    }
}
