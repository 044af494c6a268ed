//! Query keys, results and the caching layer beneath the list controller.
//!
//! Every remote query is identified by a typed key. Two queries are the same
//! query exactly when their keys are structurally equal; caching, slot
//! staleness checks and task cancellation all go through that equality.

pub mod cache;
pub mod fanout;
pub mod slot;

use std::fmt;

use serde::Serialize;

use crate::error::LeadboardError;
use crate::item::DisplayItem;
use crate::remote::{Filters, RawPage};
use crate::resource::ResourceSpec;

pub use cache::{QueryCache, QueryClient};
pub use fanout::{FanOutPolicy, FanOutResult, fetch_pages_tolerant};
pub use slot::{QuerySlot, Ticket};

/// Keys that belong to one resource, for per-resource invalidation.
pub trait ResourceKey {
    fn resource(&self) -> &str;
}

/// Primary listing: one server page for the applied filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub resource: String,
    pub filters: Filters,
    pub page: u32,
}

/// Multi-page client-side search within the applied filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchKey {
    pub resource: String,
    pub filters: Filters,
    pub search: String,
}

/// Dropdown option sample, scoped to the context subset of the filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OptionsKey {
    pub resource: String,
    pub context: Filters,
}

impl ResourceKey for PageKey {
    fn resource(&self) -> &str {
        &self.resource
    }
}

impl ResourceKey for SearchKey {
    fn resource(&self) -> &str {
        &self.resource
    }
}

impl ResourceKey for OptionsKey {
    fn resource(&self) -> &str {
        &self.resource
    }
}

/// One server page, sanitized for display. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageResult {
    pub items: Vec<DisplayItem>,
    pub total_pages: u32,
    pub current_page: u32,
}

impl PageResult {
    pub fn from_raw(page: RawPage, spec: &ResourceSpec) -> Self {
        Self {
            items: page
                .results
                .iter()
                .map(|raw| DisplayItem::from_raw(raw, spec))
                .collect(),
            total_pages: page.total_pages,
            current_page: page.current_page,
        }
    }
}

/// Matches from a search fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub items: Vec<DisplayItem>,
    /// Pages whose request failed and contributed nothing
    pub failed_pages: Vec<u32>,
}

/// Which of the three controller queries a result or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Primary,
    Search,
    Options,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKind::Primary => write!(f, "page"),
            QueryKind::Search => write!(f, "search"),
            QueryKind::Options => write!(f, "filter options"),
        }
    }
}

impl Serialize for QueryKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    HttpStatus,
    Format,
    AuthExpired,
    Other,
}

/// Cloneable error state stored per query slot and shown to the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

impl From<&LeadboardError> for ErrorInfo {
    fn from(error: &LeadboardError) -> Self {
        let (kind, status) = match error {
            LeadboardError::Network(_) => (ErrorKind::Network, None),
            LeadboardError::HttpStatus { status, .. } => (ErrorKind::HttpStatus, Some(*status)),
            LeadboardError::Format(_) => (ErrorKind::Format, None),
            LeadboardError::AuthExpired { status } => (ErrorKind::AuthExpired, Some(*status)),
            _ => (ErrorKind::Other, None),
        };
        Self {
            kind,
            status,
            message: error.to_string(),
        }
    }
}

impl From<LeadboardError> for ErrorInfo {
    fn from(error: LeadboardError) -> Self {
        ErrorInfo::from(&error)
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_compare_structurally() {
        let mut a = Filters::new();
        a.set("category", "cafe");
        a.set("city", "Leeds");
        let mut b = Filters::new();
        b.set("city", "Leeds");
        b.set("category", "cafe");

        let mut keys = HashSet::new();
        keys.insert(PageKey {
            resource: "shops".to_string(),
            filters: a,
            page: 1,
        });
        assert!(keys.contains(&PageKey {
            resource: "shops".to_string(),
            filters: b.clone(),
            page: 1,
        }));
        assert!(!keys.contains(&PageKey {
            resource: "shops".to_string(),
            filters: b,
            page: 2,
        }));
    }

    #[test]
    fn test_error_info_from_error() {
        let info = ErrorInfo::from(LeadboardError::HttpStatus {
            status: 502,
            message: "Bad Gateway".to_string(),
        });
        assert_eq!(info.kind, ErrorKind::HttpStatus);
        assert_eq!(info.status, Some(502));
        assert_eq!(info.to_string(), "HTTP 502: Bad Gateway");

        let info = ErrorInfo::from(LeadboardError::AuthExpired { status: 401 });
        assert_eq!(info.kind, ErrorKind::AuthExpired);

        let info = ErrorInfo::from(LeadboardError::Network("connection refused".to_string()));
        assert_eq!(info.kind, ErrorKind::Network);
        assert!(info.message.contains("connection refused"));
    }

    #[test]
    fn test_page_result_from_raw() {
        let raw = RawPage::from_json(
            serde_json::json!({"results": [{"id": 1, "shop_name": null}], "totalPages": 4}),
            2,
            None,
        )
        .unwrap();
        let page = PageResult::from_raw(raw, &ResourceSpec::shops());
        assert_eq!(page.total_pages, 4);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.items[0].get("shop_name"), "N/A");
    }
}
