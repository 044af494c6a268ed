//! Partial-failure tolerant multi-page fetches.
//!
//! The backend cannot search the full result set, so search and filter
//! options fetch several pages concurrently and aggregate them client-side.
//! A failed page contributes nothing; only a failure of every page is an
//! error.

use futures::future::join_all;

use crate::config::QuerySettings;
use crate::error::Result;
use crate::remote::{Filters, ListBackend, ListQuery, RawItem};

/// Which pages a fan-out requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOutPolicy {
    /// Fixed page count used when the total is unknown
    pub pages: u32,
    /// Request every known page, up to `max_pages`
    pub use_known_total: bool,
    pub max_pages: u32,
}

impl Default for FanOutPolicy {
    fn default() -> Self {
        Self::from_settings(&QuerySettings::default())
    }
}

impl FanOutPolicy {
    pub fn from_settings(settings: &QuerySettings) -> Self {
        Self {
            pages: settings.search_pages.max(1),
            use_known_total: settings.search_all_known_pages,
            max_pages: settings.max_search_pages.max(1),
        }
    }

    /// Page numbers to request, always starting at 1 and never empty.
    pub fn pages_for(&self, known_total: Option<u32>) -> Vec<u32> {
        let last = match known_total {
            Some(total) if self.use_known_total => total.min(self.max_pages),
            _ => self.pages,
        };
        (1..=last.max(1)).collect()
    }
}

/// Aggregated outcome of a fan-out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanOutResult {
    /// Items of every successful page, in page order
    pub items: Vec<RawItem>,
    pub failed_pages: Vec<u32>,
    /// Largest page count reported by any successful page
    pub total_pages: Option<u32>,
}

/// Fetch `pages` of `resource` concurrently and flatten the successes.
///
/// Errors only when every requested page fails, returning the first failure.
pub async fn fetch_pages_tolerant<B: ListBackend>(
    backend: &B,
    resource: &str,
    filters: &Filters,
    search: &str,
    pages: &[u32],
) -> Result<FanOutResult> {
    let queries: Vec<ListQuery> = pages
        .iter()
        .map(|page| ListQuery::new(filters.clone(), *page).with_search(search))
        .collect();

    let responses = join_all(
        queries
            .iter()
            .map(|query| backend.fetch_page(resource, query)),
    )
    .await;

    let mut result = FanOutResult::default();
    let mut first_error = None;

    for (page, response) in pages.iter().zip(responses) {
        match response {
            Ok(raw) => {
                result.total_pages = Some(result.total_pages.unwrap_or(0).max(raw.total_pages));
                result.items.extend(raw.results);
            }
            Err(e) => {
                tracing::warn!(resource, page, error = %e, "page fetch failed, skipping");
                result.failed_pages.push(*page);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if result.failed_pages.len() == pages.len()
        && let Some(e) = first_error
    {
        return Err(e);
    }

    Ok(result)
}
