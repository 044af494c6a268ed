//! Client-side search, filtering and deduplication of display items.

use std::collections::HashSet;

use crate::item::{DisplayItem, NOT_AVAILABLE};
use crate::remote::Filters;

/// Case-insensitive substring match.
///
/// Uses `unicase` for correct Unicode case folding (handles Turkish i, German ß, etc.).
pub fn contains_case_insensitive(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let haystack_folded = unicase::UniCase::new(haystack).to_folded_case();
    let needle_folded = unicase::UniCase::new(needle).to_folded_case();
    haystack_folded.contains(&needle_folded)
}

/// An item matches when any of `fields` contains the trimmed search text.
///
/// Blank text matches everything. Placeholder values never match.
pub fn matches_search(item: &DisplayItem, text: &str, fields: &[String]) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return true;
    }
    fields.iter().any(|field| {
        let value = item.get(field);
        value != NOT_AVAILABLE && contains_case_insensitive(value, text)
    })
}

/// Keep the first occurrence of each identity, preserving order.
///
/// Items without an identity are all kept.
pub fn dedup_by_identity(items: Vec<DisplayItem>) -> Vec<DisplayItem> {
    let mut seen: HashSet<String> = HashSet::new();
    items
        .into_iter()
        .filter(|item| !item.has_identity() || seen.insert(item.id.clone()))
        .collect()
}

/// Keep items whose value equals every active client-side filter.
///
/// Only filters named in `keys` are enforced; the rest are server-side only.
pub fn apply_client_filters(
    items: &[DisplayItem],
    filters: &Filters,
    keys: &[String],
) -> Vec<DisplayItem> {
    let active: Vec<(&str, &str)> = filters
        .iter()
        .filter(|(k, _)| keys.iter().any(|key| key.as_str() == *k))
        .collect();

    if active.is_empty() {
        return items.to_vec();
    }

    items
        .iter()
        .filter(|item| {
            active
                .iter()
                .all(|(key, value)| unicase::eq(item.get(key).trim(), value.trim()))
        })
        .cloned()
        .collect()
}
