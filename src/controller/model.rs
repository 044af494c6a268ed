//! List controller model types for testable state management
//!
//! This module separates state (ListState) from view (ListViewModel), so
//! every transition can be unit tested without a runtime or a backend.

use serde::Serialize;

use crate::item::DisplayItem;
use crate::options::FilterOptionSet;
use crate::query::{
    ErrorInfo, OptionsKey, PageKey, PageResult, QueryKind, QuerySlot, SearchKey, SearchResult,
};
use crate::remote::{Filters, ListQuery};
use crate::resource::ResourceSpec;
use crate::search::apply_client_filters;

// ============================================================================
// State Types
// ============================================================================

/// Raw state that changes during user interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState {
    /// Search box contents, echoed immediately
    pub search_input: String,
    /// Search text after the quiet interval; drives the search query
    pub debounced_search: String,
    /// Filters the queries are keyed by
    pub applied_filters: Filters,
    /// Filters being edited in the filter panel
    pub pending_filters: Filters,
    /// 1-based page of the primary listing
    pub page: u32,
    pub filter_panel_open: bool,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            search_input: String::new(),
            debounced_search: String::new(),
            applied_filters: Filters::new(),
            pending_filters: Filters::new(),
            page: 1,
            filter_panel_open: false,
        }
    }
}

impl ListState {
    /// Restore state persisted as a `ListQuery`.
    pub fn from_query(query: &ListQuery) -> Self {
        let search = query.search_text.trim().to_string();
        Self {
            search_input: search.clone(),
            debounced_search: search,
            applied_filters: query.filters.clone(),
            pending_filters: query.filters.clone(),
            page: query.page.max(1),
            filter_panel_open: false,
        }
    }

    pub fn to_query(&self) -> ListQuery {
        ListQuery::new(self.applied_filters.clone(), self.page)
            .with_search(self.debounced_search.clone())
    }

    pub fn search_active(&self) -> bool {
        !self.debounced_search.trim().is_empty()
    }
}

// ============================================================================
// Action Types
// ============================================================================

/// All user-driven transitions of the list state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListAction {
    // Search
    /// Update the raw search input
    SetSearchInput(String),
    /// The debounce interval elapsed with this input
    PromoteSearch(String),
    /// Clear both raw and debounced search
    ClearSearch,

    // Filters
    /// Show the filter panel, seeding it with the applied filters
    OpenFilterPanel,
    /// Hide the filter panel, discarding pending edits
    CloseFilterPanel,
    /// Edit one pending filter; an empty value removes it
    ChangeFilterField { key: String, value: String },
    /// Commit pending filters
    ApplyFilters,
    /// Change an applied context filter directly (category tabs)
    SwitchContext { key: String, value: String },

    // Pagination
    /// Go to `page` if it lies within `1..=total_pages`
    ChangePage { page: u32, total_pages: u32 },
}

/// Set `key` in `filters` and drop its hierarchical dependents if it changed.
fn set_with_dependents(filters: &mut Filters, key: &str, value: &str, spec: &ResourceSpec) {
    let before = filters.get(key).map(str::to_string);
    filters.set(key, value);
    if filters.get(key).map(str::to_string) != before {
        for child in spec.dependent_filters(key) {
            filters.remove(&child);
        }
    }
}

fn clear_search(state: &mut ListState) {
    state.search_input.clear();
    state.debounced_search.clear();
}

/// Pure function: apply action to state (reducer pattern)
///
/// Contains only state transitions. Fetching, debouncing and cancellation
/// are driven by the controller from the resulting state.
pub fn reduce_list_state(mut state: ListState, action: ListAction, spec: &ResourceSpec) -> ListState {
    match action {
        ListAction::SetSearchInput(text) => {
            state.search_input = text;
        }
        ListAction::PromoteSearch(text) => {
            state.debounced_search = text.trim().to_string();
        }
        ListAction::ClearSearch => clear_search(&mut state),

        ListAction::OpenFilterPanel => {
            state.pending_filters = state.applied_filters.clone();
            state.filter_panel_open = true;
        }
        ListAction::CloseFilterPanel => {
            state.pending_filters = state.applied_filters.clone();
            state.filter_panel_open = false;
        }
        ListAction::ChangeFilterField { key, value } => {
            set_with_dependents(&mut state.pending_filters, &key, &value, spec);
        }
        ListAction::ApplyFilters => {
            // Search scope is relative to the filter context; never carry it over
            if state.pending_filters != state.applied_filters {
                clear_search(&mut state);
            }
            state.applied_filters = state.pending_filters.clone();
            state.page = 1;
            state.filter_panel_open = false;
        }
        ListAction::SwitchContext { key, value } => {
            let mut applied = state.applied_filters.clone();
            set_with_dependents(&mut applied, &key, &value, spec);
            if applied != state.applied_filters {
                clear_search(&mut state);
                state.applied_filters = applied;
                state.page = 1;
            }
            state.pending_filters = state.applied_filters.clone();
        }

        ListAction::ChangePage { page, total_pages } => {
            if page >= 1 && page <= total_pages && page != state.page {
                state.page = page;
            }
        }
    }

    state
}

// ============================================================================
// View Model Types
// ============================================================================

/// Whether the list shows a server page or aggregated search matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    Page,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub total_pages: u32,
    /// Pagination controls only operate in page mode
    pub enabled: bool,
}

impl Pagination {
    pub fn has_previous(&self) -> bool {
        self.enabled && self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.enabled && self.page < self.total_pages
    }
}

/// Computed view model exposed to the view layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListViewModel {
    pub display_items: Vec<DisplayItem>,
    pub mode: DisplayMode,
    /// A primary or search fetch is in flight
    pub is_loading: bool,
    /// No data has been committed yet; render a full-page loading state
    pub is_initial_load: bool,
    pub is_searching: bool,
    pub error: Option<ErrorInfo>,
    /// Which query `error` came from, for the retry affordance
    pub error_source: Option<QueryKind>,
    pub pagination: Pagination,
    pub filter_options: FilterOptionSet,
    /// Search pages that failed and contributed no matches
    pub failed_search_pages: Vec<u32>,
    pub search_input: String,
    pub applied_filters: Filters,
    pub pending_filters: Filters,
    pub filter_panel_open: bool,
}

/// The three query slots a view model is computed from.
#[derive(Debug, Clone, Copy)]
pub struct QuerySlots<'a> {
    pub primary: &'a QuerySlot<PageKey, PageResult>,
    pub search: &'a QuerySlot<SearchKey, SearchResult>,
    pub options: &'a QuerySlot<OptionsKey, FilterOptionSet>,
}

/// Page count of the last primary result for the applied filters.
///
/// Zero until the applied filters have a result, so pagination never offers
/// pages counted under different filters.
pub fn known_total_pages(state: &ListState, primary: &QuerySlot<PageKey, PageResult>) -> u32 {
    match primary.committed() {
        Some((key, page)) if key.filters == state.applied_filters => page.total_pages,
        _ => 0,
    }
}

/// Pure function: compute view model from state and query slots
pub fn compute_list_view_model(
    state: &ListState,
    slots: QuerySlots<'_>,
    spec: &ResourceSpec,
) -> ListViewModel {
    let search_requested = state.search_active();
    let search_data = if search_requested {
        slots.search.data()
    } else {
        None
    };

    let (mode, source_items, failed_search_pages) = match search_data {
        Some(result) => (
            DisplayMode::Search,
            result.items.as_slice(),
            result.failed_pages.clone(),
        ),
        None => (
            DisplayMode::Page,
            slots
                .primary
                .data()
                .map(|page| page.items.as_slice())
                .unwrap_or(&[]),
            Vec::new(),
        ),
    };

    let display_items =
        apply_client_filters(source_items, &state.applied_filters, &spec.client_filter_keys);

    let is_searching = search_requested && slots.search.is_loading();
    let is_loading = slots.primary.is_loading() || is_searching;
    let is_initial_load = mode == DisplayMode::Page
        && slots.primary.data().is_none()
        && slots.primary.is_loading();

    // A primary failure is hidden while search matches are on screen
    let (error, error_source) = match (search_requested, slots.search.error(), slots.primary.error())
    {
        (true, Some(e), _) => (Some(e.clone()), Some(QueryKind::Search)),
        (_, _, Some(e)) if mode == DisplayMode::Page => (Some(e.clone()), Some(QueryKind::Primary)),
        _ => (None, None),
    };

    let total_pages = known_total_pages(state, slots.primary);

    ListViewModel {
        display_items,
        mode,
        is_loading,
        is_initial_load,
        is_searching,
        error,
        error_source,
        pagination: Pagination {
            page: state.page,
            total_pages,
            enabled: mode == DisplayMode::Page,
        },
        // Options errors are silent: the dropdowns are simply empty
        filter_options: slots
            .options
            .data()
            .map(|options| (**options).clone())
            .unwrap_or_default(),
        failed_search_pages,
        search_input: state.search_input.clone(),
        applied_filters: state.applied_filters.clone(),
        pending_filters: state.pending_filters.clone(),
        filter_panel_open: state.filter_panel_open,
    }
}
