//! Generic remote list controller.
//!
//! Owns the search, filter and page state of one listing and keeps three
//! queries in step with it:
//!
//! - **primary**: one server page keyed by `(applied filters, page)`
//! - **search**: a multi-page fan-out keyed by `(applied filters, debounced search)`,
//!   enabled only while the debounced search is non-empty
//! - **options**: a fan-out keyed by the context subset of the applied
//!   filters, feeding the filter dropdowns
//!
//! Fetches run as spawned tokio tasks that report back over a channel. The
//! owner drives the controller with `process_next` (or `settle`), which
//! applies completions and fires the search debounce. A superseded task is
//! aborted, and any result it still delivers is dropped by the slot's ticket
//! check.

pub mod debounce;
pub mod model;

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::Config;
use crate::item::DisplayItem;
use crate::options::FilterOptionSet;
use crate::query::{
    ErrorInfo, ErrorKind, FanOutPolicy, OptionsKey, PageKey, PageResult, QueryClient, QueryKind, QuerySlot,
    SearchKey, SearchResult, Ticket, fetch_pages_tolerant,
};
use crate::remote::{ListBackend, ListQuery, RESERVED_PARAMS};
use crate::resource::ResourceSpec;
use crate::search::{dedup_by_identity, matches_search};

pub use debounce::Debounce;
pub use model::{
    DisplayMode, ListAction, ListState, ListViewModel, Pagination, QuerySlots,
    compute_list_view_model, known_total_pages, reduce_list_state,
};

/// Timing and fan-out settings of one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    pub debounce: Duration,
    pub fan_out: FanOutPolicy,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            fan_out: FanOutPolicy::default(),
        }
    }
}

impl ControllerOptions {
    pub fn from_config(config: &Config, spec: &ResourceSpec) -> Self {
        Self {
            debounce: config.debounce_for(spec),
            fan_out: FanOutPolicy::from_settings(&config.query),
        }
    }
}

/// Something observable that happened while driving the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// The debounce elapsed and this text became the active search
    SearchPromoted(String),
    PageLoaded { page: u32, total_pages: u32 },
    SearchLoaded { matches: usize, failed_pages: Vec<u32> },
    OptionsLoaded,
    FetchFailed { kind: QueryKind, error: ErrorInfo },
    /// A result arrived for a superseded query and was dropped
    Discarded(QueryKind),
}

/// Completion message from a fetch task.
enum FetchEvent {
    Page {
        ticket: Ticket,
        key: PageKey,
        result: Result<Arc<PageResult>, ErrorInfo>,
    },
    Search {
        ticket: Ticket,
        key: SearchKey,
        result: Result<Arc<SearchResult>, ErrorInfo>,
    },
    Options {
        ticket: Ticket,
        key: OptionsKey,
        result: Result<Arc<FilterOptionSet>, ErrorInfo>,
    },
    /// The task panicked before it could report a result
    Crashed { kind: QueryKind, ticket: Ticket },
}

pub struct RemoteListController<B: ListBackend> {
    backend: Arc<B>,
    client: Arc<QueryClient>,
    spec: Arc<ResourceSpec>,
    fan_out: FanOutPolicy,
    state: ListState,
    debounce: Debounce<String>,
    primary: QuerySlot<PageKey, PageResult>,
    search: QuerySlot<SearchKey, SearchResult>,
    options: QuerySlot<OptionsKey, FilterOptionSet>,
    tasks: HashMap<QueryKind, JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<FetchEvent>,
    events_rx: mpsc::UnboundedReceiver<FetchEvent>,
}

impl<B: ListBackend> RemoteListController<B> {
    pub fn new(
        backend: Arc<B>,
        client: Arc<QueryClient>,
        spec: ResourceSpec,
        options: ControllerOptions,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            client,
            spec: Arc::new(spec),
            fan_out: options.fan_out,
            state: ListState::default(),
            debounce: Debounce::new(options.debounce),
            primary: QuerySlot::new(),
            search: QuerySlot::new(),
            options: QuerySlot::new(),
            tasks: HashMap::new(),
            events_tx,
            events_rx,
        }
    }

    /// Restore list state persisted as a query (e.g. from a URL).
    ///
    /// Filters that collide with protocol parameters are dropped.
    pub fn with_initial_query(mut self, mut query: ListQuery) -> Self {
        for reserved in RESERVED_PARAMS {
            if query.filters.remove(reserved).is_some() {
                tracing::warn!(filter = reserved, "ignoring reserved filter in restored query");
            }
        }
        self.state = ListState::from_query(&query);
        self
    }

    /// Issue the initial queries.
    pub fn start(&mut self) {
        self.sync_queries();
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Echo the search input and restart the debounce. No network effect.
    pub fn set_search_input(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.debounce.schedule(text.clone(), Instant::now());
        self.dispatch(ListAction::SetSearchInput(text));
    }

    pub fn clear_search(&mut self) {
        self.debounce.cancel();
        self.dispatch(ListAction::ClearSearch);
        self.sync_queries();
    }

    pub fn open_filter_panel(&mut self) {
        self.dispatch(ListAction::OpenFilterPanel);
    }

    /// Close the panel, discarding pending edits.
    pub fn close_filter_panel(&mut self) {
        self.dispatch(ListAction::CloseFilterPanel);
    }

    /// Edit a pending filter. Changing a parent filter clears its children.
    pub fn change_filter_field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.dispatch(ListAction::ChangeFilterField {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Commit pending filters and go back to page 1.
    pub fn apply_filters(&mut self) {
        let before = self.state.applied_filters.clone();
        self.dispatch(ListAction::ApplyFilters);
        if self.state.applied_filters != before {
            self.debounce.cancel();
        }
        self.sync_queries();
    }

    /// Change an applied context filter (e.g. a category tab) immediately.
    pub fn switch_context(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let before = self.state.applied_filters.clone();
        self.dispatch(ListAction::SwitchContext {
            key: key.into(),
            value: value.into(),
        });
        if self.state.applied_filters != before {
            self.debounce.cancel();
        }
        self.sync_queries();
    }

    /// Go to `page`. Ignored outside `1..=total_pages`, in search mode, or
    /// when `page` is already current. Returns whether the page changed.
    pub fn change_page(&mut self, page: u32) -> bool {
        if self.view_mode() == DisplayMode::Search {
            return false;
        }
        let before = self.state.page;
        self.dispatch(ListAction::ChangePage {
            page,
            total_pages: self.known_total_pages(),
        });
        let changed = self.state.page != before;
        if changed {
            self.sync_queries();
        }
        changed
    }

    /// Re-issue only the primary or search fetch that failed.
    pub fn retry(&mut self) {
        if self.search.error().is_some() && self.search.is_enabled() {
            self.sync_search(true);
        }
        if self.primary.error().is_some() {
            self.sync_primary(true);
        }
    }

    /// Drop this resource's cached queries and refetch.
    pub fn refresh(&mut self) {
        self.client.invalidate_resource(&self.spec.name);
        self.sync_primary(true);
        self.sync_search(true);
        self.sync_options(true);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The current query, for persisting list state.
    pub fn query(&self) -> ListQuery {
        self.state.to_query()
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    pub fn view(&self) -> ListViewModel {
        compute_list_view_model(&self.state, self.slots(), &self.spec)
    }

    pub fn display_items(&self) -> Vec<DisplayItem> {
        self.view().display_items
    }

    /// Nothing in flight and no debounce pending.
    pub fn is_idle(&self) -> bool {
        !self.debounce.is_pending() && !self.any_in_flight()
    }

    fn slots(&self) -> QuerySlots<'_> {
        QuerySlots {
            primary: &self.primary,
            search: &self.search,
            options: &self.options,
        }
    }

    fn view_mode(&self) -> DisplayMode {
        if self.state.search_active() && self.search.data().is_some() {
            DisplayMode::Search
        } else {
            DisplayMode::Page
        }
    }

    fn any_in_flight(&self) -> bool {
        self.primary.is_loading() || self.search.is_loading() || self.options.is_loading()
    }

    fn known_total_pages(&self) -> u32 {
        model::known_total_pages(&self.state, &self.primary)
    }

    fn dispatch(&mut self, action: ListAction) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce_list_state(state, action, &self.spec);
    }

    // ========================================================================
    // Driving
    // ========================================================================

    /// Wait for the next fetch completion or debounce deadline and apply it.
    ///
    /// Returns `None` once nothing is in flight and no debounce is pending.
    pub async fn process_next(&mut self) -> Option<ControllerEvent> {
        loop {
            if let Ok(event) = self.events_rx.try_recv() {
                return Some(self.apply_fetch_event(event));
            }
            if self.is_idle() {
                return None;
            }

            let deadline = self.debounce.deadline();
            tokio::select! {
                biased;
                Some(event) = self.events_rx.recv() => {
                    return Some(self.apply_fetch_event(event));
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(event) = self.fire_debounce() {
                        return Some(event);
                    }
                }
                else => return None,
            }
        }
    }

    /// Drive until idle, returning everything that happened.
    pub async fn settle(&mut self) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.process_next().await {
            events.push(event);
        }
        events
    }

    fn fire_debounce(&mut self) -> Option<ControllerEvent> {
        let text = self.debounce.take_due(Instant::now())?;
        self.dispatch(ListAction::PromoteSearch(text));
        let promoted = self.state.debounced_search.clone();
        tracing::debug!(resource = %self.spec.name, search = %promoted, "search promoted");
        self.sync_queries();
        Some(ControllerEvent::SearchPromoted(promoted))
    }

    fn apply_fetch_event(&mut self, event: FetchEvent) -> ControllerEvent {
        match event {
            FetchEvent::Page {
                ticket,
                key,
                result,
            } => {
                let outcome = match &result {
                    Ok(page) => ControllerEvent::PageLoaded {
                        page: page.current_page,
                        total_pages: page.total_pages,
                    },
                    Err(error) => ControllerEvent::FetchFailed {
                        kind: QueryKind::Primary,
                        error: error.clone(),
                    },
                };
                self.commit(QueryKind::Primary, ticket, outcome, |this| {
                    this.primary.resolve(ticket, &key, result)
                })
            }
            FetchEvent::Search {
                ticket,
                key,
                result,
            } => {
                let outcome = match &result {
                    Ok(found) => ControllerEvent::SearchLoaded {
                        matches: found.items.len(),
                        failed_pages: found.failed_pages.clone(),
                    },
                    Err(error) => ControllerEvent::FetchFailed {
                        kind: QueryKind::Search,
                        error: error.clone(),
                    },
                };
                self.commit(QueryKind::Search, ticket, outcome, |this| {
                    this.search.resolve(ticket, &key, result)
                })
            }
            FetchEvent::Options {
                ticket,
                key,
                result,
            } => {
                let outcome = match &result {
                    Ok(_) => ControllerEvent::OptionsLoaded,
                    Err(error) => ControllerEvent::FetchFailed {
                        kind: QueryKind::Options,
                        error: error.clone(),
                    },
                };
                self.commit(QueryKind::Options, ticket, outcome, |this| {
                    this.options.resolve(ticket, &key, result)
                })
            }
            FetchEvent::Crashed { kind, ticket } => {
                let error = ErrorInfo {
                    kind: ErrorKind::Other,
                    status: None,
                    message: format!("{kind} fetch stopped unexpectedly"),
                };
                let outcome = ControllerEvent::FetchFailed {
                    kind,
                    error: error.clone(),
                };
                self.commit(kind, ticket, outcome, |this| match kind {
                    QueryKind::Primary => this.primary.fail(ticket, error),
                    QueryKind::Search => this.search.fail(ticket, error),
                    QueryKind::Options => this.options.fail(ticket, error),
                })
            }
        }
    }

    fn commit(
        &mut self,
        kind: QueryKind,
        ticket: Ticket,
        outcome: ControllerEvent,
        resolve: impl FnOnce(&mut Self) -> bool,
    ) -> ControllerEvent {
        if !resolve(self) {
            tracing::debug!(resource = %self.spec.name, %kind, generation = ticket.generation(), "discarded stale result");
            return ControllerEvent::Discarded(kind);
        }
        self.tasks.remove(&kind);
        if let ControllerEvent::FetchFailed { error, .. } = &outcome {
            tracing::warn!(resource = %self.spec.name, %kind, %error, "fetch failed");
        }
        outcome
    }

    // ========================================================================
    // Query synchronization
    // ========================================================================

    fn sync_queries(&mut self) {
        self.sync_primary(false);
        self.sync_search(false);
        self.sync_options(false);
    }

    fn abort_task(&mut self, kind: QueryKind) {
        if let Some(handle) = self.tasks.remove(&kind) {
            handle.abort();
        }
    }

    /// Run a fetch and deliver its completion. A panic inside the fetch is
    /// reported as a failure for `ticket` so the slot never stays in flight.
    fn spawn_task<F>(&mut self, kind: QueryKind, ticket: Ticket, task: F)
    where
        F: std::future::Future<Output = FetchEvent> + Send + 'static,
    {
        self.abort_task(kind);
        let tx = self.events_tx.clone();
        let handle = tokio::spawn(async move {
            let event = match AssertUnwindSafe(task).catch_unwind().await {
                Ok(event) => event,
                Err(_) => {
                    tracing::error!(%kind, "fetch task panicked");
                    FetchEvent::Crashed { kind, ticket }
                }
            };
            let _ = tx.send(event);
        });
        self.tasks.insert(kind, handle);
    }

    fn page_key(&self) -> PageKey {
        PageKey {
            resource: self.spec.name.clone(),
            filters: self.state.applied_filters.clone(),
            page: self.state.page,
        }
    }

    fn sync_primary(&mut self, force: bool) {
        let key = self.page_key();
        if !force && self.primary.key() == Some(&key) {
            return;
        }

        if !force && let Some(cached) = self.client.pages.get_fresh(&key) {
            self.abort_task(QueryKind::Primary);
            self.primary.hydrate(key, cached);
            return;
        }

        let ticket = match self.client.pages.get_stale(&key) {
            Some(stale) => self.primary.revalidate(key.clone(), stale),
            None => self.primary.begin(key.clone()),
        };
        tracing::debug!(resource = %key.resource, page = key.page, "issuing page query");

        let backend = Arc::clone(&self.backend);
        let client = Arc::clone(&self.client);
        let spec = Arc::clone(&self.spec);
        self.spawn_task(QueryKind::Primary, ticket, async move {
            let query = ListQuery::new(key.filters.clone(), key.page);
            let result = match backend.fetch_page(&key.resource, &query).await {
                Ok(raw) => {
                    let page = Arc::new(PageResult::from_raw(raw, &spec));
                    client.pages.insert(key.clone(), Arc::clone(&page));
                    Ok(page)
                }
                Err(e) => Err(ErrorInfo::from(e)),
            };
            FetchEvent::Page {
                ticket,
                key,
                result,
            }
        });
    }

    fn sync_search(&mut self, force: bool) {
        let text = self.state.debounced_search.trim().to_string();
        if text.is_empty() {
            self.abort_task(QueryKind::Search);
            if self.search.is_enabled() || self.search.data().is_some() {
                self.search.clear();
            }
            return;
        }

        let key = SearchKey {
            resource: self.spec.name.clone(),
            filters: self.state.applied_filters.clone(),
            search: text,
        };
        if !force && self.search.key() == Some(&key) {
            return;
        }

        if !force && let Some(cached) = self.client.searches.get_fresh(&key) {
            self.abort_task(QueryKind::Search);
            self.search.hydrate(key, cached);
            return;
        }

        let pages = self.fan_out.pages_for(match self.known_total_pages() {
            0 => None,
            total => Some(total),
        });
        let ticket = match self.client.searches.get_stale(&key) {
            Some(stale) => self.search.revalidate(key.clone(), stale),
            None => self.search.begin(key.clone()),
        };
        tracing::debug!(resource = %key.resource, search = %key.search, ?pages, "issuing search fan-out");

        let backend = Arc::clone(&self.backend);
        let client = Arc::clone(&self.client);
        let spec = Arc::clone(&self.spec);
        self.spawn_task(QueryKind::Search, ticket, async move {
            let server_text = if spec.server_search { key.search.as_str() } else { "" };
            let fetched =
                fetch_pages_tolerant(&*backend, &key.resource, &key.filters, server_text, &pages)
                    .await;
            let result = match fetched {
                Ok(fan_out) => {
                    let items: Vec<DisplayItem> = fan_out
                        .items
                        .iter()
                        .map(|raw| DisplayItem::from_raw(raw, &spec))
                        .filter(|item| {
                            // Without search fields the server's matching is trusted
                            spec.search_fields.is_empty()
                                || matches_search(item, &key.search, &spec.search_fields)
                        })
                        .collect();
                    let found = Arc::new(SearchResult {
                        items: dedup_by_identity(items),
                        failed_pages: fan_out.failed_pages,
                    });
                    client.searches.insert(key.clone(), Arc::clone(&found));
                    Ok(found)
                }
                Err(e) => Err(ErrorInfo::from(e)),
            };
            FetchEvent::Search {
                ticket,
                key,
                result,
            }
        });
    }

    fn sync_options(&mut self, force: bool) {
        let key = OptionsKey {
            resource: self.spec.name.clone(),
            context: self.state.applied_filters.subset(&self.spec.context_keys),
        };
        if !force && self.options.key() == Some(&key) {
            return;
        }

        if !force && let Some(cached) = self.client.options.get_fresh(&key) {
            self.abort_task(QueryKind::Options);
            self.options.hydrate(key, cached);
            return;
        }

        let pages = self.fan_out.pages_for(None);
        let ticket = match self.client.options.get_stale(&key) {
            Some(stale) => self.options.revalidate(key.clone(), stale),
            None => self.options.begin(key.clone()),
        };
        tracing::debug!(resource = %key.resource, ?pages, "issuing filter options fan-out");

        let backend = Arc::clone(&self.backend);
        let client = Arc::clone(&self.client);
        let spec = Arc::clone(&self.spec);
        self.spawn_task(QueryKind::Options, ticket, async move {
            let fetched =
                fetch_pages_tolerant(&*backend, &key.resource, &key.context, "", &pages).await;
            let result = match fetched {
                Ok(fan_out) => {
                    let items: Vec<DisplayItem> = fan_out
                        .items
                        .iter()
                        .map(|raw| DisplayItem::from_raw(raw, &spec))
                        .collect();
                    let options = Arc::new(FilterOptionSet::from_items(&items, &spec.option_fields));
                    client.options.insert(key.clone(), Arc::clone(&options));
                    Ok(options)
                }
                Err(e) => Err(ErrorInfo::from(e)),
            };
            FetchEvent::Options {
                ticket,
                key,
                result,
            }
        });
    }
}

impl<B: ListBackend> Drop for RemoteListController<B> {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}
