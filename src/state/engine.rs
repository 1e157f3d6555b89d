//! The table state engine
//!
//! Owns the records and every piece of table state, re-derives the record
//! views after each mutation and queues change events for the host.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::TableConfig;
use crate::data::data_view::{derive_rows, DerivedRows};
use crate::data::pagination::{ExternalPagination, PageRequest, PaginationInfo, DEFAULT_PAGE_SIZE};
use crate::data::record::Record;
use crate::debouncer::{SearchDebouncer, SearchInput, DEFAULT_SEARCH_DEBOUNCE_MS};
use crate::filter::{FilterKind, FilterSet, FilterValue, RecordFilter};
use crate::state::dispatcher::{EventDispatcher, TableSubscriber};
use crate::state::events::{diff, EmittedState, TableEvent};
use crate::state::selection::{BulkAction, BulkActions, BulkOutcome, Selection};
use crate::state::staging::{FilterSnapshot, FilterStaging};
use crate::state::{InitialState, SortDirection, SortSpec, TableState};

/// Knobs for one engine instance
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub default_page_size: usize,
    pub page_size_options: Vec<usize>,
    /// Fields the global search looks at
    pub search_keys: Vec<String>,
    pub search_debounce_ms: u64,
    pub min_search_length: usize,
    pub prune_selection_on_data_change: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            page_size_options: vec![5, 10, 15, 20, 50, 100],
            search_keys: Vec::new(),
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            min_search_length: 0,
            prune_selection_on_data_change: true,
        }
    }
}

impl EngineOptions {
    pub fn with_search_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size;
        self
    }
}

impl From<&TableConfig> for EngineOptions {
    fn from(config: &TableConfig) -> Self {
        Self {
            default_page_size: config.default_page_size,
            page_size_options: config.page_size_options.clone(),
            search_keys: Vec::new(),
            search_debounce_ms: config.search_debounce_ms,
            min_search_length: config.min_search_length,
            prune_selection_on_data_change: config.prune_selection_on_data_change,
        }
    }
}

/// Most events held between two drains; older ones are dropped first
pub const MAX_QUEUED_EVENTS: usize = 256;

/// Search, filter, sort, pagination and selection state over a set of records.
///
/// Every mutation re-derives the `filtered`, `sorted` and `paginated` views
/// and queues an event for each emitted value that changed. Hosts must
/// drain the queue with [`TableStateEngine::flush_events`] or subscribe and
/// call [`TableStateEngine::dispatch`]. An undrained queue keeps only the
/// newest [`MAX_QUEUED_EVENTS`] events.
pub struct TableStateEngine<T> {
    options: EngineOptions,
    records: Arc<Vec<T>>,
    staging: FilterStaging,
    search: SearchDebouncer,
    sort: Option<SortSpec>,
    page: PageRequest,
    external: Option<ExternalPagination>,
    selection: Selection<T>,
    bulk_actions: BulkActions<T>,
    derived: DerivedRows,
    state: TableState<T>,
    emitted: EmittedState<T>,
    queued: VecDeque<TableEvent<T>>,
    dispatcher: EventDispatcher<T>,
    disposed: bool,
}

impl<T: Record + Clone + PartialEq> TableStateEngine<T> {
    pub fn new(records: Vec<T>, options: EngineOptions) -> Self {
        let initial = InitialState::with_page_size(options.default_page_size);
        Self::with_initial_state(records, options, initial)
    }

    /// Create an engine seeded with persisted state, e.g. decoded from a URL
    pub fn with_initial_state(records: Vec<T>, options: EngineOptions, initial: InitialState) -> Self {
        Self::from_shared(Arc::new(records), options, initial)
    }

    pub fn from_shared(records: Arc<Vec<T>>, mut options: EngineOptions, initial: InitialState) -> Self {
        if options.default_page_size == 0 {
            warn!(target: "engine", "Default page size 0 is invalid, using {}", DEFAULT_PAGE_SIZE);
            options.default_page_size = DEFAULT_PAGE_SIZE;
        }
        let page = sanitize_page(initial.page, options.default_page_size);
        let mut search = SearchDebouncer::new(options.search_debounce_ms, options.min_search_length);
        search.set_input(initial.search.clone());

        let emitted = EmittedState::baseline(options.default_page_size);
        let empty_state = TableState {
            search: String::new(),
            sort: None,
            filters: FilterSet::default(),
            pagination: PaginationInfo::empty(page.page_size),
            filtered: Vec::new(),
            sorted: Vec::new(),
            paginated: Vec::new(),
            selected: Vec::new(),
        };

        let mut engine = Self {
            staging: FilterStaging::new(FilterSnapshot::new(initial.search, initial.filters)),
            search,
            sort: initial.sort,
            page,
            external: None,
            selection: Selection::new(),
            bulk_actions: BulkActions::default(),
            derived: DerivedRows {
                filtered: Vec::new(),
                sorted: Vec::new(),
                paginated: Vec::new(),
                pagination: empty_state.pagination,
            },
            state: empty_state,
            emitted,
            queued: VecDeque::new(),
            dispatcher: EventDispatcher::new(),
            disposed: false,
            records,
            options,
        };
        info!(
            target: "engine",
            "Table engine created with {} records, page {} of size {}",
            engine.records.len(),
            engine.page.current_page,
            engine.page.page_size
        );
        engine.refresh();
        engine
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn records(&self) -> &Arc<Vec<T>> {
        &self.records
    }

    /// Replace the records. Selected records no longer present are dropped
    /// unless pruning is switched off.
    pub fn set_data(&mut self, records: Vec<T>) {
        self.set_shared_data(Arc::new(records));
    }

    pub fn set_shared_data(&mut self, records: Arc<Vec<T>>) {
        self.records = records;
        if self.options.prune_selection_on_data_change {
            let pruned = self.selection.prune(&self.records);
            if pruned > 0 {
                debug!(target: "engine", "Pruned {} stale selected records", pruned);
            }
        }
        self.refresh();
    }

    /// Switch to server-driven mode (`Some`) or back to local derivation (`None`).
    ///
    /// In server-driven mode the records already are the requested page.
    pub fn set_external_pagination(&mut self, external: Option<ExternalPagination>) {
        if let Some(ext) = &external {
            self.page = sanitize_page(
                PageRequest::new(ext.current_page, ext.page_size),
                self.options.default_page_size,
            );
        }
        self.external = external;
        self.refresh();
    }

    pub fn is_server_driven(&self) -> bool {
        self.external.is_some()
    }

    // Search

    /// Text currently in the search box, committed or not
    pub fn search_input(&self) -> &str {
        self.search.input()
    }

    /// A keystroke in the search box; the commit is debounced
    pub fn on_search_input(&mut self, value: impl Into<String>) -> SearchInput {
        self.on_search_input_at(value, Instant::now())
    }

    pub fn on_search_input_at(&mut self, value: impl Into<String>, now: Instant) -> SearchInput {
        if self.disposed {
            self.search.set_input(value);
            return SearchInput::TooShort;
        }
        self.search.on_input_at(value, now)
    }

    /// Enter: commit the search box immediately
    pub fn submit_search(&mut self) {
        if self.disposed {
            return;
        }
        let term = self.search.submit();
        self.commit_search(term);
    }

    /// Commit the search if the debounce delay has passed. Returns whether it fired.
    pub fn poll_debounce(&mut self) -> bool {
        self.poll_debounce_at(Instant::now())
    }

    pub fn poll_debounce_at(&mut self, now: Instant) -> bool {
        if self.disposed {
            return false;
        }
        match self.search.poll_at(now) {
            Some(term) => {
                self.commit_search(term);
                true
            }
            None => false,
        }
    }

    pub fn has_pending_search(&self) -> bool {
        self.search.is_pending()
    }

    /// Stop the engine: any scheduled search commit is dropped
    pub fn dispose(&mut self) {
        if self.search.is_pending() {
            debug!(target: "debounce", "Dropping scheduled search on dispose");
        }
        self.search.cancel();
        self.disposed = true;
    }

    fn commit_search(&mut self, term: String) {
        if !self.staging.set_search(term) {
            return;
        }
        debug!(target: "engine", "Search committed: {:?}", self.staging.applied().search);
        self.reset_to_first_page();
        self.refresh();
    }

    // Sort

    /// Header click: ascending first, then flip while the same field is clicked
    pub fn sort_by(&mut self, key: &str) {
        let direction = match &self.sort {
            Some(current) if current.key == key && current.direction == SortDirection::Asc => {
                SortDirection::Desc
            }
            _ => SortDirection::Asc,
        };
        self.set_sort(Some(SortSpec::new(key, direction)));
    }

    pub fn set_sort(&mut self, sort: Option<SortSpec>) {
        if self.sort == sort {
            return;
        }
        debug!(target: "engine", "Sort changed to {:?}", sort);
        self.sort = sort;
        self.refresh();
    }

    pub fn clear_sort(&mut self) {
        self.set_sort(None);
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    // Filters

    pub fn pending_filters(&self) -> &FilterSet {
        self.staging.pending()
    }

    pub fn applied_filters(&self) -> &FilterSet {
        &self.staging.applied().filters
    }

    pub fn set_pending_filter(&mut self, field: &str, value: FilterValue) {
        self.staging.set_pending(field, value);
    }

    pub fn clear_pending_filter(&mut self, kind: FilterKind, field: &str) {
        self.staging.clear_pending(kind, field);
    }

    pub fn toggle_pending_select(&mut self, field: &str, value: &str, checked: bool) {
        self.staging.toggle_pending_select(field, value, checked);
    }

    pub fn has_pending_filter_changes(&self) -> bool {
        self.staging.has_pending_changes()
    }

    /// Badge count of applied filters
    pub fn active_filter_count(&self) -> usize {
        self.applied_filters().active_count()
    }

    /// Make the pending filters the applied ones
    pub fn apply_filters(&mut self) {
        if self.staging.apply() {
            self.reset_to_first_page();
            self.refresh();
        }
    }

    /// Throw away pending edits
    pub fn reset_pending_filters(&mut self) {
        self.staging.reset_pending();
    }

    /// Clear search and every filter, pending and applied
    pub fn clear_all_filters(&mut self) {
        self.search.cancel();
        self.search.set_input(String::new());
        if self.staging.clear_all() {
            info!(target: "engine", "All filters cleared");
            self.reset_to_first_page();
            self.refresh();
        }
    }

    // Pagination

    pub fn pagination(&self) -> &PaginationInfo {
        &self.state.pagination
    }

    pub fn page_request(&self) -> PageRequest {
        self.page
    }

    pub fn page_size_options(&self) -> &[usize] {
        &self.options.page_size_options
    }

    /// Go to a 1-based page. Pages past the end are allowed and show nothing.
    pub fn set_page(&mut self, page: usize) -> bool {
        if page == 0 {
            warn!(target: "engine", "Ignoring request for page 0");
            return false;
        }
        self.request_page(PageRequest::new(page, self.page.page_size));
        true
    }

    /// Change the page size; always returns to the first page
    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        if page_size == 0 {
            warn!(target: "engine", "Ignoring page size 0");
            return false;
        }
        if !self.options.page_size_options.is_empty()
            && !self.options.page_size_options.contains(&page_size)
        {
            debug!(target: "engine", "Page size {} is not one of the offered options", page_size);
        }
        self.request_page(PageRequest::first(page_size));
        true
    }

    pub fn next_page(&mut self) -> bool {
        if !self.state.pagination.has_next_page() {
            return false;
        }
        self.set_page(self.page.current_page + 1)
    }

    pub fn previous_page(&mut self) -> bool {
        if self.page.current_page <= 1 {
            return false;
        }
        self.set_page(self.page.current_page - 1)
    }

    pub fn first_page(&mut self) -> bool {
        self.set_page(1)
    }

    pub fn last_page(&mut self) -> bool {
        self.set_page(self.state.pagination.total_pages.max(1))
    }

    fn request_page(&mut self, request: PageRequest) {
        if self.page == request {
            return;
        }
        self.page = request;
        if self.is_server_driven() {
            debug!(target: "engine", "Requesting page {:?} from host", request);
            self.queue_event(TableEvent::PaginationChanged(request));
        }
        self.refresh();
    }

    fn reset_to_first_page(&mut self) {
        self.page = PageRequest::first(self.page.page_size);
        if self.is_server_driven() {
            self.queue_event(TableEvent::PaginationChanged(self.page));
        }
    }

    // Selection

    pub fn selected(&self) -> &[T] {
        self.selection.rows()
    }

    pub fn is_selected(&self, record: &T) -> bool {
        self.selection.is_selected(record)
    }

    pub fn toggle_row(&mut self, record: &T) -> bool {
        let selected = self.selection.toggle(record);
        self.refresh();
        selected
    }

    /// Header checkbox: select every record of the current page, or none
    pub fn select_all_on_page(&mut self, checked: bool) {
        let page = self.state.paginated.clone();
        self.selection.set_all(&page, checked);
        self.refresh();
    }

    pub fn deselect_all(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.selection.clear();
        self.refresh();
    }

    pub fn is_page_fully_selected(&self) -> bool {
        self.selection.is_all_selected(&self.state.paginated)
    }

    pub fn is_page_partially_selected(&self) -> bool {
        self.selection.is_partially_selected(&self.state.paginated)
    }

    // Bulk actions

    pub fn register_bulk_action(&mut self, action: BulkAction<T>) {
        self.bulk_actions.register(action);
    }

    pub fn bulk_actions(&self) -> &[BulkAction<T>] {
        self.bulk_actions.actions()
    }

    /// Run a bulk action on the selection, or park it for confirmation
    pub fn run_bulk_action(&mut self, key: &str) -> BulkOutcome {
        let outcome = self.bulk_actions.request(key, self.selection.rows());
        self.after_bulk_action(&outcome);
        outcome
    }

    pub fn confirm_bulk_action(&mut self) -> BulkOutcome {
        let outcome = self.bulk_actions.confirm(self.selection.rows());
        self.after_bulk_action(&outcome);
        outcome
    }

    pub fn cancel_bulk_action(&mut self) -> bool {
        self.bulk_actions.cancel()
    }

    /// Key and message of the action waiting for confirmation
    pub fn pending_bulk_confirmation(&self) -> Option<(&str, &str)> {
        self.bulk_actions.awaiting_confirmation()
    }

    fn after_bulk_action(&mut self, outcome: &BulkOutcome) {
        if let BulkOutcome::Ran {
            clear_selection: true,
        } = outcome
        {
            self.deselect_all();
        }
    }

    // State

    pub fn state(&self) -> &TableState<T> {
        &self.state
    }

    /// Indices into [`records`](Self::records) behind the three views
    pub fn derived_rows(&self) -> &DerivedRows {
        &self.derived
    }

    /// Page, search, sort and applied filters, ready for the URL codecs
    pub fn persisted_state(&self) -> InitialState {
        InitialState {
            page: self.page,
            search: self.staging.applied().search.clone(),
            sort: self.sort.clone(),
            filters: self.staging.applied().filters.clone(),
        }
    }

    /// Replace search, sort, filters and page, e.g. after URL navigation
    pub fn restore(&mut self, initial: InitialState) {
        self.search.cancel();
        self.search.set_input(initial.search.clone());
        self.staging
            .restore(FilterSnapshot::new(initial.search, initial.filters));
        self.sort = initial.sort;
        let page = sanitize_page(initial.page, self.options.default_page_size);
        if self.is_server_driven() && page != self.page {
            self.queue_event(TableEvent::PaginationChanged(page));
        }
        self.page = page;
        self.refresh();
    }

    // Events

    /// Take every queued event, oldest first
    pub fn flush_events(&mut self) -> Vec<TableEvent<T>> {
        Vec::from(std::mem::take(&mut self.queued))
    }

    fn queue_event(&mut self, event: TableEvent<T>) {
        self.queued.push_back(event);
        if self.queued.len() > MAX_QUEUED_EVENTS {
            if let Some(dropped) = self.queued.pop_front() {
                debug!(target: "engine", "Event queue full, dropping {}", dropped.name());
            }
        }
    }

    /// Send queued events to the subscribers. Returns how many were sent.
    pub fn dispatch(&mut self) -> usize {
        let events = self.flush_events();
        for event in &events {
            self.dispatcher.dispatch(event);
        }
        events.len()
    }

    pub fn event_history(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.dispatcher.event_history()
    }

    fn refresh(&mut self) {
        let derived = match &self.external {
            Some(external) => {
                let all: Vec<usize> = (0..self.records.len()).collect();
                DerivedRows {
                    filtered: all.clone(),
                    sorted: all.clone(),
                    paginated: all,
                    pagination: PaginationInfo::from_external(external),
                }
            }
            None => {
                let applied = self.staging.applied();
                let filter =
                    RecordFilter::new(&applied.search, &self.options.search_keys, &applied.filters);
                derive_rows(&self.records, &filter, self.sort.as_ref(), self.page)
            }
        };

        self.state.filtered = DerivedRows::materialize(&derived.filtered, &self.records);
        self.state.sorted = DerivedRows::materialize(&derived.sorted, &self.records);
        self.state.paginated = DerivedRows::materialize(&derived.paginated, &self.records);
        self.state.pagination = derived.pagination;
        self.derived = derived;

        let applied = self.staging.applied();
        self.state.search = applied.search.clone();
        self.state.filters = applied.filters.clone();
        self.state.sort = self.sort.clone();
        self.state.selected = self.selection.rows().to_vec();

        let next = EmittedState::from_state(&self.state);
        let events = diff(&self.emitted, &next, !self.is_server_driven());
        if !events.is_empty() {
            debug!(
                target: "engine",
                "State changed: {}",
                events.iter().map(|e| e.name()).collect::<Vec<_>>().join(", ")
            );
        }
        for event in events {
            self.queue_event(event);
        }
        self.emitted = next;
    }
}

impl<T: Record + Clone + PartialEq + 'static> TableStateEngine<T> {
    pub fn subscribe(&mut self, subscriber: Box<dyn TableSubscriber<T>>) {
        self.dispatcher.subscribe(subscriber);
    }
}

fn sanitize_page(request: PageRequest, default_page_size: usize) -> PageRequest {
    let mut page = request;
    if page.page_size == 0 {
        warn!(target: "engine", "Page size 0 is invalid, using {}", default_page_size);
        page.page_size = default_page_size;
    }
    if page.current_page == 0 {
        warn!(target: "engine", "Page 0 is invalid, using 1");
        page.current_page = 1;
    }
    page
}
