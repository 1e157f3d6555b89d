//! Change events and the pure diff that produces them

use crate::data::pagination::PageRequest;
use crate::state::staging::FilterSnapshot;
use crate::state::{SortSpec, TableState};

/// The derived record views as a host sees them
#[derive(Debug, Clone, PartialEq)]
pub struct DataSnapshot<T> {
    pub filtered: Vec<T>,
    pub sorted: Vec<T>,
    pub paginated: Vec<T>,
    pub total_pages: usize,
    pub current_page: usize,
}

impl<T> Default for DataSnapshot<T> {
    fn default() -> Self {
        Self {
            filtered: Vec::new(),
            sorted: Vec::new(),
            paginated: Vec::new(),
            total_pages: 0,
            current_page: 1,
        }
    }
}

/// Events that tell a host something it renders from has changed
#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent<T> {
    SelectionChanged(Vec<T>),
    SortChanged(Option<SortSpec>),
    /// Applied search and filters
    FilterChanged(FilterSnapshot),
    PaginationChanged(PageRequest),
    DataChanged(DataSnapshot<T>),
    StateChanged(Box<TableState<T>>),
}

impl<T> TableEvent<T> {
    pub fn name(&self) -> &'static str {
        match self {
            TableEvent::SelectionChanged(_) => "selection",
            TableEvent::SortChanged(_) => "sort",
            TableEvent::FilterChanged(_) => "filter",
            TableEvent::PaginationChanged(_) => "pagination",
            TableEvent::DataChanged(_) => "data",
            TableEvent::StateChanged(_) => "state",
        }
    }
}

/// The values last reported to the host, one per event kind
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedState<T> {
    pub selection: Vec<T>,
    pub sort: Option<SortSpec>,
    pub filter: FilterSnapshot,
    pub pagination: PageRequest,
    pub data: DataSnapshot<T>,
    pub state: Option<TableState<T>>,
}

impl<T> EmittedState<T> {
    /// What a freshly mounted host is assumed to have seen: nothing selected,
    /// no sort or filters, the first page at `page_size` and no records
    pub fn baseline(page_size: usize) -> Self {
        Self {
            selection: Vec::new(),
            sort: None,
            filter: FilterSnapshot::default(),
            pagination: PageRequest::first(page_size),
            data: DataSnapshot::default(),
            state: None,
        }
    }
}

impl<T: Clone> EmittedState<T> {
    pub fn from_state(state: &TableState<T>) -> Self {
        Self {
            selection: state.selected.clone(),
            sort: state.sort.clone(),
            filter: FilterSnapshot::new(state.search.clone(), state.filters.clone()),
            pagination: PageRequest::new(
                state.pagination.current_page,
                state.pagination.page_size,
            ),
            data: DataSnapshot {
                filtered: state.filtered.clone(),
                sorted: state.sorted.clone(),
                paginated: state.paginated.clone(),
                total_pages: state.pagination.total_pages,
                current_page: state.pagination.current_page,
            },
            state: Some(state.clone()),
        }
    }
}

/// Events for everything that differs between `previous` and `next`.
///
/// Pagination is only compared when the table paginates locally; a
/// server-driven host is told about page requests as they happen.
pub fn diff<T: Clone + PartialEq>(
    previous: &EmittedState<T>,
    next: &EmittedState<T>,
    local_pagination: bool,
) -> Vec<TableEvent<T>> {
    let mut events = Vec::new();

    if previous.selection != next.selection {
        events.push(TableEvent::SelectionChanged(next.selection.clone()));
    }
    if previous.sort != next.sort {
        events.push(TableEvent::SortChanged(next.sort.clone()));
    }
    if previous.filter != next.filter {
        events.push(TableEvent::FilterChanged(next.filter.clone()));
    }
    if local_pagination && previous.pagination != next.pagination {
        events.push(TableEvent::PaginationChanged(next.pagination));
    }
    if previous.data != next.data {
        events.push(TableEvent::DataChanged(next.data.clone()));
    }
    if previous.state != next.state {
        if let Some(state) = &next.state {
            events.push(TableEvent::StateChanged(Box::new(state.clone())));
        }
    }

    events
}
