//! Table state
//!
//! The engine and the pieces of state it coordinates: staged filters,
//! selection with bulk actions, and change events.

pub mod dispatcher;
pub mod engine;
pub mod events;
pub mod selection;
pub mod staging;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::pagination::{PageRequest, PaginationInfo};
use crate::filter::FilterSet;

pub use dispatcher::{TableCallbacks, TableSubscriber};
pub use engine::{EngineOptions, TableStateEngine, MAX_QUEUED_EVENTS};
pub use events::{EmittedState, TableEvent};
pub use selection::{BulkAction, BulkActionContext, BulkActions, BulkOutcome, Selection};
pub use staging::{FilterSnapshot, FilterStaging};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// Accepts `asc`/`desc` in any case
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("asc") {
            Some(SortDirection::Asc)
        } else if value.eq_ignore_ascii_case("desc") {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-field sort
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }

    pub fn asc(key: impl Into<String>) -> Self {
        Self::new(key, SortDirection::Asc)
    }

    pub fn desc(key: impl Into<String>) -> Self {
        Self::new(key, SortDirection::Desc)
    }

    /// Parse `field` or `field:desc`
    pub fn parse(value: &str) -> Option<Self> {
        let (key, direction) = match value.rsplit_once(':') {
            Some((key, dir)) => (key, SortDirection::parse(dir)?),
            None => (value, SortDirection::Asc),
        };
        let key = key.trim();
        (!key.is_empty()).then(|| Self::new(key, direction))
    }
}

/// The persistable part of a table's state.
///
/// This is what the URL codecs read and write and what seeds an engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    pub page: PageRequest,
    pub search: String,
    pub sort: Option<SortSpec>,
    pub filters: FilterSet,
}

impl InitialState {
    /// First page at `page_size`, nothing else set
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page: PageRequest::first(page_size),
            ..Default::default()
        }
    }
}

/// Everything a host renders from: applied search, sort and filters, the
/// page figures, the derived record views and the selection
#[derive(Debug, Clone, PartialEq)]
pub struct TableState<T> {
    pub search: String,
    pub sort: Option<SortSpec>,
    pub filters: FilterSet,
    pub pagination: PaginationInfo,
    pub filtered: Vec<T>,
    pub sorted: Vec<T>,
    pub paginated: Vec<T>,
    pub selected: Vec<T>,
}

impl<T> TableState<T> {
    pub fn persisted(&self) -> InitialState {
        InitialState {
            page: PageRequest::new(self.pagination.current_page, self.pagination.page_size),
            search: self.search.clone(),
            sort: self.sort.clone(),
            filters: self.filters.clone(),
        }
    }
}
