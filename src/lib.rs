//! Headless table state: search, filters, sorting, pagination and selection
//! over an in-memory record collection, with URL persistence.

pub mod config;
pub mod data;
pub mod debouncer;
pub mod error;
pub mod filter;
pub mod logging;
pub mod state;
pub mod table_display;
pub mod url_state;

pub use data::{DataValue, PageRequest, PaginationInfo, Record};
pub use error::{CodecError, CodecResult};
pub use filter::{DateRange, FilterKind, FilterSet, FilterValue, NumberRange};
pub use state::{
    EngineOptions, InitialState, SortDirection, SortSpec, TableEvent, TableState,
    TableStateEngine,
};
