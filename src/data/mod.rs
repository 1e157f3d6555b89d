//! Data layer
//!
//! Typed record values, the `Record` capability, comparison, pagination
//! arithmetic and the index-based view that filters, sorts and pages a
//! shared record vector without modifying it.

pub mod data_view;
pub mod datavalue_compare;
pub mod loaders;
pub mod pagination;
pub mod record;

pub use data_view::{derive_rows, DerivedRows, RecordView};
pub use pagination::{ExternalPagination, PageRequest, PaginationInfo, DEFAULT_PAGE_SIZE};
pub use record::{DataType, DataValue, Record};
