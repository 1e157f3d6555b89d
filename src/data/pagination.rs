use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Page size used when nothing else is configured
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// The page a caller asks for. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub current_page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

impl PageRequest {
    pub fn new(current_page: usize, page_size: usize) -> Self {
        Self {
            current_page,
            page_size,
        }
    }

    /// First page at the given size
    pub fn first(page_size: usize) -> Self {
        Self::new(1, page_size)
    }
}

/// Pagination supplied by a server-driven host. When present the records
/// handed to the engine already are the requested page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalPagination {
    pub current_page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Derived pagination figures for one page of a result set.
///
/// `start_index..end_index` is the half-open slice of the sorted rows shown on
/// the page, so `0 <= start_index <= end_index <= total_items` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub current_page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub start_index: usize,
    pub end_index: usize,
}

impl PaginationInfo {
    /// Figures for an empty result set, used before anything was derived
    pub fn empty(page_size: usize) -> Self {
        Self::compute(0, PageRequest::first(page_size))
    }

    /// Compute the page window over `total_items` rows.
    ///
    /// Pages past the end are not clamped: they produce an empty window.
    pub fn compute(total_items: usize, request: PageRequest) -> Self {
        let page_size = request.page_size.max(1);
        let current_page = request.current_page.max(1);
        let total_pages = total_items.div_ceil(page_size);
        let start_index = (current_page - 1)
            .saturating_mul(page_size)
            .min(total_items);
        let end_index = start_index.saturating_add(page_size).min(total_items);

        Self {
            current_page,
            page_size,
            total_pages,
            total_items,
            start_index,
            end_index,
        }
    }

    pub fn from_external(external: &ExternalPagination) -> Self {
        let mut info = Self::compute(
            external.total_items,
            PageRequest::new(external.current_page, external.page_size),
        );
        info.total_pages = external.total_pages;
        info
    }

    pub fn range(&self) -> Range<usize> {
        self.start_index..self.end_index
    }

    /// Number of rows on this page
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 1-based inclusive bounds for "showing X-Y of Z" labels
    pub fn display_range(&self) -> Option<(usize, usize)> {
        if self.is_empty() {
            None
        } else {
            Some((self.start_index + 1, self.end_index))
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }
}

/// Slice one page out of already sorted rows
pub fn paginate<T>(rows: &[T], request: PageRequest) -> (PaginationInfo, &[T]) {
    let info = PaginationInfo::compute(rows.len(), request);
    (info, &rows[info.range()])
}
