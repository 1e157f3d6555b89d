use std::sync::Arc;

use tracing::trace;

use crate::data::datavalue_compare::compare_optional_datavalues;
use crate::data::pagination::{PageRequest, PaginationInfo};
use crate::data::record::{DataValue, Record};
use crate::filter::RecordFilter;
use crate::state::{SortDirection, SortSpec};

/// A view over a shared record vector that can filter, sort and page
/// without modifying the underlying records
#[derive(Debug)]
pub struct RecordView<T> {
    /// The underlying immutable records
    source: Arc<Vec<T>>,

    /// Indices into `source` that are visible, in display order
    visible_rows: Vec<usize>,
}

impl<T> Clone for RecordView<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            visible_rows: self.visible_rows.clone(),
        }
    }
}

impl<T: Record> RecordView<T> {
    /// Create a view showing every record in source order
    pub fn new(source: Arc<Vec<T>>) -> Self {
        let row_count = source.len();
        Self {
            source,
            visible_rows: (0..row_count).collect(),
        }
    }

    /// Create a view with specific rows
    pub fn with_rows(mut self, rows: Vec<usize>) -> Self {
        self.visible_rows = rows
            .into_iter()
            .filter(|&idx| idx < self.source.len())
            .collect();
        self
    }

    /// Keep the rows matching a predicate
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool,
    {
        let source = &self.source;
        self.visible_rows.retain(|&row_idx| predicate(&source[row_idx]));
        self
    }

    /// Keep the rows passing a prepared search and filter set
    pub fn apply_filter(self, filter: &RecordFilter<'_>) -> Self {
        if filter.is_pass_through() {
            return self;
        }
        self.filter(|record| filter.matches(record))
    }

    /// Stable sort of the visible rows by one field.
    ///
    /// Field values are read once per row before sorting.
    pub fn sort_by(mut self, sort: &SortSpec) -> Self {
        let mut keyed: Vec<(usize, Option<DataValue>)> = self
            .visible_rows
            .iter()
            .map(|&row_idx| (row_idx, self.source[row_idx].field(&sort.key)))
            .collect();

        keyed.sort_by(|(_, a), (_, b)| {
            let cmp = compare_optional_datavalues(a.as_ref(), b.as_ref());
            match sort.direction {
                SortDirection::Asc => cmp,
                SortDirection::Desc => cmp.reverse(),
            }
        });

        self.visible_rows = keyed.into_iter().map(|(row_idx, _)| row_idx).collect();
        self
    }

    /// The rows of one page together with its pagination figures
    pub fn page(&self, request: PageRequest) -> (PaginationInfo, &[usize]) {
        let info = PaginationInfo::compute(self.visible_rows.len(), request);
        (info, &self.visible_rows[info.range()])
    }

    pub fn row_count(&self) -> usize {
        self.visible_rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible_rows.is_empty()
    }

    /// Get a record by its position in the view
    pub fn get_row(&self, index: usize) -> Option<&T> {
        let row_idx = *self.visible_rows.get(index)?;
        self.source.get(row_idx)
    }

    /// Visible records in display order
    pub fn rows(&self) -> impl Iterator<Item = &T> + '_ {
        self.visible_rows.iter().map(|&idx| &self.source[idx])
    }

    pub fn source(&self) -> &Arc<Vec<T>> {
        &self.source
    }

    pub fn visible_row_indices(&self) -> &[usize] {
        &self.visible_rows
    }
}

/// Row indices of the three derived views plus the page figures
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRows {
    pub filtered: Vec<usize>,
    pub sorted: Vec<usize>,
    pub paginated: Vec<usize>,
    pub pagination: PaginationInfo,
}

impl DerivedRows {
    /// Look the indices up in `source`
    pub fn materialize<T: Clone>(indices: &[usize], source: &[T]) -> Vec<T> {
        indices
            .iter()
            .filter_map(|&idx| source.get(idx).cloned())
            .collect()
    }
}

/// Run filter, sort and page over the records
pub fn derive_rows<T: Record>(
    source: &Arc<Vec<T>>,
    filter: &RecordFilter<'_>,
    sort: Option<&SortSpec>,
    request: PageRequest,
) -> DerivedRows {
    let filtered_view = RecordView::new(Arc::clone(source)).apply_filter(filter);
    let filtered = filtered_view.visible_row_indices().to_vec();

    let sorted_view = match sort {
        Some(spec) => filtered_view.sort_by(spec),
        None => filtered_view,
    };
    let (pagination, page) = sorted_view.page(request);
    let paginated = page.to_vec();

    trace!(
        target: "engine",
        "derived {} of {} rows, page {} has {}",
        filtered.len(),
        source.len(),
        pagination.current_page,
        paginated.len()
    );

    DerivedRows {
        filtered,
        sorted: sorted_view.visible_row_indices().to_vec(),
        paginated,
        pagination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterSet, FilterValue, NumberRange};
    use serde_json::{json, Value};

    fn ages() -> Arc<Vec<Value>> {
        Arc::new(vec![
            json!({"id": 1, "age": 20}),
            json!({"id": 2, "age": 30}),
            json!({"id": 3, "age": 25}),
        ])
    }

    fn ids(view: &RecordView<Value>) -> Vec<i64> {
        view.rows().filter_map(|r| r["id"].as_i64()).collect()
    }

    #[test]
    fn test_filter_then_sort() {
        let filters = FilterSet::new().with("age", FilterValue::NumberRange(NumberRange::min(21.0)));
        let filter = RecordFilter::new("", &[], &filters);
        let view = RecordView::new(ages()).apply_filter(&filter);
        assert_eq!(ids(&view), vec![2, 3]);

        let view = view.sort_by(&SortSpec::asc("age"));
        assert_eq!(ids(&view), vec![3, 2]);
    }

    #[test]
    fn test_descending_sort_keeps_ties_in_order() {
        let source = Arc::new(vec![
            json!({"id": 1, "team": "a"}),
            json!({"id": 2, "team": "b"}),
            json!({"id": 3, "team": "a"}),
            json!({"id": 4, "team": "b"}),
        ]);
        let view = RecordView::new(source).sort_by(&SortSpec::desc("team"));
        assert_eq!(ids(&view), vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_missing_values_sort_first() {
        let source = Arc::new(vec![
            json!({"id": 1, "age": 5}),
            json!({"id": 2}),
            json!({"id": 3, "age": null}),
        ]);
        let view = RecordView::new(source).sort_by(&SortSpec::asc("age"));
        assert_eq!(ids(&view), vec![2, 3, 1]);
    }

    #[test]
    fn test_derive_rows_pages_sorted_rows() {
        let source = Arc::new((1..=5).map(|i| json!({"id": i})).collect::<Vec<_>>());
        let filters = FilterSet::new();
        let filter = RecordFilter::new("", &[], &filters);
        let derived = derive_rows(
            &source,
            &filter,
            Some(&SortSpec::desc("id")),
            PageRequest::new(2, 2),
        );
        assert_eq!(derived.filtered, vec![0, 1, 2, 3, 4]);
        assert_eq!(derived.sorted, vec![4, 3, 2, 1, 0]);
        assert_eq!(derived.paginated, vec![2, 1]);
        assert_eq!(derived.pagination.total_pages, 3);
    }

    #[test]
    fn test_with_rows_drops_out_of_range_indices() {
        let view = RecordView::new(ages()).with_rows(vec![2, 9, 0]);
        assert_eq!(ids(&view), vec![3, 1]);
        assert_eq!(view.get_row(1).and_then(|r| r["id"].as_i64()), Some(1));
        assert!(view.get_row(2).is_none());
    }
}
