use crate::filter::{FilterKind, FilterSet, FilterValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Search plus per-field filters, taken as one unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSnapshot {
    pub search: String,
    pub filters: FilterSet,
}

impl FilterSnapshot {
    pub fn new(search: impl Into<String>, filters: FilterSet) -> Self {
        Self {
            search: search.into(),
            filters,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && !self.filters.has_active()
    }
}

/// Two-phase filter editing.
///
/// Edits land in the pending snapshot and only affect the table once
/// [`FilterStaging::apply`] copies them over the applied one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterStaging {
    pending: FilterSet,
    applied: FilterSnapshot,
}

impl FilterStaging {
    /// Start with `initial` applied and an identical pending copy
    pub fn new(initial: FilterSnapshot) -> Self {
        Self {
            pending: initial.filters.clone(),
            applied: initial,
        }
    }

    pub fn pending(&self) -> &FilterSet {
        &self.pending
    }

    pub fn applied(&self) -> &FilterSnapshot {
        &self.applied
    }

    pub fn set_pending(&mut self, field: &str, value: FilterValue) {
        self.pending.set(field, value);
    }

    pub fn clear_pending(&mut self, kind: FilterKind, field: &str) {
        self.pending.clear(kind, field);
    }

    pub fn toggle_pending_select(&mut self, field: &str, value: &str, checked: bool) {
        self.pending.toggle_select(field, value, checked);
    }

    /// Commit the search term immediately; per-field filters stay staged
    pub fn set_search(&mut self, search: impl Into<String>) -> bool {
        let search = search.into();
        if self.applied.search == search {
            return false;
        }
        self.applied.search = search;
        true
    }

    /// Copy pending over applied. Returns whether anything changed.
    pub fn apply(&mut self) -> bool {
        if self.applied.filters == self.pending {
            return false;
        }
        debug!(
            target: "filter",
            "Applying {} pending filters",
            self.pending.active_count()
        );
        self.applied.filters = self.pending.clone();
        true
    }

    /// Throw away pending edits by copying applied back over them
    pub fn reset_pending(&mut self) {
        self.pending = self.applied.filters.clone();
    }

    /// Zero both copies, search included. Returns whether the applied side changed.
    pub fn clear_all(&mut self) -> bool {
        let changed = self.applied != FilterSnapshot::default();
        self.pending = FilterSet::default();
        self.applied = FilterSnapshot::default();
        changed
    }

    /// Replace both copies, as when state is restored from a URL
    pub fn restore(&mut self, snapshot: FilterSnapshot) {
        *self = Self::new(snapshot);
    }

    pub fn has_pending_changes(&self) -> bool {
        self.pending != self.applied.filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(values: &[&str]) -> FilterValue {
        FilterValue::Select(values.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_pending_edits_do_not_touch_applied() {
        let mut staging = FilterStaging::default();
        staging.set_pending("status", status(&["open"]));
        assert!(staging.has_pending_changes());
        assert!(!staging.applied().filters.has_active());

        assert!(staging.apply());
        assert!(!staging.has_pending_changes());
        assert_eq!(staging.applied().filters.select["status"], vec!["open"]);
        assert!(!staging.apply());
    }

    #[test]
    fn test_reset_pending_reverts_every_kind() {
        let mut staging = FilterStaging::new(FilterSnapshot::new(
            "",
            FilterSet::new().with("qty", FilterValue::Number(3.0)),
        ));
        staging.set_pending("qty", FilterValue::Number(4.0));
        staging.set_pending("name", FilterValue::Text("x".into()));
        staging.reset_pending();
        assert_eq!(staging.pending(), &staging.applied().filters);
        assert_eq!(staging.pending().number["qty"], 3.0);
    }

    #[test]
    fn test_clear_all_zeroes_both() {
        let mut staging = FilterStaging::new(FilterSnapshot::new(
            "abc",
            FilterSet::new().with("status", status(&["a"])),
        ));
        staging.set_pending("name", FilterValue::Text("x".into()));
        assert!(staging.clear_all());
        assert_eq!(staging.pending(), &FilterSet::default());
        assert_eq!(staging.applied(), &FilterSnapshot::default());
        assert!(!staging.clear_all());
    }
}
