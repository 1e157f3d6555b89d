//! Filter model
//!
//! A [`FilterSet`] holds every per-field filter of a table, one ordered map
//! per filter kind. The ordered maps keep iteration (and therefore URL
//! encoding) deterministic.

pub mod evaluator;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use evaluator::RecordFilter;

/// The six filter kinds a table field can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    Select,
    Text,
    Date,
    DateRange,
    Number,
    NumberRange,
}

impl FilterKind {
    pub const ALL: [FilterKind; 6] = [
        FilterKind::Select,
        FilterKind::Text,
        FilterKind::Date,
        FilterKind::DateRange,
        FilterKind::Number,
        FilterKind::NumberRange,
    ];
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterKind::Select => "select",
            FilterKind::Text => "text",
            FilterKind::Date => "date",
            FilterKind::DateRange => "dateRange",
            FilterKind::Number => "number",
            FilterKind::NumberRange => "numberRange",
        };
        write!(f, "{}", name)
    }
}

/// Inclusive calendar-day bounds; either side may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }
}

/// Inclusive numeric bounds; either side may be open. Non-finite bounds count as open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn min(min: f64) -> Self {
        Self::new(Some(min), None)
    }

    pub fn max(max: f64) -> Self {
        Self::new(None, Some(max))
    }

    fn lower(&self) -> Option<f64> {
        self.min.filter(|m| m.is_finite())
    }

    fn upper(&self) -> Option<f64> {
        self.max.filter(|m| m.is_finite())
    }

    pub fn is_empty(&self) -> bool {
        self.lower().is_none() && self.upper().is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower().map_or(true, |min| value >= min)
            && self.upper().map_or(true, |max| value <= max)
    }
}

/// The value of a single filter, tagged with its kind
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Select(Vec<String>),
    Text(String),
    Date(NaiveDate),
    DateRange(DateRange),
    Number(f64),
    NumberRange(NumberRange),
}

impl FilterValue {
    pub fn kind(&self) -> FilterKind {
        match self {
            FilterValue::Select(_) => FilterKind::Select,
            FilterValue::Text(_) => FilterKind::Text,
            FilterValue::Date(_) => FilterKind::Date,
            FilterValue::DateRange(_) => FilterKind::DateRange,
            FilterValue::Number(_) => FilterKind::Number,
            FilterValue::NumberRange(_) => FilterKind::NumberRange,
        }
    }

    /// Whether the value constrains anything at all
    pub fn is_active(&self) -> bool {
        match self {
            FilterValue::Select(values) => !values.is_empty(),
            FilterValue::Text(text) => !text.trim().is_empty(),
            FilterValue::Date(_) => true,
            FilterValue::DateRange(range) => !range.is_empty(),
            FilterValue::Number(n) => n.is_finite(),
            FilterValue::NumberRange(range) => !range.is_empty(),
        }
    }
}

/// Every per-field filter of a table.
///
/// Setters drop entries that would not constrain anything, so two sets that
/// filter the same way compare equal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    pub select: BTreeMap<String, Vec<String>>,
    pub text: BTreeMap<String, String>,
    pub date: BTreeMap<String, NaiveDate>,
    pub date_range: BTreeMap<String, DateRange>,
    pub number: BTreeMap<String, f64>,
    pub number_range: BTreeMap<String, NumberRange>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a filter on `field`, replacing any filter of the same kind.
    /// Inactive values clear the entry instead.
    pub fn set(&mut self, field: impl Into<String>, value: FilterValue) {
        let field = field.into();
        if !value.is_active() {
            self.clear(value.kind(), &field);
            return;
        }

        match value {
            FilterValue::Select(mut values) => {
                let mut seen = Vec::with_capacity(values.len());
                values.retain(|v| {
                    if seen.contains(v) {
                        false
                    } else {
                        seen.push(v.clone());
                        true
                    }
                });
                self.select.insert(field, values);
            }
            FilterValue::Text(text) => {
                self.text.insert(field, text);
            }
            FilterValue::Date(day) => {
                self.date.insert(field, day);
            }
            FilterValue::DateRange(range) => {
                self.date_range.insert(field, range);
            }
            FilterValue::Number(n) => {
                self.number.insert(field, n);
            }
            FilterValue::NumberRange(range) => {
                self.number_range
                    .insert(field, NumberRange::new(range.lower(), range.upper()));
            }
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: FilterValue) -> Self {
        self.set(field, value);
        self
    }

    /// Remove the filter of `kind` on `field`
    pub fn clear(&mut self, kind: FilterKind, field: &str) {
        match kind {
            FilterKind::Select => {
                self.select.remove(field);
            }
            FilterKind::Text => {
                self.text.remove(field);
            }
            FilterKind::Date => {
                self.date.remove(field);
            }
            FilterKind::DateRange => {
                self.date_range.remove(field);
            }
            FilterKind::Number => {
                self.number.remove(field);
            }
            FilterKind::NumberRange => {
                self.number_range.remove(field);
            }
        }
    }

    pub fn get(&self, kind: FilterKind, field: &str) -> Option<FilterValue> {
        match kind {
            FilterKind::Select => self.select.get(field).cloned().map(FilterValue::Select),
            FilterKind::Text => self.text.get(field).cloned().map(FilterValue::Text),
            FilterKind::Date => self.date.get(field).copied().map(FilterValue::Date),
            FilterKind::DateRange => self
                .date_range
                .get(field)
                .copied()
                .map(FilterValue::DateRange),
            FilterKind::Number => self.number.get(field).copied().map(FilterValue::Number),
            FilterKind::NumberRange => self
                .number_range
                .get(field)
                .copied()
                .map(FilterValue::NumberRange),
        }
    }

    /// Check or uncheck one option of a select filter
    pub fn toggle_select(&mut self, field: &str, value: &str, checked: bool) {
        let mut values = self.select.get(field).cloned().unwrap_or_default();
        if checked {
            if !values.iter().any(|v| v == value) {
                values.push(value.to_string());
            }
        } else {
            values.retain(|v| v != value);
        }
        self.set(field, FilterValue::Select(values));
    }

    /// Every active filter as `(field, value)`, grouped by kind
    pub fn active(&self) -> Vec<(String, FilterValue)> {
        let mut active = Vec::new();
        for kind in FilterKind::ALL {
            for field in self.fields(kind) {
                if let Some(value) = self.get(kind, &field) {
                    if value.is_active() {
                        active.push((field, value));
                    }
                }
            }
        }
        active
    }

    fn fields(&self, kind: FilterKind) -> Vec<String> {
        match kind {
            FilterKind::Select => self.select.keys().cloned().collect(),
            FilterKind::Text => self.text.keys().cloned().collect(),
            FilterKind::Date => self.date.keys().cloned().collect(),
            FilterKind::DateRange => self.date_range.keys().cloned().collect(),
            FilterKind::Number => self.number.keys().cloned().collect(),
            FilterKind::NumberRange => self.number_range.keys().cloned().collect(),
        }
    }

    pub fn has_active(&self) -> bool {
        !self.active().is_empty()
    }

    /// Badge count: one per checked select option plus one per other active filter
    pub fn active_count(&self) -> usize {
        self.active()
            .iter()
            .map(|(_, value)| match value {
                FilterValue::Select(values) => values.len(),
                _ => 1,
            })
            .sum()
    }
}
