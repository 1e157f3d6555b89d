use crate::data::record::{DataValue, Record};
use crate::filter::{DateRange, FilterSet, NumberRange};
use chrono::NaiveDate;

/// A search term plus a filter set, prepared once and then tested against
/// many records. Lower-casing happens here instead of per record.
#[derive(Debug, Clone)]
pub struct RecordFilter<'a> {
    search: Option<String>,
    search_keys: &'a [String],
    select: Vec<(&'a str, &'a [String])>,
    text: Vec<(&'a str, String)>,
    date: Vec<(&'a str, NaiveDate)>,
    date_range: Vec<(&'a str, DateRange)>,
    number: Vec<(&'a str, f64)>,
    number_range: Vec<(&'a str, NumberRange)>,
}

impl<'a> RecordFilter<'a> {
    pub fn new(search_term: &str, search_keys: &'a [String], filters: &'a FilterSet) -> Self {
        let term = search_term.trim();
        let search = (!term.is_empty() && !search_keys.is_empty()).then(|| term.to_lowercase());

        Self {
            search,
            search_keys,
            select: filters
                .select
                .iter()
                .filter(|(_, values)| !values.is_empty())
                .map(|(field, values)| (field.as_str(), values.as_slice()))
                .collect(),
            text: filters
                .text
                .iter()
                .filter(|(_, text)| !text.trim().is_empty())
                .map(|(field, text)| (field.as_str(), text.trim().to_lowercase()))
                .collect(),
            date: filters
                .date
                .iter()
                .map(|(field, day)| (field.as_str(), *day))
                .collect(),
            date_range: filters
                .date_range
                .iter()
                .filter(|(_, range)| !range.is_empty())
                .map(|(field, range)| (field.as_str(), *range))
                .collect(),
            number: filters
                .number
                .iter()
                .filter(|(_, n)| n.is_finite())
                .map(|(field, n)| (field.as_str(), *n))
                .collect(),
            number_range: filters
                .number_range
                .iter()
                .filter(|(_, range)| !range.is_empty())
                .map(|(field, range)| (field.as_str(), *range))
                .collect(),
        }
    }

    /// True when every record passes
    pub fn is_pass_through(&self) -> bool {
        self.search.is_none()
            && self.select.is_empty()
            && self.text.is_empty()
            && self.date.is_empty()
            && self.date_range.is_empty()
            && self.number.is_empty()
            && self.number_range.is_empty()
    }

    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        self.matches_search(record) && self.matches_filters(record)
    }

    /// Case-insensitive substring search across the configured keys.
    /// Missing and null fields never match.
    pub fn matches_search<R: Record + ?Sized>(&self, record: &R) -> bool {
        let Some(term) = &self.search else {
            return true;
        };

        self.search_keys.iter().any(|key| match record.field(key) {
            None | Some(DataValue::Null) => false,
            Some(value) => value.to_string().to_lowercase().contains(term.as_str()),
        })
    }

    pub fn matches_filters<R: Record + ?Sized>(&self, record: &R) -> bool {
        self.select
            .iter()
            .all(|(field, values)| matches_select(record.field(field), values))
            && self
                .text
                .iter()
                .all(|(field, needle)| matches_text(record.field(field), needle))
            && self
                .date
                .iter()
                .all(|(field, day)| matches_date(record.field(field), *day))
            && self
                .date_range
                .iter()
                .all(|(field, range)| matches_date_range(record.field(field), range))
            && self
                .number
                .iter()
                .all(|(field, n)| matches_number(record.field(field), *n))
            && self
                .number_range
                .iter()
                .all(|(field, range)| matches_number_range(record.field(field), range))
    }
}

fn display(value: Option<DataValue>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// The field's text form must equal one of the checked options
pub fn matches_select(value: Option<DataValue>, options: &[String]) -> bool {
    let text = display(value);
    options.iter().any(|option| *option == text)
}

/// `needle` must already be trimmed and lower-cased
pub fn matches_text(value: Option<DataValue>, needle: &str) -> bool {
    display(value).to_lowercase().contains(needle)
}

/// Same calendar day. Values without a date never match.
pub fn matches_date(value: Option<DataValue>, day: NaiveDate) -> bool {
    value
        .and_then(|v| v.as_datetime())
        .is_some_and(|dt| dt.date() == day)
}

/// Values without a date are not constrained by a range
pub fn matches_date_range(value: Option<DataValue>, range: &DateRange) -> bool {
    match value.and_then(|v| v.as_datetime()) {
        Some(dt) => range.contains(dt.date()),
        None => true,
    }
}

/// Exact numeric equality. Values without a number never match.
pub fn matches_number(value: Option<DataValue>, target: f64) -> bool {
    value.and_then(|v| v.as_number()).is_some_and(|n| n == target)
}

/// Values without a number are not constrained by a range
pub fn matches_number_range(value: Option<DataValue>, range: &NumberRange) -> bool {
    match value.and_then(|v| v.as_number()) {
        Some(n) => range.contains(n),
        None => true,
    }
}
