//! Verbose URL query form of the table state
//!
//! ```text
//! page=2&size=20&search=ram&sort=price&dir=desc
//!   &filter_status=open,pending&text_name=dell&date_created=2024-01-05
//!   &daterange_shipped=2024-01-01|2024-01-31&num_qty=5&numrange_price=10|
//! ```
//!
//! Defaults are left out, so the first page at the default size with nothing
//! else set encodes to an empty string.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::data::pagination::PageRequest;
use crate::data::record::parse_date;
use crate::error::{CodecError, CodecResult};
use crate::filter::{DateRange, FilterKind, FilterSet, FilterValue, NumberRange};
use crate::state::{InitialState, SortDirection, SortSpec};

pub const PAGE_KEY: &str = "page";
pub const SIZE_KEY: &str = "size";
pub const SEARCH_KEY: &str = "search";
pub const SORT_KEY: &str = "sort";
pub const DIR_KEY: &str = "dir";

const SELECT_SEPARATOR: char = ',';
const RANGE_SEPARATOR: char = '|';
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Query key prefix of each filter kind
pub fn filter_prefix(kind: FilterKind) -> &'static str {
    match kind {
        FilterKind::Select => "filter_",
        FilterKind::Text => "text_",
        FilterKind::Date => "date_",
        FilterKind::DateRange => "daterange_",
        FilterKind::Number => "num_",
        FilterKind::NumberRange => "numrange_",
    }
}

/// Query key carrying the `kind` filter of `field`
pub fn filter_key(kind: FilterKind, field: &str) -> String {
    format!("{}{}", filter_prefix(kind), field)
}

/// Split a query key into filter kind and field name
pub fn parse_filter_key(key: &str) -> Option<(FilterKind, &str)> {
    FilterKind::ALL.iter().find_map(|&kind| {
        key.strip_prefix(filter_prefix(kind))
            .filter(|field| !field.is_empty())
            .map(|field| (kind, field))
    })
}

pub(crate) fn format_date(day: NaiveDate) -> String {
    day.format(DATE_FORMAT).to_string()
}

pub(crate) fn format_number(n: f64) -> String {
    format!("{}", n)
}

fn format_optional_number(n: Option<f64>) -> String {
    n.filter(|v| v.is_finite()).map(format_number).unwrap_or_default()
}

/// Query value for one filter, or `None` when it constrains nothing
pub fn encode_filter_value(value: &FilterValue) -> Option<String> {
    if !value.is_active() {
        return None;
    }
    let encoded = match value {
        FilterValue::Select(values) => values.join(&SELECT_SEPARATOR.to_string()),
        FilterValue::Text(text) => text.trim().to_string(),
        FilterValue::Date(day) => format_date(*day),
        FilterValue::DateRange(range) => format!(
            "{}{}{}",
            range.from.map(format_date).unwrap_or_default(),
            RANGE_SEPARATOR,
            range.to.map(format_date).unwrap_or_default()
        ),
        FilterValue::Number(n) => format_number(*n),
        FilterValue::NumberRange(range) => format!(
            "{}{}{}",
            format_optional_number(range.min),
            RANGE_SEPARATOR,
            format_optional_number(range.max)
        ),
    };
    Some(encoded)
}

/// Every non-default part of the state as ordered query pairs
pub fn state_to_pairs(state: &InitialState, default_limit: usize) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    if state.page.current_page > 1 {
        pairs.push((PAGE_KEY.to_string(), state.page.current_page.to_string()));
    }
    if state.page.page_size != default_limit && state.page.page_size > 0 {
        pairs.push((SIZE_KEY.to_string(), state.page.page_size.to_string()));
    }

    let search = state.search.trim();
    if !search.is_empty() {
        pairs.push((SEARCH_KEY.to_string(), search.to_string()));
    }

    if let Some(sort) = &state.sort {
        pairs.push((SORT_KEY.to_string(), sort.key.clone()));
        if sort.direction == SortDirection::Desc {
            pairs.push((DIR_KEY.to_string(), sort.direction.to_string()));
        }
    }

    for (field, value) in state.filters.active() {
        if let Some(encoded) = encode_filter_value(&value) {
            pairs.push((filter_key(value.kind(), &field), encoded));
        }
    }

    pairs
}

/// Serialize pairs as `application/x-www-form-urlencoded`
pub fn pairs_to_query<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key.as_ref(), value.as_ref());
    }
    serializer.finish()
}

/// Encode the state as a query string without the leading `?`
pub fn encode_query(state: &InitialState, default_limit: usize) -> String {
    pairs_to_query(&state_to_pairs(state, default_limit))
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    let query = query.trim().trim_start_matches('?');
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn parse_positive(key: &str, value: &str) -> CodecResult<usize> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| CodecError::invalid_parameter(key, value))
}

fn parse_finite(key: &str, value: &str) -> CodecResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| CodecError::invalid_parameter(key, value))
}

fn parse_day(key: &str, value: &str) -> CodecResult<NaiveDate> {
    parse_date(value).ok_or_else(|| CodecError::invalid_parameter(key, value))
}

fn split_range<'a>(key: &str, value: &'a str) -> CodecResult<(&'a str, &'a str)> {
    value
        .split_once(RANGE_SEPARATOR)
        .map(|(low, high)| (low.trim(), high.trim()))
        .ok_or_else(|| CodecError::invalid_parameter(key, value))
}

/// Decode one filter value. `Ok(None)` means the value is empty and sets nothing.
pub fn decode_filter_value(kind: FilterKind, key: &str, value: &str) -> CodecResult<Option<FilterValue>> {
    let decoded = match kind {
        FilterKind::Select => FilterValue::Select(
            value
                .split(SELECT_SEPARATOR)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        FilterKind::Text => FilterValue::Text(value.trim().to_string()),
        FilterKind::Date => {
            if value.trim().is_empty() {
                return Ok(None);
            }
            FilterValue::Date(parse_day(key, value)?)
        }
        FilterKind::DateRange => {
            let (from, to) = split_range(key, value)?;
            let from = (!from.is_empty()).then(|| parse_day(key, from)).transpose()?;
            let to = (!to.is_empty()).then(|| parse_day(key, to)).transpose()?;
            FilterValue::DateRange(DateRange::new(from, to))
        }
        FilterKind::Number => {
            if value.trim().is_empty() {
                return Ok(None);
            }
            FilterValue::Number(parse_finite(key, value)?)
        }
        FilterKind::NumberRange => {
            let (min, max) = split_range(key, value)?;
            let min = (!min.is_empty()).then(|| parse_finite(key, min)).transpose()?;
            let max = (!max.is_empty()).then(|| parse_finite(key, max)).transpose()?;
            FilterValue::NumberRange(NumberRange::new(min, max))
        }
    };
    Ok(decoded.is_active().then_some(decoded))
}

/// Decode a query string, collecting a [`CodecError`] for every parameter
/// that was skipped. Unknown parameters are ignored.
pub fn decode_query_with_errors(query: &str, default_limit: usize) -> (InitialState, Vec<CodecError>) {
    let mut state = InitialState::with_page_size(default_limit);
    let mut errors = Vec::new();
    let mut seen: HashSet<&'static str> = HashSet::new();
    let mut sort_key: Option<String> = None;
    let mut direction = SortDirection::Asc;
    let mut filters = FilterSet::new();

    for (key, value) in parse_query(query) {
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            PAGE_KEY => {
                if seen.contains(PAGE_KEY) {
                    continue;
                }
                match parse_positive(&key, &value) {
                    Ok(page) => {
                        state.page.current_page = page;
                        seen.insert(PAGE_KEY);
                    }
                    Err(e) => errors.push(e),
                }
            }
            SIZE_KEY => {
                if seen.contains(SIZE_KEY) {
                    continue;
                }
                match parse_positive(&key, &value) {
                    Ok(size) => {
                        state.page.page_size = size;
                        seen.insert(SIZE_KEY);
                    }
                    Err(e) => errors.push(e),
                }
            }
            SEARCH_KEY => {
                let search = value.trim();
                if !seen.contains(SEARCH_KEY) && !search.is_empty() {
                    state.search = search.to_string();
                    seen.insert(SEARCH_KEY);
                }
            }
            SORT_KEY => {
                let sort = value.trim();
                if sort_key.is_none() && !sort.is_empty() {
                    sort_key = Some(sort.to_string());
                }
            }
            DIR_KEY => {
                if seen.contains(DIR_KEY) {
                    continue;
                }
                match SortDirection::parse(value.trim()) {
                    Some(dir) => {
                        direction = dir;
                        seen.insert(DIR_KEY);
                    }
                    None => errors.push(CodecError::invalid_parameter(&key, &value)),
                }
            }
            _ => {
                let Some((kind, field)) = parse_filter_key(&key) else {
                    debug!(target: "codec", "Ignoring unknown query parameter {}", key);
                    continue;
                };
                match decode_filter_value(kind, &key, &value) {
                    Ok(Some(filter)) => filters.set(field, filter),
                    Ok(None) => {}
                    Err(e) => errors.push(e),
                }
            }
        }
    }

    state.sort = sort_key.map(|key| SortSpec::new(key, direction));
    state.filters = filters;
    (state, errors)
}

/// Decode a query string, skipping (and logging) malformed parameters
pub fn decode_query(query: &str, default_limit: usize) -> InitialState {
    let (state, errors) = decode_query_with_errors(query, default_limit);
    for error in &errors {
        warn!(target: "codec", "Skipping query parameter: {}", error);
    }
    state
}

/// Decode a query string, failing on the first malformed parameter
pub fn try_decode_query(query: &str, default_limit: usize) -> CodecResult<InitialState> {
    let (state, mut errors) = decode_query_with_errors(query, default_limit);
    if errors.is_empty() {
        Ok(state)
    } else {
        Err(errors.remove(0))
    }
}

/// Changes to apply on top of an existing query string
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPatch {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub search: Option<String>,
    /// `Some(None)` removes the sort
    pub sort: Option<Option<SortSpec>>,
    /// `None` as value removes that filter
    pub filters: Vec<(String, FilterKind, Option<FilterValue>)>,
}

impl QueryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn sort(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn set_filter(mut self, field: impl Into<String>, value: FilterValue) -> Self {
        let kind = value.kind();
        self.filters.push((field.into(), kind, Some(value)));
        self
    }

    pub fn clear_filter(mut self, field: impl Into<String>, kind: FilterKind) -> Self {
        self.filters.push((field.into(), kind, None));
        self
    }

    /// The patch that turns any query into the encoding of `state`
    pub fn from_state(state: &InitialState) -> Self {
        let mut patch = Self::new()
            .page(state.page.current_page)
            .page_size(state.page.page_size)
            .search(state.search.clone())
            .sort(state.sort.clone());
        for (field, value) in state.filters.active() {
            patch = patch.set_filter(field, value);
        }
        patch
    }
}

fn replace_param(pairs: &mut Vec<(String, String)>, key: &str, value: Option<String>) {
    let position = pairs.iter().position(|(k, _)| k == key);
    pairs.retain(|(k, _)| k != key);
    if let Some(value) = value {
        let at = position.unwrap_or(pairs.len()).min(pairs.len());
        pairs.insert(at, (key.to_string(), value));
    }
}

/// Apply `patch` to `current`, leaving every other parameter where it was.
/// Values equal to their defaults remove the parameter.
pub fn update_query_partially(current: &str, patch: &QueryPatch, default_limit: usize) -> String {
    let mut pairs = parse_query(current);

    if let Some(page) = patch.page {
        replace_param(&mut pairs, PAGE_KEY, (page > 1).then(|| page.to_string()));
    }
    if let Some(size) = patch.page_size {
        replace_param(
            &mut pairs,
            SIZE_KEY,
            (size > 0 && size != default_limit).then(|| size.to_string()),
        );
    }
    if let Some(search) = &patch.search {
        let search = search.trim();
        replace_param(&mut pairs, SEARCH_KEY, (!search.is_empty()).then(|| search.to_string()));
    }
    if let Some(sort) = &patch.sort {
        replace_param(&mut pairs, SORT_KEY, sort.as_ref().map(|s| s.key.clone()));
        replace_param(
            &mut pairs,
            DIR_KEY,
            sort.as_ref()
                .filter(|s| s.direction == SortDirection::Desc)
                .map(|s| s.direction.to_string()),
        );
    }
    for (field, kind, value) in &patch.filters {
        let encoded = value.as_ref().and_then(encode_filter_value);
        replace_param(&mut pairs, &filter_key(*kind, field), encoded);
    }

    pairs_to_query(&pairs)
}

/// `base?query`, or just `base` when the state is all defaults.
/// Any query or fragment already on `base` is replaced.
pub fn shareable_url(base: &str, state: &InitialState, default_limit: usize) -> String {
    let base = base.split(|c| c == '?' || c == '#').next().unwrap_or_default();
    let query = encode_query(state, default_limit);
    if query.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, query)
    }
}

/// No filters set, and optionally no search and no sort. Pagination is not considered.
pub fn is_state_empty(state: &InitialState, include_search: bool, include_sort: bool) -> bool {
    if state.filters.has_active() {
        return false;
    }
    if include_search && !state.search.trim().is_empty() {
        return false;
    }
    if include_sort && state.sort.is_some() {
        return false;
    }
    true
}

/// First page at the default size with nothing else set
pub fn default_state(default_limit: usize) -> InitialState {
    InitialState {
        page: PageRequest::first(default_limit),
        ..Default::default()
    }
}
