//! Query parameters for a server that filters, sorts and pages for us
//!
//! Two dialects are supported:
//!
//! * `Paginate`: `sortBy=price:DESC`, `filter.status=$in:a,b`, `filter.price=$btw:1,9`
//! * `Bracket`: `sort=-price`, `filter[status]=a,b`, `filter[price]=1,9`

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};

use crate::filter::FilterValue;
use crate::state::{InitialState, SortDirection};
use crate::url_state::query_codec::{format_date, format_number, pairs_to_query};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteDialect {
    Paginate,
    Bracket,
}

impl fmt::Display for RemoteDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteDialect::Paginate => write!(f, "paginate"),
            RemoteDialect::Bracket => write!(f, "bracket"),
        }
    }
}

impl FromStr for RemoteDialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "paginate" => Ok(RemoteDialect::Paginate),
            "bracket" => Ok(RemoteDialect::Bracket),
            other => Err(anyhow!("Unknown remote query dialect: {}", other)),
        }
    }
}

fn range_bounds(low: Option<String>, high: Option<String>) -> Option<(Option<String>, Option<String>)> {
    (low.is_some() || high.is_some()).then_some((low, high))
}

fn paginate_operator(value: &FilterValue) -> Option<String> {
    let between = |low: Option<String>, high: Option<String>| match range_bounds(low, high)? {
        (Some(low), Some(high)) => Some(format!("$btw:{},{}", low, high)),
        (Some(low), None) => Some(format!("$gte:{}", low)),
        (None, Some(high)) => Some(format!("$lte:{}", high)),
        (None, None) => None,
    };

    match value {
        FilterValue::Select(values) => Some(format!("$in:{}", values.join(","))),
        FilterValue::Text(text) => Some(format!("$ilike:{}", text.trim())),
        FilterValue::Date(day) => Some(format!("$eq:{}", format_date(*day))),
        FilterValue::DateRange(range) => {
            between(range.from.map(format_date), range.to.map(format_date))
        }
        FilterValue::Number(n) => Some(format!("$eq:{}", format_number(*n))),
        FilterValue::NumberRange(range) => between(
            range.min.filter(|v| v.is_finite()).map(format_number),
            range.max.filter(|v| v.is_finite()).map(format_number),
        ),
    }
}

fn bracket_value(value: &FilterValue) -> Option<String> {
    let range = |low: Option<String>, high: Option<String>| {
        range_bounds(low, high).map(|(low, high)| {
            format!("{},{}", low.unwrap_or_default(), high.unwrap_or_default())
        })
    };

    match value {
        FilterValue::Select(values) => Some(values.join(",")),
        FilterValue::Text(text) => Some(text.trim().to_string()),
        FilterValue::Date(day) => Some(format_date(*day)),
        FilterValue::DateRange(r) => range(r.from.map(format_date), r.to.map(format_date)),
        FilterValue::Number(n) => Some(format_number(*n)),
        FilterValue::NumberRange(r) => range(
            r.min.filter(|v| v.is_finite()).map(format_number),
            r.max.filter(|v| v.is_finite()).map(format_number),
        ),
    }
}

/// Ordered query pairs asking a server for the page described by `state`.
///
/// Page and limit are always sent. A field carrying filters of several kinds
/// keeps the last one, in select, text, date, date range, number, number range order.
pub fn remote_query_pairs(state: &InitialState, dialect: RemoteDialect) -> Vec<(String, String)> {
    let mut pairs = vec![
        ("page".to_string(), state.page.current_page.max(1).to_string()),
        ("limit".to_string(), state.page.page_size.to_string()),
    ];

    let search = state.search.trim();
    if !search.is_empty() {
        let key = match dialect {
            RemoteDialect::Paginate => "search",
            RemoteDialect::Bracket => "filter[search]",
        };
        pairs.push((key.to_string(), search.to_string()));
    }

    if let Some(sort) = &state.sort {
        match dialect {
            RemoteDialect::Paginate => pairs.push((
                "sortBy".to_string(),
                format!("{}:{}", sort.key, sort.direction.as_str().to_uppercase()),
            )),
            RemoteDialect::Bracket => {
                let value = match sort.direction {
                    SortDirection::Asc => sort.key.clone(),
                    SortDirection::Desc => format!("-{}", sort.key),
                };
                pairs.push(("sort".to_string(), value));
            }
        }
    }

    for (field, value) in state.filters.active() {
        let (key, encoded) = match dialect {
            RemoteDialect::Paginate => (format!("filter.{}", field), paginate_operator(&value)),
            RemoteDialect::Bracket => (format!("filter[{}]", field), bracket_value(&value)),
        };
        let Some(encoded) = encoded else {
            continue;
        };
        match pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = encoded,
            None => pairs.push((key, encoded)),
        }
    }

    pairs
}

/// [`remote_query_pairs`] as a form-encoded query string
pub fn remote_query_string(state: &InitialState, dialect: RemoteDialect) -> String {
    pairs_to_query(&remote_query_pairs(state, dialect))
}
