//! Compact base64 form of the table state
//!
//! Only non-default values are packed, under short keys, into a JSON object
//! which is then base64 encoded:
//!
//! ```text
//! {"p":2,"s":20,"q":"ram","sort":{"k":"price","d":"desc"},
//!  "f":{"sel":{..},"txt":{..},"dt":{..},"dtr":{"f":..,"t":..},"num":{..},"numr":{"min":..,"max":..}}}
//! ```

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::record::parse_date;
use crate::error::CodecResult;
use crate::filter::{DateRange, FilterSet, FilterValue, NumberRange};
use crate::state::{InitialState, SortDirection, SortSpec};
use crate::url_state::query_codec::format_date;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CompactState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    p: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    s: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sort: Option<CompactSort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    f: Option<CompactFilters>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CompactSort {
    k: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    d: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CompactFilters {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    sel: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    txt: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    dt: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    dtr: BTreeMap<String, CompactDateRange>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    num: BTreeMap<String, Option<f64>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    numr: BTreeMap<String, CompactNumberRange>,
}

impl CompactFilters {
    fn is_empty(&self) -> bool {
        self.sel.is_empty()
            && self.txt.is_empty()
            && self.dt.is_empty()
            && self.dtr.is_empty()
            && self.num.is_empty()
            && self.numr.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CompactDateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    f: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    t: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CompactNumberRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
}

fn pack(state: &InitialState, default_limit: usize) -> CompactState {
    let search = state.search.trim();
    let mut filters = CompactFilters::default();

    for (field, value) in state.filters.active() {
        match value {
            FilterValue::Select(values) => {
                filters.sel.insert(field, values);
            }
            FilterValue::Text(text) => {
                filters.txt.insert(field, text.trim().to_string());
            }
            FilterValue::Date(day) => {
                filters.dt.insert(field, format_date(day));
            }
            FilterValue::DateRange(range) => {
                filters.dtr.insert(
                    field,
                    CompactDateRange {
                        f: range.from.map(format_date),
                        t: range.to.map(format_date),
                    },
                );
            }
            FilterValue::Number(n) => {
                if n.is_finite() {
                    filters.num.insert(field, Some(n));
                }
            }
            FilterValue::NumberRange(range) => {
                filters.numr.insert(
                    field,
                    CompactNumberRange {
                        min: range.min.filter(|v| v.is_finite()),
                        max: range.max.filter(|v| v.is_finite()),
                    },
                );
            }
        }
    }

    CompactState {
        p: (state.page.current_page > 1).then_some(state.page.current_page),
        s: (state.page.page_size > 0 && state.page.page_size != default_limit)
            .then_some(state.page.page_size),
        q: (!search.is_empty()).then(|| search.to_string()),
        sort: state.sort.as_ref().map(|sort| CompactSort {
            k: sort.key.clone(),
            d: (sort.direction == SortDirection::Desc).then(|| sort.direction.to_string()),
        }),
        f: (!filters.is_empty()).then_some(filters),
    }
}

fn unpack_day(field: &str, value: &str) -> Option<chrono::NaiveDate> {
    let day = parse_date(value);
    if day.is_none() {
        warn!(target: "codec", "Skipping compact date {:?} for {}", value, field);
    }
    day
}

fn unpack(compact: CompactState, default_limit: usize) -> InitialState {
    let mut state = InitialState::with_page_size(default_limit);

    if let Some(page) = compact.p.filter(|p| *p > 0) {
        state.page.current_page = page;
    }
    if let Some(size) = compact.s.filter(|s| *s > 0) {
        state.page.page_size = size;
    }
    if let Some(search) = compact.q {
        state.search = search.trim().to_string();
    }
    state.sort = compact.sort.and_then(|sort| {
        let direction = match sort.d.as_deref() {
            None => SortDirection::Asc,
            Some(d) => SortDirection::parse(d).unwrap_or_else(|| {
                warn!(target: "codec", "Unknown compact sort direction {:?}", d);
                SortDirection::Asc
            }),
        };
        let key = sort.k.trim();
        (!key.is_empty()).then(|| SortSpec::new(key, direction))
    });

    let mut filters = FilterSet::new();
    if let Some(f) = compact.f {
        for (field, values) in f.sel {
            filters.set(field, FilterValue::Select(values));
        }
        for (field, text) in f.txt {
            filters.set(field, FilterValue::Text(text.trim().to_string()));
        }
        for (field, value) in f.dt {
            if let Some(day) = unpack_day(&field, &value) {
                filters.set(field, FilterValue::Date(day));
            }
        }
        for (field, range) in f.dtr {
            let from = match range.f.as_deref() {
                Some(v) => match unpack_day(&field, v) {
                    Some(day) => Some(day),
                    None => continue,
                },
                None => None,
            };
            let to = match range.t.as_deref() {
                Some(v) => match unpack_day(&field, v) {
                    Some(day) => Some(day),
                    None => continue,
                },
                None => None,
            };
            filters.set(field, FilterValue::DateRange(DateRange::new(from, to)));
        }
        for (field, n) in f.num {
            match n {
                Some(n) => filters.set(field, FilterValue::Number(n)),
                None => warn!(target: "codec", "Skipping compact number filter for {}", field),
            }
        }
        for (field, range) in f.numr {
            filters.set(field, FilterValue::NumberRange(NumberRange::new(range.min, range.max)));
        }
    }
    state.filters = filters;
    state
}

/// Pack the non-default parts of the state into base64. All-default state
/// packs to an empty string.
pub fn encode_compact(state: &InitialState, default_limit: usize) -> CodecResult<String> {
    let compact = pack(state, default_limit);
    let json = serde_json::to_string(&compact)?;
    if json == "{}" {
        return Ok(String::new());
    }
    Ok(BASE64.encode(json))
}

/// Unpack a compact state, failing on malformed base64 or JSON
pub fn try_decode_compact(encoded: &str, default_limit: usize) -> CodecResult<InitialState> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Ok(InitialState::with_page_size(default_limit));
    }
    let bytes = BASE64.decode(encoded)?;
    let compact: CompactState = serde_json::from_slice(&bytes)?;
    Ok(unpack(compact, default_limit))
}

/// Unpack a compact state; anything malformed yields the default state
pub fn decode_compact(encoded: &str, default_limit: usize) -> InitialState {
    try_decode_compact(encoded, default_limit).unwrap_or_else(|e| {
        warn!(target: "codec", "Ignoring compact state: {}", e);
        InitialState::with_page_size(default_limit)
    })
}
