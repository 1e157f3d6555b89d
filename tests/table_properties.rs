//! Property-based tests for the derived views and the URL codecs.
//!
//! Tests validate:
//! 1. `paginated` is the `sorted` slice for the requested page
//! 2. Sorting keeps the input order of equal keys
//! 3. A record is filtered in iff it passes every filter
//! 4. Both URL forms decode to the state they were encoded from

use chrono::NaiveDate;
use proptest::prelude::*;
use serde_json::{json, Value};
use table_state::data::PageRequest;
use table_state::filter::{DateRange, FilterSet, FilterValue, NumberRange};
use table_state::state::{EngineOptions, InitialState, SortDirection, SortSpec, TableStateEngine};
use table_state::url_state::{decode_compact, decode_query, encode_compact, encode_query};

const DEFAULT_LIMIT: usize = 10;

fn numbered(count: usize) -> Vec<Value> {
    (0..count).map(|id| json!({"id": id})).collect()
}

fn ids(rows: &[Value]) -> Vec<u64> {
    rows.iter().filter_map(|r| r["id"].as_u64()).collect()
}

// ===== Property 1: Pagination Slice =====

proptest! {
    #[test]
    fn paginated_is_the_page_slice_of_sorted(
        count in 0usize..40,
        page in 1usize..12,
        size in 1usize..12,
    ) {
        let mut engine = TableStateEngine::new(numbered(count), EngineOptions::default());
        prop_assert!(engine.set_page_size(size));
        prop_assert!(engine.set_page(page));

        let state = engine.state();
        let start = ((page - 1) * size).min(count);
        let end = (page * size).min(count);
        prop_assert_eq!(&state.paginated[..], &state.sorted[start..end]);
        prop_assert!(state.paginated.len() <= size);
        prop_assert_eq!(state.pagination.total_pages, count.div_ceil(size));
        prop_assert!(state.pagination.start_index <= state.pagination.end_index);
        prop_assert!(state.pagination.end_index <= state.pagination.total_items);
    }
}

// ===== Property 2: Sort Stability =====

proptest! {
    #[test]
    fn sort_keeps_input_order_of_equal_keys(
        keys in prop::collection::vec(0i64..4, 0..30),
        descending in any::<bool>(),
    ) {
        let records: Vec<Value> = keys
            .iter()
            .enumerate()
            .map(|(id, key)| json!({"id": id, "key": key}))
            .collect();
        let mut engine = TableStateEngine::new(records, EngineOptions::default().with_page_size(100));
        let direction = if descending { SortDirection::Desc } else { SortDirection::Asc };
        engine.set_sort(Some(SortSpec::new("key", direction)));

        let sorted = &engine.state().sorted;
        prop_assert_eq!(sorted.len(), keys.len());
        for pair in sorted.windows(2) {
            let (a, b) = (pair[0]["key"].as_i64(), pair[1]["key"].as_i64());
            if descending {
                prop_assert!(a >= b);
            } else {
                prop_assert!(a <= b);
            }
            if a == b {
                prop_assert!(pair[0]["id"].as_u64() < pair[1]["id"].as_u64());
            }
        }
    }
}

// ===== Property 3: Filter AND/OR =====

proptest! {
    #[test]
    fn filtered_records_pass_every_filter(
        rows in prop::collection::vec((0usize..3, 0i64..20), 0..30),
        checked in prop::collection::vec(0usize..3, 0..3),
        min in prop::option::of(0i64..20),
        max in prop::option::of(0i64..20),
    ) {
        let statuses = ["open", "hold", "closed"];
        let records: Vec<Value> = rows
            .iter()
            .enumerate()
            .map(|(id, (status, qty))| json!({"id": id, "status": statuses[*status], "qty": qty}))
            .collect();
        let checked: Vec<String> = checked.iter().map(|i| statuses[*i].to_string()).collect();

        let mut engine = TableStateEngine::new(records, EngineOptions::default().with_page_size(100));
        engine.set_pending_filter("status", FilterValue::Select(checked.clone()));
        engine.set_pending_filter(
            "qty",
            FilterValue::NumberRange(NumberRange::new(min.map(|m| m as f64), max.map(|m| m as f64))),
        );
        engine.apply_filters();

        let expected: Vec<u64> = rows
            .iter()
            .enumerate()
            .filter(|(_, (status, qty))| {
                (checked.is_empty() || checked.iter().any(|c| c == statuses[*status]))
                    && min.map_or(true, |m| *qty >= m)
                    && max.map_or(true, |m| *qty <= m)
            })
            .map(|(id, _)| id as u64)
            .collect();
        prop_assert_eq!(ids(&engine.state().filtered), expected);
    }
}

// ===== Property 4: URL Round-Trip =====

fn day() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2030, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn quarter() -> impl Strategy<Value = f64> {
    (-4000i32..4000).prop_map(|n| n as f64 / 4.0)
}

fn filter_value() -> impl Strategy<Value = FilterValue> {
    prop_oneof![
        prop::collection::vec("[a-z]{1,4}", 1..4).prop_map(FilterValue::Select),
        "[a-z]{1,6}".prop_map(FilterValue::Text),
        day().prop_map(FilterValue::Date),
        (prop::option::of(day()), prop::option::of(day()))
            .prop_map(|(from, to)| FilterValue::DateRange(DateRange::new(from, to))),
        quarter().prop_map(FilterValue::Number),
        (prop::option::of(quarter()), prop::option::of(quarter()))
            .prop_map(|(min, max)| FilterValue::NumberRange(NumberRange::new(min, max))),
    ]
}

fn initial_state() -> impl Strategy<Value = InitialState> {
    (
        1usize..50,
        prop_oneof![Just(DEFAULT_LIMIT), 1usize..100],
        "[a-z0-9]{0,6}",
        prop::option::of(("[a-z]{1,6}", any::<bool>())),
        prop::collection::vec(("[a-z]{1,5}", filter_value()), 0..5),
    )
        .prop_map(|(page, size, search, sort, filters)| InitialState {
            page: PageRequest::new(page, size),
            search,
            sort: sort.map(|(key, desc)| {
                if desc {
                    SortSpec::desc(key)
                } else {
                    SortSpec::asc(key)
                }
            }),
            filters: filters
                .into_iter()
                .fold(FilterSet::new(), |set, (field, value)| set.with(field, value)),
        })
}

proptest! {
    #[test]
    fn query_form_round_trips(state in initial_state()) {
        let encoded = encode_query(&state, DEFAULT_LIMIT);
        let decoded = decode_query(&encoded, DEFAULT_LIMIT);
        prop_assert_eq!(&decoded, &state);
        prop_assert_eq!(encode_query(&decoded, DEFAULT_LIMIT), encoded);
    }

    #[test]
    fn compact_form_round_trips(state in initial_state()) {
        let encoded = encode_compact(&state, DEFAULT_LIMIT).unwrap();
        let decoded = decode_compact(&encoded, DEFAULT_LIMIT);
        prop_assert_eq!(&decoded, &state);
        prop_assert_eq!(encode_compact(&decoded, DEFAULT_LIMIT).unwrap(), encoded);
    }

    #[test]
    fn query_decoding_never_panics(query in ".{0,80}") {
        let state = decode_query(&query, DEFAULT_LIMIT);
        prop_assert!(state.page.current_page >= 1);
        prop_assert!(state.page.page_size >= 1);
    }
}
