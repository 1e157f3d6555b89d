use serde_json::{json, Value};
use std::time::{Duration, Instant};
use table_state::data::loaders::read_csv;
use table_state::data::DataValue;
use table_state::debouncer::SearchInput;
use table_state::filter::{FilterKind, FilterSet, FilterValue, NumberRange};
use table_state::state::{EngineOptions, InitialState, SortSpec, TableEvent, TableStateEngine};
use table_state::url_state::{decode_query, encode_query};

fn ids(rows: &[Value]) -> Vec<i64> {
    rows.iter().filter_map(|r| r["id"].as_i64()).collect()
}

fn ages() -> Vec<Value> {
    vec![
        json!({"id": 1, "age": 20}),
        json!({"id": 2, "age": 30}),
        json!({"id": 3, "age": 25}),
    ]
}

fn people() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "Alice", "status": "active", "city": "Leeds"}),
        json!({"id": 2, "name": "Bob", "status": "inactive", "city": "York"}),
        json!({"id": 3, "name": "Carol", "status": "active", "city": "Hull"}),
        json!({"id": 4, "name": "Dave", "status": "pending", "city": "Leeds"}),
        json!({"id": 5, "name": "Abigail", "status": "active", "city": "York"}),
    ]
}

fn engine(records: Vec<Value>) -> TableStateEngine<Value> {
    let options = EngineOptions::default().with_search_keys(["name", "city"]);
    let mut engine = TableStateEngine::new(records, options);
    engine.flush_events();
    engine
}

#[test]
fn test_number_range_then_sort() {
    let mut engine = engine(ages());
    engine.set_pending_filter("age", FilterValue::NumberRange(NumberRange::min(21.0)));
    assert_eq!(ids(&engine.state().filtered), vec![1, 2, 3]);

    engine.apply_filters();
    assert_eq!(ids(&engine.state().filtered), vec![2, 3]);

    engine.set_sort(Some(SortSpec::asc("age")));
    assert_eq!(ids(&engine.state().sorted), vec![3, 2]);
    assert_eq!(ids(&engine.state().paginated), vec![3, 2]);
}

#[test]
fn test_second_page_of_five() {
    let mut engine = engine(people());
    assert!(engine.set_page_size(2));
    assert!(engine.set_page(2));

    let state = engine.state();
    assert_eq!(ids(&state.paginated), vec![3, 4]);
    assert_eq!(state.pagination.total_pages, 3);
    assert_eq!(state.pagination.start_index, 2);
    assert_eq!(state.pagination.end_index, 4);
}

#[test]
fn test_default_state_encodes_to_empty_query() {
    let state = InitialState::with_page_size(10);
    let query = encode_query(&state, 10);
    assert!(!query.contains("page"));
    assert!(!query.contains("size"));

    let decoded = decode_query("", 10);
    assert_eq!(decoded.page.current_page, 1);
    assert_eq!(decoded.page.page_size, 10);
    assert_eq!(decoded, state);
}

#[test]
fn test_empty_select_excludes_nothing() {
    let mut filters = FilterSet::new();
    filters.select.insert("status".to_string(), Vec::new());
    let initial = InitialState {
        filters,
        ..InitialState::with_page_size(10)
    };
    let engine = TableStateEngine::with_initial_state(people(), EngineOptions::default(), initial);
    assert_eq!(engine.state().filtered.len(), 5);

    let mut engine = engine;
    engine.set_pending_filter("status", FilterValue::Select(Vec::new()));
    engine.apply_filters();
    assert_eq!(engine.state().filtered.len(), 5);
}

#[test]
fn test_keystrokes_collapse_into_one_search() {
    let mut engine = engine(people());
    let t0 = Instant::now();

    engine.on_search_input_at("ab", t0);
    engine.on_search_input_at("abc", t0 + Duration::from_millis(100));
    engine.on_search_input_at("abcd", t0 + Duration::from_millis(200));
    assert!(!engine.poll_debounce_at(t0 + Duration::from_millis(250)));
    assert!(engine.flush_events().is_empty());

    assert!(engine.poll_debounce_at(t0 + Duration::from_millis(600)));
    assert!(!engine.poll_debounce_at(t0 + Duration::from_millis(900)));

    let filter_events: Vec<_> = engine
        .flush_events()
        .into_iter()
        .filter_map(|event| match event {
            TableEvent::FilterChanged(snapshot) => Some(snapshot),
            _ => None,
        })
        .collect();
    assert_eq!(filter_events.len(), 1);
    assert_eq!(filter_events[0].search, "abcd");
}

#[test]
fn test_search_matches_any_key_case_insensitively() {
    let mut engine = engine(people());
    engine.on_search_input("  LEEDS ");
    engine.submit_search();
    assert_eq!(ids(&engine.state().filtered), vec![1, 4]);
    assert_eq!(engine.state().search, "LEEDS");

    engine.on_search_input("ab");
    engine.submit_search();
    assert_eq!(ids(&engine.state().filtered), vec![5]);
}

#[test]
fn test_min_search_length_holds_back_short_input() {
    let options = EngineOptions {
        min_search_length: 2,
        ..EngineOptions::default().with_search_keys(["name"])
    };
    let mut engine = TableStateEngine::new(people(), options);
    let t0 = Instant::now();

    assert_eq!(engine.on_search_input_at("a", t0), SearchInput::TooShort);
    assert!(!engine.has_pending_search());
    assert_eq!(engine.search_input(), "a");

    assert_eq!(engine.on_search_input_at("car", t0), SearchInput::Scheduled);
    assert!(engine.poll_debounce_at(t0 + Duration::from_secs(1)));
    assert_eq!(ids(&engine.state().filtered), vec![3]);

    assert_eq!(engine.on_search_input_at("", t0 + Duration::from_secs(2)), SearchInput::Scheduled);
    assert!(engine.poll_debounce_at(t0 + Duration::from_secs(3)));
    assert_eq!(engine.state().filtered.len(), 5);
}

#[test]
fn test_dispose_drops_scheduled_search() {
    let mut engine = engine(people());
    let t0 = Instant::now();
    engine.on_search_input_at("bob", t0);
    engine.dispose();

    assert!(!engine.has_pending_search());
    assert!(!engine.poll_debounce_at(t0 + Duration::from_secs(1)));
    assert_eq!(engine.state().filtered.len(), 5);
}

#[test]
fn test_submit_after_dispose_does_nothing() {
    let mut engine = engine(people());
    engine.dispose();
    engine.on_search_input("bob");
    engine.submit_search();

    assert_eq!(engine.search_input(), "bob");
    assert_eq!(engine.state().search, "");
    assert_eq!(engine.state().filtered.len(), 5);
    assert!(engine.flush_events().is_empty());
}

#[test]
fn test_nan_scores_sort_after_numbers() {
    let mut csv = String::from("id,score\n");
    for i in 0..200 {
        if i % 3 == 0 {
            csv.push_str(&format!("{},NaN\n", i));
        } else {
            csv.push_str(&format!("{},{}\n", i, (i * 37) % 101));
        }
    }
    let loaded = read_csv(csv.as_bytes()).unwrap();
    let mut engine = TableStateEngine::new(loaded.records, EngineOptions::default().with_page_size(500));
    engine.set_sort(Some(SortSpec::asc("score")));

    let scores: Vec<DataValue> = engine.state().sorted.iter().map(|r| r["score"].clone()).collect();
    assert_eq!(scores.len(), 200);
    let numbers: Vec<f64> = scores.iter().filter_map(|v| v.as_number()).collect();
    assert_eq!(numbers.len(), 133);
    assert!(numbers.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(scores[133..]
        .iter()
        .all(|v| matches!(v, DataValue::Float(f) if f.is_nan())));

    engine.set_sort(Some(SortSpec::desc("score")));
    let scores: Vec<DataValue> = engine.state().sorted.iter().map(|r| r["score"].clone()).collect();
    assert!(scores[..67]
        .iter()
        .all(|v| matches!(v, DataValue::Float(f) if f.is_nan())));
    let numbers: Vec<f64> = scores[67..].iter().filter_map(|v| v.as_number()).collect();
    assert_eq!(numbers.len(), 133);
    assert!(numbers.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[test]
fn test_pending_filters_only_apply_on_request() {
    let mut engine = engine(people());
    engine.toggle_pending_select("status", "active", true);
    engine.toggle_pending_select("status", "pending", true);
    assert!(engine.has_pending_filter_changes());
    assert_eq!(engine.active_filter_count(), 0);

    engine.apply_filters();
    assert!(!engine.has_pending_filter_changes());
    assert_eq!(engine.active_filter_count(), 2);
    assert_eq!(ids(&engine.state().filtered), vec![1, 3, 4, 5]);

    engine.set_pending_filter("city", FilterValue::Text("york".into()));
    engine.reset_pending_filters();
    assert_eq!(engine.pending_filters(), engine.applied_filters());

    engine.clear_pending_filter(FilterKind::Select, "status");
    engine.apply_filters();
    assert_eq!(engine.state().filtered.len(), 5);
}

#[test]
fn test_filters_and_search_reset_page() {
    let mut engine = engine(people());
    engine.set_page_size(2);
    engine.set_page(3);
    assert_eq!(engine.page_request().current_page, 3);

    engine.set_pending_filter("status", FilterValue::Select(vec!["active".into()]));
    engine.apply_filters();
    assert_eq!(engine.page_request().current_page, 1);

    engine.set_page(2);
    engine.on_search_input("a");
    engine.submit_search();
    assert_eq!(engine.page_request().current_page, 1);

    engine.set_page(2);
    engine.clear_all_filters();
    assert_eq!(engine.page_request().current_page, 1);
    assert!(engine.applied_filters().select.is_empty());
    assert_eq!(engine.search_input(), "");
}

#[test]
fn test_page_navigation() {
    let mut engine = engine(people());
    engine.set_page_size(2);

    assert!(!engine.previous_page());
    assert!(engine.next_page());
    assert!(engine.next_page());
    assert!(!engine.next_page());
    assert_eq!(ids(&engine.state().paginated), vec![5]);

    assert!(engine.first_page());
    assert_eq!(engine.page_request().current_page, 1);
    assert!(engine.last_page());
    assert_eq!(engine.page_request().current_page, 3);

    assert!(!engine.set_page(0));
    assert!(!engine.set_page_size(0));
    assert_eq!(engine.page_request().current_page, 3);

    assert!(engine.set_page(9));
    assert!(engine.state().paginated.is_empty());
    assert_eq!(engine.state().pagination.start_index, 5);
}

#[test]
fn test_sort_toggles_and_clears() {
    let mut engine = engine(people());
    engine.sort_by("name");
    assert_eq!(engine.sort(), Some(&SortSpec::asc("name")));
    assert_eq!(ids(&engine.state().sorted), vec![5, 1, 2, 3, 4]);

    engine.sort_by("name");
    assert_eq!(engine.sort(), Some(&SortSpec::desc("name")));
    assert_eq!(ids(&engine.state().sorted), vec![4, 3, 2, 1, 5]);

    engine.sort_by("city");
    assert_eq!(engine.sort(), Some(&SortSpec::asc("city")));
    assert_eq!(ids(&engine.state().sorted), vec![3, 1, 4, 2, 5]);

    engine.clear_sort();
    assert_eq!(ids(&engine.state().sorted), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_persisted_state_round_trips_through_url() {
    let mut engine = engine(people());
    engine.set_pending_filter("status", FilterValue::Select(vec!["active".into()]));
    engine.apply_filters();
    engine.on_search_input("a");
    engine.submit_search();
    engine.sort_by("name");
    engine.set_page_size(2);
    engine.set_page(2);

    let persisted = engine.persisted_state();
    let query = encode_query(&persisted, 10);
    let restored = decode_query(&query, 10);
    assert_eq!(restored, persisted);

    let mut other = TableStateEngine::new(people(), EngineOptions::default().with_search_keys(["name", "city"]));
    other.restore(restored);
    assert_eq!(other.state().paginated, engine.state().paginated);
    assert_eq!(other.search_input(), "a");
}
