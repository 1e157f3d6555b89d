use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use table_state::data::data_view::derive_rows;
use table_state::data::PageRequest;
use table_state::filter::{FilterSet, FilterValue, NumberRange, RecordFilter};
use table_state::state::{EngineOptions, SortSpec, TableStateEngine};
use serde_json::{json, Value};

fn create_test_data(rows: usize) -> Arc<Vec<Value>> {
    let books = [
        "Commodities Trading",
        "Equity Trading",
        "FX Trading",
        "Bond Trading",
        "Derivatives",
        "Options",
        "Futures",
        "ETF Trading",
        "Structured Products",
        "Money Markets",
    ];

    Arc::new(
        (0..rows)
            .map(|i| {
                json!({
                    "id": i,
                    "book": books[i % books.len()],
                    "value": (i * 7919) % 10_000,
                    "status": format!("STATUS_{}", i % 5),
                })
            })
            .collect(),
    )
}

fn benchmark_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive_rows");
    let search_keys = vec!["book".to_string()];
    let filters = FilterSet::new()
        .with(
            "status",
            FilterValue::Select(vec!["STATUS_1".into(), "STATUS_3".into()]),
        )
        .with("value", FilterValue::NumberRange(NumberRange::new(Some(100.0), Some(9000.0))));
    let sort = SortSpec::desc("value");

    for (label, rows) in [("10k_rows", 10_000), ("50k_rows", 50_000), ("100k_rows", 100_000)] {
        let data = create_test_data(rows);

        group.bench_function(format!("search_{}", label), |b| {
            let filter = RecordFilter::new("trading", &search_keys, &FilterSet::default());
            b.iter(|| derive_rows(&data, black_box(&filter), None, PageRequest::new(1, 20)));
        });

        group.bench_function(format!("filter_sort_{}", label), |b| {
            let filter = RecordFilter::new("", &search_keys, &filters);
            b.iter(|| {
                derive_rows(
                    &data,
                    black_box(&filter),
                    Some(&sort),
                    PageRequest::new(3, 20),
                )
            });
        });
    }

    group.finish();
}

fn benchmark_engine_paging(c: &mut Criterion) {
    let data = create_test_data(50_000);
    let options = EngineOptions::default().with_search_keys(["book"]);
    let mut engine = TableStateEngine::from_shared(data, options, Default::default());
    engine.set_sort(Some(SortSpec::asc("value")));
    engine.flush_events();

    c.bench_function("engine_next_page_50k", |b| {
        b.iter(|| {
            if !engine.next_page() {
                engine.first_page();
            }
            black_box(engine.flush_events().len())
        });
    });
}

criterion_group!(benches, benchmark_derivation, benchmark_engine_paging);
criterion_main!(benches);
