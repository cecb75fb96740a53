//! Criterion benchmarks for elastic-query.
//!
//! - Query and request compilation
//! - Aggregation materialization
//! - Cursor draining across scroll and point-in-time batches

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::json;

use elastic_query::aggregation::{AggregationRequest, MaxAggregation, TermsAggregation, materialize};
use elastic_query::component::{ElasticSearchComponent, build_request};
use elastic_query::config::ElasticQueryConfig;
use elastic_query::query::compiler::compile_query;
use elastic_query::query::{
    BoolClause, BoolQuery, MatchAllQuery, MatchQuery, NestedQuery, Query, RangeQuery, TermQuery,
};
use elastic_query::request::{DeepPagination, SearchServerRequest, SortCommand};
use elastic_query::transport::InMemoryTransport;

/// A bool query with `width` clauses of mixed types.
fn generate_query(width: usize) -> Query {
    let clauses = (0..width)
        .map(|i| match i % 4 {
            0 => BoolClause::must(MatchQuery::new(format!("title_{i}"), "search engine").into()),
            1 => BoolClause::filter(TermQuery::new("lang", format!("lang_{i}")).into()),
            2 => BoolClause::filter(RangeQuery::new("year").greater_than_or_equal(2000 + i as u64).into()),
            _ => BoolClause::should(
                NestedQuery::new("authors", TermQuery::new("authors.name", "knuth").into()).into(),
            ),
        })
        .collect();
    BoolQuery::new(clauses)
        .map(Query::from)
        .unwrap_or_else(|_| MatchAllQuery::new().into())
}

fn generate_transport(count: usize) -> Arc<InMemoryTransport> {
    let transport = Arc::new(InMemoryTransport::new());
    transport
        .add_documents(
            "docs",
            (0..count).map(|i| json!({"n": i, "lang": format!("lang_{}", i % 13), "year": 1990 + i % 35})),
        )
        .unwrap();
    transport
}

/// Benchmark query and request compilation.
fn bench_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("compilation");
    let config = ElasticQueryConfig::default();

    for width in [4, 32, 256] {
        let query = generate_query(width);
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::new("compile_query", width), &query, |b, query| {
            b.iter(|| black_box(compile_query(black_box(query))))
        });
    }

    let request = SearchServerRequest::new("docs", generate_query(32))
        .with_rows(100)
        .add_aggregation(
            TermsAggregation::new("by_lang", "lang")
                .add_subaggregation(MaxAggregation::field("latest", "year").into())
                .into(),
        )
        .add_sort(SortCommand::ascending("_shard_doc"))
        .with_deep_pagination(DeepPagination::search_after());
    group.bench_function("build_request", |b| {
        b.iter(|| black_box(build_request(black_box(&request), &config)))
    });

    group.finish();
}

/// Benchmark turning native aggregation results into typed results.
fn bench_materialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("materialization");

    let request: AggregationRequest = TermsAggregation::new("by_lang", "lang")
        .add_subaggregation(MaxAggregation::field("latest", "year").into())
        .into();
    let buckets: Vec<_> = (0..1000)
        .map(|i| json!({"key": format!("lang_{i}"), "doc_count": 1000 - i, "latest": {"value": 2000 + i}}))
        .collect();
    let native = json!({"by_lang": {"buckets": buckets}});
    let native = native.as_object().cloned().unwrap_or_default();

    group.throughput(Throughput::Elements(1000));
    group.bench_function("terms_with_max", |b| {
        b.iter(|| black_box(materialize(black_box(&request), &native)))
    });

    group.finish();
}

/// Benchmark draining a cursor through its continuation batches.
fn bench_cursor_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor_drain");
    group.sample_size(20);

    let transport = generate_transport(20_000);
    let component = ElasticSearchComponent::new(transport, ElasticQueryConfig::default()).unwrap();

    for (label, pagination) in [
        ("scroll", DeepPagination::scroll().suppress_sort_warning()),
        ("search_after", DeepPagination::search_after()),
    ] {
        let request = SearchServerRequest::new("docs", MatchAllQuery::new().into())
            .with_rows(1000)
            .add_sort(SortCommand::ascending(if label == "scroll" { "_doc" } else { "_shard_doc" }))
            .with_deep_pagination(pagination);

        group.throughput(Throughput::Elements(20_000));
        group.bench_function(label, |b| {
            b.iter(|| {
                let mut responses = component.execute(std::slice::from_ref(&request)).unwrap();
                black_box(responses[0].document_results().count())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compilation, bench_materialization, bench_cursor_drain);
criterion_main!(benches);
