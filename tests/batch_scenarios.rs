use std::sync::Arc;

use serde_json::json;

use elastic_query::aggregation::{
    AggregationRequest, MaxAggregation, TermsAggregation, TopHitsAggregation,
};
use elastic_query::component::{
    CompiledRequest, ElasticSearchComponent, SearchChain, build_request,
};
use elastic_query::config::ElasticQueryConfig;
use elastic_query::error::{ElasticQueryError, Result};
use elastic_query::query::{BoolClause, BoolQuery, MatchAllQuery, Query, RangeQuery, TermQuery};
use elastic_query::request::{DeepPagination, SearchServerRequest, SortCommand};
use elastic_query::response::QueryErrorKind;
use elastic_query::transport::InMemoryTransport;

fn library() -> Result<Arc<InMemoryTransport>> {
    let transport = Arc::new(InMemoryTransport::new());
    let books = [
        json!({"title": "Rust in Action", "lang": "rust", "year": 2021}),
        json!({"title": "Programming Rust", "lang": "rust", "year": 2017}),
        json!({"title": "The Go Programming Language", "lang": "go", "year": 2015}),
        json!({"title": "Zero To Production", "lang": "rust", "year": 2022}),
        json!({"title": "Learning Go", "lang": "go", "year": 2021}),
        json!({"title": "Fluent Python", "lang": "python", "year": 2022}),
    ];
    transport.add_documents("books", books)?;
    Ok(transport)
}

fn match_all() -> Query {
    MatchAllQuery::new().into()
}

#[test]
fn unreachable_backend_fails_the_whole_batch_once() -> Result<()> {
    let transport = library()?;
    transport.set_unreachable(true);
    let component = ElasticSearchComponent::new(transport.clone(), ElasticQueryConfig::default())?;

    let responses = component.execute(&[
        SearchServerRequest::new("books", match_all()),
        SearchServerRequest::new("books", TermQuery::new("lang", "go").into()),
    ])?;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].query_error(), Some(QueryErrorKind::NoNodeAvailable));
    assert_eq!(responses[0].num_found(), 0);
    Ok(())
}

#[test]
fn negative_rows_return_aggregations_only() -> Result<()> {
    let transport = library()?;
    let component = ElasticSearchComponent::new(transport.clone(), ElasticQueryConfig::default())?;
    let by_lang: AggregationRequest = TermsAggregation::new("by_lang", "lang").into();
    let request = SearchServerRequest::new("books", match_all())
        .with_rows(-1)
        .add_aggregation(by_lang.clone());

    match build_request(&request, component.config())? {
        CompiledRequest::Search { native, .. } => {
            assert_eq!(native.body["size"], json!(0));
            assert!(native.body["aggs"].get("by_lang").is_some());
        }
        other => panic!("Expected a search, got {other:?}"),
    }

    let mut responses = component.execute(&[request])?;
    assert_eq!(responses[0].num_found(), 6);
    assert_eq!(responses[0].document_results().count(), 0);

    let result = responses[0].aggregation_result(&by_lang).expect("by_lang is returned");
    let terms = result.as_terms().expect("a terms result");
    let counts: Vec<(String, u64)> = terms
        .units
        .iter()
        .map(|unit| (unit.term_string(), unit.count))
        .collect();
    assert_eq!(
        counts,
        vec![("rust".to_string(), 3), ("go".to_string(), 2), ("python".to_string(), 1)]
    );
    Ok(())
}

#[test]
fn nested_aggregations_are_found_by_name() -> Result<()> {
    let transport = library()?;
    let component = ElasticSearchComponent::new(transport, ElasticQueryConfig::default())?;
    let by_lang: AggregationRequest = TermsAggregation::new("by_lang", "lang")
        .add_subaggregation(MaxAggregation::field("latest", "year").into())
        .add_subaggregation(TopHitsAggregation::new("sample").with_size(1).into())
        .into();
    let request = SearchServerRequest::new("books", match_all())
        .with_rows(-1)
        .add_aggregation(by_lang.clone());

    let responses = component.execute(&[request])?;
    let result = responses[0].aggregation_result(&by_lang).expect("by_lang is returned");
    assert_eq!(result.name(), "by_lang");

    let rust = &result.as_terms().expect("a terms result").units[0];
    assert_eq!(rust.term_string(), "rust");
    let latest = rust
        .subaggregation_result("latest")
        .and_then(|result| result.as_max())
        .expect("latest is returned");
    assert_eq!(latest.value, Some(2022.0));

    let sample = rust
        .subaggregation_result("sample")
        .and_then(|result| result.as_top_hits())
        .expect("sample is returned");
    assert_eq!(sample.total_hits, 3);
    assert_eq!(sample.documents.len(), 1);

    assert!(rust.subaggregation_result("unknown").is_none());
    Ok(())
}

#[test]
fn mixed_batch_keeps_request_order() -> Result<()> {
    let transport = library()?;
    transport.create_index("archive");
    transport.fail_searches_on("archive", 500);
    let component = ElasticSearchComponent::new(transport, ElasticQueryConfig::default())?;

    let recent = BoolQuery::new(vec![
        BoolClause::must(TermQuery::new("lang", "rust").into()),
        BoolClause::filter(RangeQuery::new("year").greater_than_or_equal(2020).into()),
    ])?;
    let mut responses = component.execute(&[
        SearchServerRequest::new("books", recent.into()).add_sort(SortCommand::descending("year")),
        SearchServerRequest::new("archive", match_all()),
        SearchServerRequest::new("books", TermQuery::new("lang", "go").into()).count_only(),
    ])?;

    assert_eq!(responses.len(), 3);
    let years: Vec<i64> = responses[0]
        .document_results()
        .filter_map(|document| document.field_as("year"))
        .collect();
    assert_eq!(years, vec![2022, 2021]);
    assert_eq!(responses[1].query_error(), Some(QueryErrorKind::NoResponse));
    assert!(responses[1].error_message().is_some());
    assert!(responses[2].is_count_response());
    assert_eq!(responses[2].num_found(), 2);
    Ok(())
}

#[test]
fn compilation_is_deterministic() -> Result<()> {
    let config = ElasticQueryConfig::default();
    let either = BoolQuery::new(vec![
        BoolClause::should(TermQuery::new("lang", "rust").into()),
        BoolClause::should(TermQuery::new("lang", "go").into()),
    ])?;
    let request = SearchServerRequest::new("books", either.into())
        .add_aggregation(TermsAggregation::new("by_lang", "lang").into())
        .add_aggregation(MaxAggregation::field("latest", "year").into())
        .add_sort(SortCommand::ascending("year"))
        .with_deep_pagination(DeepPagination::search_after());

    let first = match build_request(&request, &config)? {
        CompiledRequest::Search { native, .. } => serde_json::to_string(&native)?,
        other => panic!("Expected a search, got {other:?}"),
    };
    let second = match build_request(&request.clone(), &config)? {
        CompiledRequest::Search { native, .. } => serde_json::to_string(&native)?,
        other => panic!("Expected a search, got {other:?}"),
    };
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn chain_runs_components_in_order() -> Result<()> {
    let transport = library()?;
    let component = ElasticSearchComponent::new(transport, ElasticQueryConfig::default())?;
    let chain = SearchChain::new("library").add_component(Box::new(component));

    let carrier = chain.search(vec![SearchServerRequest::new(
        "books",
        TermQuery::new("lang", "python").into(),
    )])?;
    assert_eq!(carrier.trace(), "elasticsearch");
    assert_eq!(carrier.single_response().map(|r| r.num_found()), Some(1));
    Ok(())
}

#[test]
fn aggregation_keys_must_match_their_names() -> Result<()> {
    let transport = library()?;
    let component = ElasticSearchComponent::new(transport.clone(), ElasticQueryConfig::default())?;
    let request: SearchServerRequest = serde_json::from_value(json!({
        "index": "books",
        "query": {"type": "match_all"},
        "rows": -1,
        "aggregations": {
            "by_lang": {
                "type": "terms",
                "name": "by_lang",
                "field": "lang",
                "subaggregations": {"latest": {"type": "max", "name": "newest", "field": "year"}}
            }
        }
    }))?;

    let result = component.execute(&[request]);
    assert!(matches!(result, Err(ElasticQueryError::InvalidArgument(_))));
    assert_eq!(transport.stats().searches, 0);
    Ok(())
}
