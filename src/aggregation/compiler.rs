//! Compilation of aggregation trees into native aggregation objects.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::aggregation::request::{
    AggregationRequest, IncludeExclude, MaxAggregation, OrderCommand, OrderReference,
    SignificantTermsAggregation, TermsAggregation, TopHitsAggregation,
};
use crate::error::{ElasticQueryError, Result};
use crate::request::sort::SortOrder;

/// A compiled aggregation and the name it is registered under.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeAggregation {
    /// Name of the aggregation.
    pub name: String,
    /// Native aggregation body.
    pub body: Value,
}

/// Compile one aggregation tree.
///
/// Returns `None` for a no-op aggregation, which is left out of the request.
pub fn compile_aggregation(request: &AggregationRequest) -> Result<Option<NativeAggregation>> {
    let body = match request {
        AggregationRequest::NoOp(_) => return Ok(None),
        AggregationRequest::Terms(agg) => compile_terms(agg)?,
        AggregationRequest::Max(agg) => compile_max(agg)?,
        AggregationRequest::SignificantTerms(agg) => compile_significant_terms(agg)?,
        AggregationRequest::TopHits(agg) => compile_top_hits(agg)?,
    };
    Ok(Some(NativeAggregation {
        name: request.name().to_string(),
        body,
    }))
}

/// Compile a map of sibling aggregations into a native `aggs` object.
///
/// Results are looked up by aggregation name, so every key must equal the
/// name of the aggregation it holds. No-op entries are not checked.
pub fn compile_aggregations(
    requests: &BTreeMap<String, AggregationRequest>,
) -> Result<Map<String, Value>> {
    let mut aggs = Map::new();
    for (key, request) in requests {
        if let Some(native) = compile_aggregation(request)? {
            if native.name != *key {
                return Err(ElasticQueryError::invalid_argument(format!(
                    "Aggregation '{}' is registered under the key '{key}'",
                    native.name
                )));
            }
            aggs.insert(native.name, native.body);
        }
    }
    Ok(aggs)
}

/// Attach compiled sub-aggregations to a bucket aggregation body.
fn with_subaggregations(
    kind: &str,
    options: Map<String, Value>,
    subaggregations: &BTreeMap<String, AggregationRequest>,
) -> Result<Value> {
    let subs = compile_aggregations(subaggregations)?;
    let mut body = Map::new();
    body.insert(kind.to_string(), Value::Object(options));
    if !subs.is_empty() {
        body.insert("aggs".into(), Value::Object(subs));
    }
    Ok(Value::Object(body))
}

fn reject_subaggregations(
    name: &str,
    subaggregations: &BTreeMap<String, AggregationRequest>,
) -> Result<()> {
    if subaggregations.is_empty() {
        Ok(())
    } else {
        Err(ElasticQueryError::invalid_argument(format!(
            "Aggregation '{name}' is a metric aggregation and cannot have sub-aggregations"
        )))
    }
}

fn compile_terms(agg: &TermsAggregation) -> Result<Value> {
    let mut options = Map::new();
    options.insert("field".into(), json!(agg.field));
    if let Some(size) = agg.size {
        options.insert("size".into(), json!(size));
    }

    let order = agg
        .order
        .iter()
        .map(|order| compile_order(&agg.name, order))
        .collect::<Result<Vec<_>>>()?;
    if !order.is_empty() {
        options.insert("order".into(), Value::Array(order));
    }

    if let Some(include) = agg.include.as_ref().and_then(compile_include_exclude) {
        options.insert("include".into(), include);
    }
    if let Some(exclude) = agg.exclude.as_ref().and_then(compile_include_exclude) {
        options.insert("exclude".into(), exclude);
    }

    with_subaggregations("terms", options, &agg.subaggregations)
}

fn compile_order(aggregation: &str, order: &OrderCommand) -> Result<Value> {
    let direction = order.sort_order.unwrap_or(SortOrder::Descending).as_str();
    let reference_name = || {
        order.reference_name.as_deref().ok_or_else(|| {
            ElasticQueryError::invalid_argument(format!(
                "Order of aggregation '{aggregation}' refers to a sub-aggregation without naming it"
            ))
        })
    };

    let key = match order.reference_type {
        OrderReference::Count => "_count".to_string(),
        OrderReference::Term => "_key".to_string(),
        OrderReference::AggregationSingleValue => reference_name()?.to_string(),
        OrderReference::AggregationMultivalue => {
            let metric = order.metric.ok_or_else(|| {
                ElasticQueryError::invalid_argument(format!(
                    "Order of aggregation '{aggregation}' on a multi-value sub-aggregation needs a metric"
                ))
            })?;
            format!("{}.{}", reference_name()?, metric.as_str())
        }
    };

    let mut item = Map::new();
    item.insert(key, json!(direction));
    Ok(Value::Object(item))
}

/// A pattern compiles to itself; literal values compile to a sorted,
/// de-duplicated list of strings, or nothing when the list is empty.
fn compile_include_exclude(filter: &IncludeExclude) -> Option<Value> {
    match filter {
        IncludeExclude::Pattern(pattern) => Some(json!(pattern)),
        IncludeExclude::Values(values) => {
            let mut terms: Vec<String> = values
                .iter()
                .map(|value| match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            terms.sort();
            terms.dedup();
            if terms.is_empty() { None } else { Some(json!(terms)) }
        }
    }
}

fn compile_max(agg: &MaxAggregation) -> Result<Value> {
    reject_subaggregations(&agg.name, &agg.subaggregations)?;
    if agg.field.is_none() && agg.script.is_none() {
        return Err(ElasticQueryError::invalid_argument(format!(
            "Max aggregation '{}' needs a field or a script",
            agg.name
        )));
    }

    let mut options = Map::new();
    if let Some(field) = &agg.field {
        options.insert("field".into(), json!(field));
    }
    if let Some(script) = &agg.script {
        let mut native = Map::new();
        native.insert("source".into(), json!(script.source));
        if let Some(lang) = &script.lang {
            native.insert("lang".into(), json!(lang));
        }
        options.insert("script".into(), Value::Object(native));
    }
    Ok(json!({ "max": options }))
}

fn compile_top_hits(agg: &TopHitsAggregation) -> Result<Value> {
    reject_subaggregations(&agg.name, &agg.subaggregations)?;

    let mut options = Map::new();
    if !agg.include_fields.is_empty() || !agg.exclude_fields.is_empty() {
        let mut source = Map::new();
        if !agg.include_fields.is_empty() {
            source.insert("includes".into(), json!(agg.include_fields));
        }
        if !agg.exclude_fields.is_empty() {
            source.insert("excludes".into(), json!(agg.exclude_fields));
        }
        options.insert("_source".into(), Value::Object(source));
    }
    if let Some(size) = agg.size {
        options.insert("size".into(), json!(size));
    }
    Ok(json!({ "top_hits": options }))
}

fn compile_significant_terms(agg: &SignificantTermsAggregation) -> Result<Value> {
    let mut options = Map::new();
    options.insert("field".into(), json!(agg.field));
    with_subaggregations("significant_terms", options, &agg.subaggregations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::request::*;

    #[test]
    fn test_no_op_is_skipped() {
        let request: AggregationRequest = NoOpAggregation::default().into();
        assert_eq!(compile_aggregation(&request).unwrap(), None);

        let mut requests = BTreeMap::new();
        requests.insert("skip".to_string(), request);
        requests.insert(
            "max_year".to_string(),
            MaxAggregation::field("max_year", "year").into(),
        );
        let aggs = compile_aggregations(&requests).unwrap();
        assert_eq!(aggs.len(), 1);
        assert_eq!(aggs["max_year"], json!({"max": {"field": "year"}}));
    }

    #[test]
    fn test_terms_compound_order() {
        let request: AggregationRequest = TermsAggregation::new("authors", "author")
            .add_order(OrderCommand::aggregation_metric("stats", OrderMetric::Avg, SortOrder::Ascending))
            .add_order(OrderCommand::aggregation("latest", SortOrder::Descending))
            .add_order(OrderCommand::count(SortOrder::Descending))
            .add_order(OrderCommand {
                reference_type: OrderReference::Term,
                reference_name: None,
                sort_order: None,
                metric: None,
            })
            .with_size(20)
            .into();

        let native = compile_aggregation(&request).unwrap().unwrap();
        assert_eq!(native.name, "authors");
        assert_eq!(
            native.body,
            json!({"terms": {
                "field": "author",
                "size": 20,
                "order": [
                    {"stats.avg": "asc"},
                    {"latest": "desc"},
                    {"_count": "desc"},
                    {"_key": "desc"}
                ]
            }})
        );
    }

    #[test]
    fn test_terms_order_errors() {
        let request: AggregationRequest = TermsAggregation::new("a", "f")
            .add_order(OrderCommand {
                reference_type: OrderReference::AggregationMultivalue,
                reference_name: Some("stats".into()),
                sort_order: None,
                metric: None,
            })
            .into();
        assert!(matches!(
            compile_aggregation(&request),
            Err(ElasticQueryError::InvalidArgument(_))
        ));

        let request: AggregationRequest = TermsAggregation::new("a", "f")
            .add_order(OrderCommand {
                reference_type: OrderReference::AggregationSingleValue,
                reference_name: None,
                sort_order: None,
                metric: None,
            })
            .into();
        assert!(compile_aggregation(&request).is_err());
    }

    #[test]
    fn test_include_exclude() {
        let request: AggregationRequest = TermsAggregation::new("tags", "tag")
            .with_include(IncludeExclude::Pattern("rust.*".into()))
            .with_exclude(IncludeExclude::Values(vec![json!("b"), json!("a"), json!("b"), json!(3)]))
            .into();
        let native = compile_aggregation(&request).unwrap().unwrap();
        assert_eq!(
            native.body,
            json!({"terms": {"field": "tag", "include": "rust.*", "exclude": ["3", "a", "b"]}})
        );

        let request: AggregationRequest = TermsAggregation::new("tags", "tag")
            .with_include(IncludeExclude::Values(Vec::new()))
            .into();
        let native = compile_aggregation(&request).unwrap().unwrap();
        assert_eq!(native.body, json!({"terms": {"field": "tag"}}));
    }

    #[test]
    fn test_nested_subaggregations() {
        let request: AggregationRequest = TermsAggregation::new("authors", "author")
            .add_subaggregation(
                SignificantTermsAggregation::new("keywords", "keyword")
                    .add_subaggregation(TopHitsAggregation::new("best").with_size(1).into())
                    .into(),
            )
            .add_subaggregation(NoOpAggregation { name: "noop".into() }.into())
            .into();

        let native = compile_aggregation(&request).unwrap().unwrap();
        assert_eq!(
            native.body,
            json!({
                "terms": {"field": "author"},
                "aggs": {
                    "keywords": {
                        "significant_terms": {"field": "keyword"},
                        "aggs": {"best": {"top_hits": {"size": 1}}}
                    }
                }
            })
        );
    }

    #[test]
    fn test_max_variants() {
        let request: AggregationRequest =
            MaxAggregation::script("m", "doc['a'].value * 2", Some("painless".into())).into();
        assert_eq!(
            compile_aggregation(&request).unwrap().unwrap().body,
            json!({"max": {"script": {"source": "doc['a'].value * 2", "lang": "painless"}}})
        );

        let request: AggregationRequest = MaxAggregation {
            name: "m".into(),
            field: None,
            script: None,
            subaggregations: BTreeMap::new(),
        }
        .into();
        assert!(compile_aggregation(&request).is_err());
    }

    #[test]
    fn test_metric_rejects_subaggregations() {
        let mut max = MaxAggregation::field("m", "a");
        max.subaggregations.insert(
            "inner".into(),
            MaxAggregation::field("inner", "b").into(),
        );
        assert!(matches!(
            compile_aggregation(&max.into()),
            Err(ElasticQueryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_key_must_match_name() {
        let request: AggregationRequest = serde_json::from_value(json!({
            "type": "terms",
            "name": "by_lang",
            "field": "lang",
            "subaggregations": {
                "latest": {"type": "max", "name": "newest", "field": "year"}
            }
        }))
        .unwrap();
        let err = compile_aggregation(&request).unwrap_err();
        assert!(matches!(err, ElasticQueryError::InvalidArgument(_)));
        assert!(err.to_string().contains("'newest'"));

        let mut requests = BTreeMap::new();
        requests.insert("years".to_string(), MaxAggregation::field("max_year", "year").into());
        assert!(compile_aggregations(&requests).is_err());
    }

    #[test]
    fn test_top_hits_source_filter() {
        let request: AggregationRequest = TopHitsAggregation::new("best")
            .with_include_fields(vec!["title".into(), "author.*".into()])
            .with_exclude_fields(vec!["body".into()])
            .with_size(3)
            .into();
        assert_eq!(
            compile_aggregation(&request).unwrap().unwrap().body,
            json!({"top_hits": {
                "_source": {"includes": ["title", "author.*"], "excludes": ["body"]},
                "size": 3
            }})
        );
    }
}
