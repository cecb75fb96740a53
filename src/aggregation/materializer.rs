//! Conversion of native aggregation responses into [`AggregationResult`]s.
//!
//! Results are located by the request's name. Sub-aggregation results of a
//! bucket are correlated by name against the request's own sub-aggregation
//! map, so bucket keys that are not requested sub-aggregations (such as
//! `key_as_string`) are ignored.

use std::collections::BTreeMap;

use log::warn;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::aggregation::request::AggregationRequest;
use crate::aggregation::result::{
    AggregationResult, MaxAggregationResult, SignificantTermsAggregationResult,
    SignificantTermsUnit, TermsAggregationResult, TermsAggregationUnit, TopHitsAggregationResult,
};
use crate::response::document::SearchServerDocument;
use crate::response::native::NativeHits;

#[derive(Deserialize)]
struct NativeBucket {
    key: Value,
    #[serde(default)]
    key_as_string: Option<String>,
    #[serde(default)]
    doc_count: u64,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    bg_count: Option<u64>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Deserialize)]
struct NativeBuckets {
    #[serde(default)]
    buckets: Vec<NativeBucket>,
}

#[derive(Deserialize)]
struct NativeValue {
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Deserialize)]
struct NativeTopHits {
    #[serde(default)]
    hits: NativeHits,
}

/// Materialize the result of `request` from a map of native results.
///
/// Returns `None` when the backend returned nothing under the request's
/// name, or for a no-op request.
pub fn materialize(
    request: &AggregationRequest,
    native: &Map<String, Value>,
) -> Option<AggregationResult> {
    if let AggregationRequest::NoOp(_) = request {
        return None;
    }
    let name = request.name();
    let Some(value) = native.get(name) else {
        warn!("No aggregation result with name '{name}' was found in the response");
        return None;
    };
    materialize_value(request, value)
}

fn parse<T: for<'de> Deserialize<'de>>(name: &str, value: &Value) -> Option<T> {
    match T::deserialize(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Could not read aggregation result '{name}': {e}");
            None
        }
    }
}

fn materialize_value(request: &AggregationRequest, value: &Value) -> Option<AggregationResult> {
    let name = request.name().to_string();
    match request {
        AggregationRequest::NoOp(_) => None,
        AggregationRequest::Terms(agg) => {
            let native: NativeBuckets = parse(&name, value)?;
            let units = native
                .buckets
                .into_iter()
                .map(|bucket| TermsAggregationUnit {
                    term: bucket.key,
                    count: bucket.doc_count,
                    subaggregation_results: materialize_subaggregations(
                        &agg.subaggregations,
                        &bucket.rest,
                    ),
                })
                .collect();
            Some(AggregationResult::Terms(TermsAggregationResult { name, units }))
        }
        AggregationRequest::SignificantTerms(_) => {
            let native: NativeBuckets = parse(&name, value)?;
            let units = native
                .buckets
                .into_iter()
                .map(|bucket| SignificantTermsUnit {
                    term: bucket.key_as_string.unwrap_or_else(|| match bucket.key {
                        Value::String(s) => s,
                        other => other.to_string(),
                    }),
                    count: bucket.doc_count,
                    score: bucket.score,
                    background_count: bucket.bg_count,
                })
                .collect();
            Some(AggregationResult::SignificantTerms(
                SignificantTermsAggregationResult { name, units },
            ))
        }
        AggregationRequest::Max(_) => {
            let native: NativeValue = parse(&name, value)?;
            Some(AggregationResult::Max(MaxAggregationResult {
                name,
                value: native.value,
            }))
        }
        AggregationRequest::TopHits(_) => {
            let native: NativeTopHits = parse(&name, value)?;
            let total_hits = native.hits.total.map(|total| total.value).unwrap_or(0);
            let documents = native
                .hits
                .hits
                .into_iter()
                .map(SearchServerDocument::from_top_hit)
                .collect();
            Some(AggregationResult::TopHits(TopHitsAggregationResult {
                name,
                total_hits,
                documents,
            }))
        }
    }
}

fn materialize_subaggregations(
    requests: &BTreeMap<String, AggregationRequest>,
    bucket: &Map<String, Value>,
) -> BTreeMap<String, AggregationResult> {
    requests
        .values()
        .filter_map(|request| {
            let name = request.name();
            let value = bucket.get(name)?;
            materialize_value(request, value).map(|result| (name.to_string(), result))
        })
        .collect()
}
