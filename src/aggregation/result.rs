//! Aggregation results, mirroring the request tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::response::document::SearchServerDocument;

/// One bucket of a terms aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsAggregationUnit {
    /// The bucket key.
    pub term: Value,
    /// Number of documents in the bucket.
    pub count: u64,
    /// Sub-aggregation results, by name.
    pub subaggregation_results: BTreeMap<String, AggregationResult>,
}

impl TermsAggregationUnit {
    /// The bucket key as a string.
    pub fn term_string(&self) -> String {
        match &self.term {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// A sub-aggregation result by name.
    pub fn subaggregation_result(&self, name: &str) -> Option<&AggregationResult> {
        self.subaggregation_results.get(name)
    }
}

/// Result of a terms aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsAggregationResult {
    /// Name of the aggregation.
    pub name: String,
    /// Buckets in backend order.
    pub units: Vec<TermsAggregationUnit>,
}

/// Result of a max aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxAggregationResult {
    /// Name of the aggregation.
    pub name: String,
    /// The maximum; absent when no document had a value.
    pub value: Option<f64>,
}

/// One bucket of a significant terms aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificantTermsUnit {
    /// The term.
    pub term: String,
    /// Number of matching documents containing the term.
    pub count: u64,
    /// Significance score.
    pub score: Option<f64>,
    /// Number of documents in the background set containing the term.
    pub background_count: Option<u64>,
}

/// Result of a significant terms aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificantTermsAggregationResult {
    /// Name of the aggregation.
    pub name: String,
    /// Buckets in backend order.
    pub units: Vec<SignificantTermsUnit>,
}

/// Result of a top hits aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopHitsAggregationResult {
    /// Name of the aggregation.
    pub name: String,
    /// Total number of hits in the bucket.
    pub total_hits: u64,
    /// The top documents.
    pub documents: Vec<SearchServerDocument>,
}

/// Result of one aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AggregationResult {
    Terms(TermsAggregationResult),
    Max(MaxAggregationResult),
    SignificantTerms(SignificantTermsAggregationResult),
    TopHits(TopHitsAggregationResult),
}

impl AggregationResult {
    /// Name of the aggregation.
    pub fn name(&self) -> &str {
        match self {
            AggregationResult::Terms(r) => &r.name,
            AggregationResult::Max(r) => &r.name,
            AggregationResult::SignificantTerms(r) => &r.name,
            AggregationResult::TopHits(r) => &r.name,
        }
    }

    /// The terms result, if this is one.
    pub fn as_terms(&self) -> Option<&TermsAggregationResult> {
        match self {
            AggregationResult::Terms(r) => Some(r),
            _ => None,
        }
    }

    /// The max result, if this is one.
    pub fn as_max(&self) -> Option<&MaxAggregationResult> {
        match self {
            AggregationResult::Max(r) => Some(r),
            _ => None,
        }
    }

    /// The significant terms result, if this is one.
    pub fn as_significant_terms(&self) -> Option<&SignificantTermsAggregationResult> {
        match self {
            AggregationResult::SignificantTerms(r) => Some(r),
            _ => None,
        }
    }

    /// The top hits result, if this is one.
    pub fn as_top_hits(&self) -> Option<&TopHitsAggregationResult> {
        match self {
            AggregationResult::TopHits(r) => Some(r),
            _ => None,
        }
    }
}
