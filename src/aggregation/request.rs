//! Aggregation request tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::sort::SortOrder;

/// What a terms aggregation order item refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderReference {
    /// A single-value metric sub-aggregation.
    AggregationSingleValue,
    /// One metric of a multi-value sub-aggregation.
    AggregationMultivalue,
    /// The bucket document count.
    Count,
    /// The bucket term.
    Term,
}

/// Metric of a multi-value sub-aggregation used for ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderMetric {
    Avg,
    Min,
    Max,
    Sum,
    Count,
}

impl OrderMetric {
    /// Native name of the metric.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderMetric::Avg => "avg",
            OrderMetric::Min => "min",
            OrderMetric::Max => "max",
            OrderMetric::Sum => "sum",
            OrderMetric::Count => "count",
        }
    }
}

/// One item of a compound bucket order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCommand {
    /// What the order refers to.
    pub reference_type: OrderReference,
    /// Name of the referenced sub-aggregation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_name: Option<String>,
    /// Direction; descending when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    /// Metric of a multi-value sub-aggregation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<OrderMetric>,
}

impl OrderCommand {
    /// Order by document count.
    pub fn count(order: SortOrder) -> Self {
        OrderCommand {
            reference_type: OrderReference::Count,
            reference_name: None,
            sort_order: Some(order),
            metric: None,
        }
    }

    /// Order by term.
    pub fn term(order: SortOrder) -> Self {
        OrderCommand {
            reference_type: OrderReference::Term,
            reference_name: None,
            sort_order: Some(order),
            metric: None,
        }
    }

    /// Order by a single-value sub-aggregation.
    pub fn aggregation<S: Into<String>>(name: S, order: SortOrder) -> Self {
        OrderCommand {
            reference_type: OrderReference::AggregationSingleValue,
            reference_name: Some(name.into()),
            sort_order: Some(order),
            metric: None,
        }
    }

    /// Order by one metric of a multi-value sub-aggregation.
    pub fn aggregation_metric<S: Into<String>>(name: S, metric: OrderMetric, order: SortOrder) -> Self {
        OrderCommand {
            reference_type: OrderReference::AggregationMultivalue,
            reference_name: Some(name.into()),
            sort_order: Some(order),
            metric: Some(metric),
        }
    }
}

/// Terms included in or excluded from a terms aggregation.
///
/// A string is a regular expression; an array is a set of literal terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IncludeExclude {
    /// A regular expression.
    Pattern(String),
    /// Literal terms.
    Values(Vec<Value>),
}

/// Buckets documents by the terms of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsAggregation {
    /// Name of the aggregation.
    pub name: String,
    /// The field.
    pub field: String,
    /// Compound bucket order, primary key first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<OrderCommand>,
    /// Terms to include.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<IncludeExclude>,
    /// Terms to exclude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<IncludeExclude>,
    /// Maximum number of buckets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// Sub-aggregations computed per bucket.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subaggregations: BTreeMap<String, AggregationRequest>,
}

impl TermsAggregation {
    /// Create a terms aggregation.
    pub fn new<N: Into<String>, F: Into<String>>(name: N, field: F) -> Self {
        TermsAggregation {
            name: name.into(),
            field: field.into(),
            order: Vec::new(),
            include: None,
            exclude: None,
            size: None,
            subaggregations: BTreeMap::new(),
        }
    }

    /// Append an order item.
    pub fn add_order(mut self, order: OrderCommand) -> Self {
        self.order.push(order);
        self
    }

    /// Set the included terms.
    pub fn with_include(mut self, include: IncludeExclude) -> Self {
        self.include = Some(include);
        self
    }

    /// Set the excluded terms.
    pub fn with_exclude(mut self, exclude: IncludeExclude) -> Self {
        self.exclude = Some(exclude);
        self
    }

    /// Set the maximum number of buckets.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Add a sub-aggregation under its own name.
    pub fn add_subaggregation(mut self, aggregation: AggregationRequest) -> Self {
        self.subaggregations
            .insert(aggregation.name().to_string(), aggregation);
        self
    }
}

/// Script computing the values of a metric aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationScript {
    /// Script source.
    pub source: String,
    /// Script language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

/// Maximum of a field or script value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxAggregation {
    /// Name of the aggregation.
    pub name: String,
    /// The field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<AggregationScript>,
    /// Sub-aggregations; metric aggregations accept none.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subaggregations: BTreeMap<String, AggregationRequest>,
}

impl MaxAggregation {
    /// Maximum of a field.
    pub fn field<N: Into<String>, F: Into<String>>(name: N, field: F) -> Self {
        MaxAggregation {
            name: name.into(),
            field: Some(field.into()),
            script: None,
            subaggregations: BTreeMap::new(),
        }
    }

    /// Maximum of a script value.
    pub fn script<N: Into<String>, S: Into<String>>(name: N, source: S, lang: Option<String>) -> Self {
        MaxAggregation {
            name: name.into(),
            field: None,
            script: Some(AggregationScript {
                source: source.into(),
                lang,
            }),
            subaggregations: BTreeMap::new(),
        }
    }
}

/// The best matching documents per bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopHitsAggregation {
    /// Name of the aggregation.
    pub name: String,
    /// Source field patterns to include.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_fields: Vec<String>,
    /// Source field patterns to exclude.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_fields: Vec<String>,
    /// Number of hits per bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// Sub-aggregations; top hits accept none.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subaggregations: BTreeMap<String, AggregationRequest>,
}

impl TopHitsAggregation {
    /// Create a top hits aggregation.
    pub fn new<N: Into<String>>(name: N) -> Self {
        TopHitsAggregation {
            name: name.into(),
            include_fields: Vec::new(),
            exclude_fields: Vec::new(),
            size: None,
            subaggregations: BTreeMap::new(),
        }
    }

    /// Set the source fields to include.
    pub fn with_include_fields(mut self, fields: Vec<String>) -> Self {
        self.include_fields = fields;
        self
    }

    /// Set the source fields to exclude.
    pub fn with_exclude_fields(mut self, fields: Vec<String>) -> Self {
        self.exclude_fields = fields;
        self
    }

    /// Set the number of hits per bucket.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }
}

/// Terms that are unusually frequent in the matching documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificantTermsAggregation {
    /// Name of the aggregation.
    pub name: String,
    /// The field.
    pub field: String,
    /// Sub-aggregations computed per bucket.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subaggregations: BTreeMap<String, AggregationRequest>,
}

impl SignificantTermsAggregation {
    /// Create a significant terms aggregation.
    pub fn new<N: Into<String>, F: Into<String>>(name: N, field: F) -> Self {
        SignificantTermsAggregation {
            name: name.into(),
            field: field.into(),
            subaggregations: BTreeMap::new(),
        }
    }

    /// Add a sub-aggregation under its own name.
    pub fn add_subaggregation(mut self, aggregation: AggregationRequest) -> Self {
        self.subaggregations
            .insert(aggregation.name().to_string(), aggregation);
        self
    }
}

/// Placeholder that is left out of the compiled request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoOpAggregation {
    /// Name of the aggregation.
    #[serde(default)]
    pub name: String,
}

/// A node of the aggregation tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AggregationRequest {
    Terms(TermsAggregation),
    Max(MaxAggregation),
    SignificantTerms(SignificantTermsAggregation),
    TopHits(TopHitsAggregation),
    NoOp(NoOpAggregation),
}

impl AggregationRequest {
    /// Name under which the result is addressed.
    pub fn name(&self) -> &str {
        match self {
            AggregationRequest::Terms(a) => &a.name,
            AggregationRequest::Max(a) => &a.name,
            AggregationRequest::SignificantTerms(a) => &a.name,
            AggregationRequest::TopHits(a) => &a.name,
            AggregationRequest::NoOp(a) => &a.name,
        }
    }

    /// Sub-aggregations, by name.
    pub fn subaggregations(&self) -> Option<&BTreeMap<String, AggregationRequest>> {
        match self {
            AggregationRequest::Terms(a) => Some(&a.subaggregations),
            AggregationRequest::Max(a) => Some(&a.subaggregations),
            AggregationRequest::SignificantTerms(a) => Some(&a.subaggregations),
            AggregationRequest::TopHits(a) => Some(&a.subaggregations),
            AggregationRequest::NoOp(_) => None,
        }
    }

    /// Look up a direct sub-aggregation by name.
    pub fn subaggregation(&self, name: &str) -> Option<&AggregationRequest> {
        self.subaggregations().and_then(|subs| subs.get(name))
    }
}

impl From<TermsAggregation> for AggregationRequest {
    fn from(aggregation: TermsAggregation) -> Self {
        AggregationRequest::Terms(aggregation)
    }
}

impl From<MaxAggregation> for AggregationRequest {
    fn from(aggregation: MaxAggregation) -> Self {
        AggregationRequest::Max(aggregation)
    }
}

impl From<SignificantTermsAggregation> for AggregationRequest {
    fn from(aggregation: SignificantTermsAggregation) -> Self {
        AggregationRequest::SignificantTerms(aggregation)
    }
}

impl From<TopHitsAggregation> for AggregationRequest {
    fn from(aggregation: TopHitsAggregation) -> Self {
        AggregationRequest::TopHits(aggregation)
    }
}

impl From<NoOpAggregation> for AggregationRequest {
    fn from(aggregation: NoOpAggregation) -> Self {
        AggregationRequest::NoOp(aggregation)
    }
}
