//! Range query implementation for querying within value ranges.
//!
//! Each side of a range accepts an exclusive and an inclusive bound. When
//! both are given for the same side the exclusive bound (`gt` / `lt`) is
//! used and the inclusive one is dropped.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::default_boost;

/// How a range query matches range-typed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RangeRelation {
    /// The field range intersects the query range.
    Intersects,
    /// The field range fully contains the query range.
    Contains,
    /// The field range is fully within the query range.
    Within,
}

impl RangeRelation {
    /// Native name of the relation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeRelation::Intersects => "INTERSECTS",
            RangeRelation::Contains => "CONTAINS",
            RangeRelation::Within => "WITHIN",
        }
    }
}

/// A query that matches documents with field values within a range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    /// The field to search in.
    pub field: String,
    /// Exclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    /// Exclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    /// Date format used to parse the bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Relation for range-typed fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RangeRelation>,
    /// Time zone applied to date bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    /// The boost factor for this query.
    #[serde(default = "default_boost")]
    pub boost: f32,
}

impl RangeQuery {
    /// Create an unbounded range query on a field.
    pub fn new<F: Into<String>>(field: F) -> Self {
        RangeQuery {
            field: field.into(),
            gt: None,
            gte: None,
            lt: None,
            lte: None,
            format: None,
            relation: None,
            time_zone: None,
            boost: 1.0,
        }
    }

    /// Set the exclusive lower bound.
    pub fn greater_than<V: Into<Value>>(mut self, value: V) -> Self {
        self.gt = Some(value.into());
        self
    }

    /// Set the inclusive lower bound.
    pub fn greater_than_or_equal<V: Into<Value>>(mut self, value: V) -> Self {
        self.gte = Some(value.into());
        self
    }

    /// Set the exclusive upper bound.
    pub fn less_than<V: Into<Value>>(mut self, value: V) -> Self {
        self.lt = Some(value.into());
        self
    }

    /// Set the inclusive upper bound.
    pub fn less_than_or_equal<V: Into<Value>>(mut self, value: V) -> Self {
        self.lte = Some(value.into());
        self
    }

    /// Set the inclusive lower bound to a UTC timestamp.
    pub fn since(self, time: DateTime<Utc>) -> Self {
        self.greater_than_or_equal(date_value(time))
    }

    /// Set the exclusive upper bound to a UTC timestamp.
    pub fn before(self, time: DateTime<Utc>) -> Self {
        self.less_than(date_value(time))
    }

    /// Set the date format.
    pub fn with_format<S: Into<String>>(mut self, format: S) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Set the relation.
    pub fn with_relation(mut self, relation: RangeRelation) -> Self {
        self.relation = Some(relation);
        self
    }

    /// Set the time zone.
    pub fn with_time_zone<S: Into<String>>(mut self, time_zone: S) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// The effective lower bound as `(operator, value)`.
    pub fn lower_bound(&self) -> Option<(&'static str, &Value)> {
        match (&self.gt, &self.gte) {
            (Some(value), _) => Some(("gt", value)),
            (None, Some(value)) => Some(("gte", value)),
            (None, None) => None,
        }
    }

    /// The effective upper bound as `(operator, value)`.
    pub fn upper_bound(&self) -> Option<(&'static str, &Value)> {
        match (&self.lt, &self.lte) {
            (Some(value), _) => Some(("lt", value)),
            (None, Some(value)) => Some(("lte", value)),
            (None, None) => None,
        }
    }

    /// Whether an exclusive and an inclusive bound were both given on one side.
    pub fn has_conflicting_bounds(&self) -> bool {
        (self.gt.is_some() && self.gte.is_some()) || (self.lt.is_some() && self.lte.is_some())
    }
}

fn date_value(time: DateTime<Utc>) -> Value {
    Value::String(time.to_rfc3339_opts(SecondsFormat::Millis, true))
}
