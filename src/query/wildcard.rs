//! Wildcard query implementation.

use serde::{Deserialize, Serialize};

use crate::query::default_boost;

/// A query that matches terms against a pattern with `*` and `?` wildcards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WildcardQuery {
    /// The field to search in.
    pub field: String,
    /// The wildcard pattern.
    pub query: String,
    /// The boost factor for this query.
    #[serde(default = "default_boost")]
    pub boost: f32,
}

impl WildcardQuery {
    /// Create a new wildcard query.
    pub fn new<F: Into<String>, P: Into<String>>(field: F, pattern: P) -> Self {
        WildcardQuery {
            field: field.into(),
            query: pattern.into(),
            boost: 1.0,
        }
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}
