//! Exact-value queries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::default_boost;

/// A query that matches documents containing an exact term in a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    /// The field to search in.
    pub field: String,
    /// The exact value to match (string, number or boolean).
    pub term: Value,
    /// The boost factor for this query.
    #[serde(default = "default_boost")]
    pub boost: f32,
}

impl TermQuery {
    /// Create a new term query.
    pub fn new<F, T>(field: F, term: T) -> Self
    where
        F: Into<String>,
        T: Into<Value>,
    {
        TermQuery {
            field: field.into(),
            term: term.into(),
            boost: 1.0,
        }
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

/// A query that matches documents containing any of several exact terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsQuery {
    /// The field to search in.
    pub field: String,
    /// Values of which at least one must match.
    pub terms: Vec<Value>,
    /// The boost factor for this query.
    #[serde(default = "default_boost")]
    pub boost: f32,
}

impl TermsQuery {
    /// Create a new terms query.
    pub fn new<F, I, T>(field: F, terms: I) -> Self
    where
        F: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        TermsQuery {
            field: field.into(),
            terms: terms.into_iter().map(Into::into).collect(),
            boost: 1.0,
        }
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_term_query_values() {
        let query = TermQuery::new("year", 2024);
        assert_eq!(query.term, json!(2024));
        assert_eq!(query.boost, 1.0);

        let query = TermQuery::new("published", true).with_boost(3.0);
        assert_eq!(query.term, json!(true));
        assert_eq!(query.boost, 3.0);
    }

    #[test]
    fn test_terms_query_values() {
        let query = TermsQuery::new("tags", ["rust", "search"]);
        assert_eq!(query.terms, vec![json!("rust"), json!("search")]);
    }
}
