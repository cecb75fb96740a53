//! Analyzed full-text queries over one or several fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ElasticQueryError;
use crate::query::default_boost;

/// How the terms of an analyzed query text are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operator {
    /// Every term must match.
    And,
    /// At least one term must match.
    Or,
}

impl Operator {
    /// Native name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
        }
    }
}

impl FromStr for Operator {
    type Err = ElasticQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(Operator::And),
            "or" => Ok(Operator::Or),
            _ => Err(ElasticQueryError::invalid_argument(format!(
                "Unknown operator '{s}', expected AND or OR"
            ))),
        }
    }
}

impl TryFrom<String> for Operator {
    type Error = ElasticQueryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Operator> for String {
    fn from(operator: Operator) -> Self {
        operator.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query that analyzes its text and matches it against a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchQuery {
    /// The field to search in.
    pub field: String,
    /// The query text.
    pub query: String,
    /// Operator combining the analyzed terms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    /// Analyzer applied to the query text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    /// Minimum number of terms that should match (e.g. `"75%"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<String>,
    /// Fuzziness (e.g. `"AUTO"` or `"2"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzziness: Option<String>,
    /// Rewrite method for fuzzy terms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzzy_rewrite: Option<String>,
    /// Whether transpositions count as a single edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzzy_transpositions: Option<bool>,
    /// The boost factor for this query.
    #[serde(default = "default_boost")]
    pub boost: f32,
}

impl MatchQuery {
    /// Create a new match query.
    pub fn new<F: Into<String>, Q: Into<String>>(field: F, query: Q) -> Self {
        MatchQuery {
            field: field.into(),
            query: query.into(),
            operator: None,
            analyzer: None,
            minimum_should_match: None,
            fuzziness: None,
            fuzzy_rewrite: None,
            fuzzy_transpositions: None,
            boost: 1.0,
        }
    }

    /// Set the operator.
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    /// Set the analyzer.
    pub fn with_analyzer<S: Into<String>>(mut self, analyzer: S) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    /// Set the minimum number of terms that should match.
    pub fn with_minimum_should_match<S: Into<String>>(mut self, minimum: S) -> Self {
        self.minimum_should_match = Some(minimum.into());
        self
    }

    /// Set the fuzziness.
    pub fn with_fuzziness<S: Into<String>>(mut self, fuzziness: S) -> Self {
        self.fuzziness = Some(fuzziness.into());
        self
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

/// Scoring strategy of a multi-field match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiMatchType {
    /// Score of the best matching field.
    BestFields,
    /// Sum of the scores of all matching fields.
    MostFields,
    /// Treat the fields as one big field.
    CrossFields,
    /// Phrase match on every field.
    Phrase,
    /// Phrase-prefix match on every field.
    PhrasePrefix,
}

impl MultiMatchType {
    /// Native name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MultiMatchType::BestFields => "best_fields",
            MultiMatchType::MostFields => "most_fields",
            MultiMatchType::CrossFields => "cross_fields",
            MultiMatchType::Phrase => "phrase",
            MultiMatchType::PhrasePrefix => "phrase_prefix",
        }
    }
}

/// A match query over several fields, each optionally weighted.
///
/// `field_weights` is parallel to `fields`; leave it empty for unweighted
/// fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiMatchQuery {
    /// The query text.
    pub query: String,
    /// The fields to search in.
    pub fields: Vec<String>,
    /// Per-field weights, parallel to `fields`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_weights: Vec<f32>,
    /// Scoring strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MultiMatchType>,
    /// Operator combining the analyzed terms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    /// Analyzer applied to the query text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    /// The boost factor for this query.
    #[serde(default = "default_boost")]
    pub boost: f32,
}

impl MultiMatchQuery {
    /// Create a new multi-match query over unweighted fields.
    pub fn new<Q, I, F>(query: Q, fields: I) -> Self
    where
        Q: Into<String>,
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        MultiMatchQuery {
            query: query.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            field_weights: Vec::new(),
            match_type: None,
            operator: None,
            analyzer: None,
            boost: 1.0,
        }
    }

    /// Set the per-field weights.
    pub fn with_field_weights(mut self, weights: Vec<f32>) -> Self {
        self.field_weights = weights;
        self
    }

    /// Set the scoring strategy.
    pub fn with_type(mut self, match_type: MultiMatchType) -> Self {
        self.match_type = Some(match_type);
        self
    }

    /// Set the operator.
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    /// Set the analyzer.
    pub fn with_analyzer<S: Into<String>>(mut self, analyzer: S) -> Self {
        self.analyzer = Some(analyzer.into());
        self
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
    fn test_operator_case_insensitive() {
        assert_eq!("AND".parse::<Operator>().unwrap(), Operator::And);
        assert_eq!("Or".parse::<Operator>().unwrap(), Operator::Or);
        assert!("xor".parse::<Operator>().is_err());
    }

    #[test]
    fn test_operator_serde() {
        let operator: Operator = serde_json::from_value(json!("AND")).unwrap();
        assert_eq!(operator, Operator::And);
        assert_eq!(serde_json::to_value(Operator::Or).unwrap(), json!("or"));
    }

    #[test]
    fn test_multi_match_builder() {
        let query = MultiMatchQuery::new("rust search", ["title", "body"])
            .with_field_weights(vec![2.0, 1.0])
            .with_type(MultiMatchType::CrossFields);
        assert_eq!(query.fields, vec!["title", "body"]);
        assert_eq!(query.match_type.map(|t| t.as_str()), Some("cross_fields"));
    }
}
