//! Backend-agnostic query model.
//!
//! A [`Query`] is a tree: composite variants ([`BoolQuery`], [`NestedQuery`],
//! [`ConstantScoreQuery`], [`FunctionScoreQuery`], [`DisMaxQuery`]) own their
//! children exclusively. Every variant carries a `boost`; a boost of `1.0`
//! is treated as "no boost" and left out of the compiled form.
//!
//! Queries are compiled into the backend's native JSON DSL by
//! [`compiler::compile_query`].
//!
//! # Examples
//!
//! ```
//! use elastic_query::query::{BoolClause, BoolQuery, Occur, Query, TermQuery};
//!
//! let query: Query = BoolQuery::new(vec![
//!     BoolClause::must(TermQuery::new("category", "books").into()),
//!     BoolClause::new(Occur::Filter, vec![TermQuery::new("available", true).into()]).unwrap(),
//! ])
//! .unwrap()
//! .into();
//!
//! let native = query.compile().unwrap();
//! assert!(native["bool"]["must"].is_array());
//! ```

pub mod boolean;
pub mod compiler;
pub mod full_text;
pub mod function_score;
pub mod nested;
pub mod phrase;
pub mod query_string;
pub mod range;
pub mod term;
pub mod wildcard;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ElasticQueryError, Result};

pub use boolean::{BoolClause, BoolQuery, DisMaxQuery, Occur};
pub use full_text::{MatchQuery, MultiMatchQuery, MultiMatchType, Operator};
pub use function_score::{
    BoostMode, ConstantScoreQuery, FieldValueFactor, FieldValueFactorModifier,
    FunctionScoreMode, FunctionScoreQuery, ScoreFunction,
};
pub use nested::{InnerHits, NestedQuery, NestedScoreMode};
pub use phrase::MatchPhraseQuery;
pub use query_string::{LuceneSyntaxQuery, SimpleQueryStringFlag, SimpleQueryStringQuery};
pub use range::{RangeQuery, RangeRelation};
pub use term::{TermQuery, TermsQuery};
pub use wildcard::WildcardQuery;

/// Default boost of every query variant.
pub(crate) fn default_boost() -> f32 {
    1.0
}

/// A node of the query tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    /// Matches every document.
    MatchAll(MatchAllQuery),
    /// Analyzed full-text match on one field.
    Match(MatchQuery),
    /// Analyzed full-text match over several (optionally weighted) fields.
    MultiMatch(MultiMatchQuery),
    /// Phrase match with optional slop.
    MatchPhrase(MatchPhraseQuery),
    /// Exact value on one field.
    Term(TermQuery),
    /// Any of several exact values on one field.
    Terms(TermsQuery),
    /// Wildcard pattern on one field.
    Wildcard(WildcardQuery),
    /// Range of values on one field.
    Range(RangeQuery),
    /// Simple query string syntax over a list of fields.
    SimpleQueryString(SimpleQueryStringQuery),
    /// Full Lucene query syntax.
    LuceneSyntax(LuceneSyntaxQuery),
    /// Boolean combination of clauses.
    Bool(BoolQuery),
    /// Disjunction taking the best scoring child.
    DisMax(DisMaxQuery),
    /// Query on nested objects.
    Nested(NestedQuery),
    /// Wraps a filter and assigns a constant score.
    ConstantScore(ConstantScoreQuery),
    /// Modifies the score of a child query with a function.
    FunctionScore(FunctionScoreQuery),
}

impl Query {
    /// Type tags accepted when a query is loaded from JSON.
    pub const TYPE_NAMES: &'static [&'static str] = &[
        "match_all",
        "match",
        "multi_match",
        "match_phrase",
        "term",
        "terms",
        "wildcard",
        "range",
        "simple_query_string",
        "lucene_syntax",
        "bool",
        "dis_max",
        "nested",
        "constant_score",
        "function_score",
    ];

    /// Get the type tag of this query.
    pub fn type_name(&self) -> &'static str {
        match self {
            Query::MatchAll(_) => "match_all",
            Query::Match(_) => "match",
            Query::MultiMatch(_) => "multi_match",
            Query::MatchPhrase(_) => "match_phrase",
            Query::Term(_) => "term",
            Query::Terms(_) => "terms",
            Query::Wildcard(_) => "wildcard",
            Query::Range(_) => "range",
            Query::SimpleQueryString(_) => "simple_query_string",
            Query::LuceneSyntax(_) => "lucene_syntax",
            Query::Bool(_) => "bool",
            Query::DisMax(_) => "dis_max",
            Query::Nested(_) => "nested",
            Query::ConstantScore(_) => "constant_score",
            Query::FunctionScore(_) => "function_score",
        }
    }

    /// Get the boost of this query.
    pub fn boost(&self) -> f32 {
        match self {
            Query::MatchAll(q) => q.boost,
            Query::Match(q) => q.boost,
            Query::MultiMatch(q) => q.boost,
            Query::MatchPhrase(q) => q.boost,
            Query::Term(q) => q.boost,
            Query::Terms(q) => q.boost,
            Query::Wildcard(q) => q.boost,
            Query::Range(q) => q.boost,
            Query::SimpleQueryString(q) => q.boost,
            Query::LuceneSyntax(q) => q.boost,
            Query::Bool(q) => q.boost(),
            Query::DisMax(q) => q.boost,
            Query::Nested(q) => q.boost,
            Query::ConstantScore(q) => q.boost,
            Query::FunctionScore(q) => q.boost,
        }
    }

    /// Compile this query into the backend's native JSON representation.
    pub fn compile(&self) -> Result<Value> {
        compiler::compile_query(self)
    }

    /// Load a query tree from its JSON document form.
    ///
    /// Unknown `type` tags anywhere in the tree are reported as
    /// [`ElasticQueryError::UnsupportedQueryType`].
    pub fn from_json(value: Value) -> Result<Query> {
        if let Some(unknown) = find_unknown_type(&value) {
            return Err(ElasticQueryError::unsupported_query_type(unknown));
        }
        Ok(serde_json::from_value(value)?)
    }
}

fn find_unknown_type(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(tag)) = map.get("type") {
                if !Query::TYPE_NAMES.contains(&tag.as_str()) {
                    return Some(tag.clone());
                }
            }
            map.values().find_map(find_unknown_type)
        }
        Value::Array(items) => items.iter().find_map(find_unknown_type),
        _ => None,
    }
}

/// A query that matches all documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchAllQuery {
    /// The boost factor for this query.
    #[serde(default = "default_boost")]
    pub boost: f32,
}

impl MatchAllQuery {
    /// Create a new match-all query.
    pub fn new() -> Self {
        MatchAllQuery { boost: 1.0 }
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

impl Default for MatchAllQuery {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! impl_into_query {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Query {
                fn from(query: $ty) -> Self {
                    Query::$variant(query)
                }
            }
        )*
    };
}

impl_into_query! {
    MatchAllQuery => MatchAll,
    MatchQuery => Match,
    MultiMatchQuery => MultiMatch,
    MatchPhraseQuery => MatchPhrase,
    TermQuery => Term,
    TermsQuery => Terms,
    WildcardQuery => Wildcard,
    RangeQuery => Range,
    SimpleQueryStringQuery => SimpleQueryString,
    LuceneSyntaxQuery => LuceneSyntax,
    BoolQuery => Bool,
    DisMaxQuery => DisMax,
    NestedQuery => Nested,
    ConstantScoreQuery => ConstantScore,
    FunctionScoreQuery => FunctionScore,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_names_cover_variants() {
        let queries: Vec<Query> = vec![
            MatchAllQuery::new().into(),
            TermQuery::new("f", "v").into(),
            WildcardQuery::new("f", "v*").into(),
        ];
        for query in queries {
            assert!(Query::TYPE_NAMES.contains(&query.type_name()));
        }
    }

    #[test]
    fn test_boost_accessor() {
        let query: Query = TermQuery::new("title", "rust").with_boost(2.5).into();
        assert_eq!(query.boost(), 2.5);
        let query: Query = MatchAllQuery::new().into();
        assert_eq!(query.boost(), 1.0);
    }

    #[test]
    fn test_from_json() {
        let query = Query::from_json(json!({
            "type": "term",
            "field": "status",
            "term": "active"
        }))
        .unwrap();
        assert_eq!(query, TermQuery::new("status", "active").into());
    }

    #[test]
    fn test_from_json_unknown_type() {
        let result = Query::from_json(json!({
            "type": "bool",
            "clauses": [{"occur": "must", "queries": [{"type": "geo_shape", "field": "loc"}]}]
        }));
        match result {
            Err(ElasticQueryError::UnsupportedQueryType(name)) => assert_eq!(name, "geo_shape"),
            other => panic!("Expected unsupported query type, got {other:?}"),
        }
    }
}
