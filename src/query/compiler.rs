//! Compilation of query trees into the backend's native JSON query DSL.
//!
//! Compilation is a pure, recursive function of the tree: compiling the same
//! tree twice yields equal JSON. Structural errors are reported as
//! [`ElasticQueryError::InvalidArgument`]; scoring functions that exist in
//! the model but have no native rule yet are reported as
//! [`ElasticQueryError::UnsupportedFeature`].

use log::warn;
use serde_json::{Map, Value, json};

use crate::error::{ElasticQueryError, Result};
use crate::query::boolean::{BoolQuery, DisMaxQuery, Occur};
use crate::query::full_text::{MatchQuery, MultiMatchQuery};
use crate::query::function_score::{ConstantScoreQuery, FunctionScoreQuery, ScoreFunction};
use crate::query::nested::{InnerHits, NestedQuery};
use crate::query::phrase::MatchPhraseQuery;
use crate::query::query_string::{LuceneSyntaxQuery, SimpleQueryStringQuery};
use crate::query::range::RangeQuery;
use crate::query::term::{TermQuery, TermsQuery};
use crate::query::wildcard::WildcardQuery;
use crate::query::{MatchAllQuery, Query};

/// Compile a query tree into a native query object.
pub fn compile_query(query: &Query) -> Result<Value> {
    match query {
        Query::MatchAll(q) => Ok(compile_match_all(q)),
        Query::Match(q) => compile_match(q),
        Query::MultiMatch(q) => compile_multi_match(q),
        Query::MatchPhrase(q) => Ok(compile_match_phrase(q)),
        Query::Term(q) => Ok(compile_term(q)),
        Query::Terms(q) => Ok(compile_terms(q)),
        Query::Wildcard(q) => Ok(compile_wildcard(q)),
        Query::Range(q) => Ok(compile_range(q)),
        Query::SimpleQueryString(q) => compile_simple_query_string(q),
        Query::LuceneSyntax(q) => Ok(compile_lucene_syntax(q)),
        Query::Bool(q) => compile_bool(q),
        Query::DisMax(q) => compile_dis_max(q),
        Query::Nested(q) => compile_nested(q),
        Query::ConstantScore(q) => compile_constant_score(q),
        Query::FunctionScore(q) => compile_function_score(q),
    }
}

/// Insert `boost` unless it is the neutral 1.0.
fn insert_boost(options: &mut Map<String, Value>, boost: f32) {
    if boost != 1.0 {
        options.insert("boost".into(), json!(boost));
    }
}

fn insert_opt<T: serde::Serialize>(options: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        options.insert(key.into(), json!(value));
    }
}

/// Wrap `options` as `{ kind: { field: options } }`.
fn field_query(kind: &str, field: &str, options: Map<String, Value>) -> Value {
    let mut by_field = Map::new();
    by_field.insert(field.to_string(), Value::Object(options));
    let mut root = Map::new();
    root.insert(kind.to_string(), Value::Object(by_field));
    Value::Object(root)
}

fn wrap(kind: &str, options: Map<String, Value>) -> Value {
    let mut root = Map::new();
    root.insert(kind.to_string(), Value::Object(options));
    Value::Object(root)
}

fn compile_match_all(query: &MatchAllQuery) -> Value {
    let mut options = Map::new();
    insert_boost(&mut options, query.boost);
    wrap("match_all", options)
}

fn compile_match(query: &MatchQuery) -> Result<Value> {
    let mut options = Map::new();
    options.insert("query".into(), json!(query.query));
    insert_opt(&mut options, "operator", query.operator.map(|o| o.as_str()));
    insert_opt(&mut options, "analyzer", query.analyzer.as_deref());
    insert_boost(&mut options, query.boost);
    if let Some(minimum) = query.minimum_should_match.as_deref() {
        if !minimum.trim().is_empty() {
            options.insert("minimum_should_match".into(), json!(minimum));
        }
    }
    insert_opt(&mut options, "fuzziness", query.fuzziness.as_deref());
    insert_opt(&mut options, "fuzzy_rewrite", query.fuzzy_rewrite.as_deref());
    insert_opt(&mut options, "fuzzy_transpositions", query.fuzzy_transpositions);
    Ok(field_query("match", &query.field, options))
}

/// Render `field^weight` entries from parallel field and weight lists.
fn weighted_fields(fields: &[String], weights: &[f32], what: &str) -> Result<Vec<String>> {
    if weights.is_empty() {
        return Ok(fields.to_vec());
    }
    if weights.len() != fields.len() {
        return Err(ElasticQueryError::invalid_argument(format!(
            "{what}: {} fields but {} weights were given",
            fields.len(),
            weights.len()
        )));
    }
    Ok(fields
        .iter()
        .zip(weights)
        .map(|(field, weight)| format!("{field}^{weight}"))
        .collect())
}

fn compile_multi_match(query: &MultiMatchQuery) -> Result<Value> {
    let fields = weighted_fields(&query.fields, &query.field_weights, "multi_match")?;
    let mut options = Map::new();
    options.insert("query".into(), json!(query.query));
    options.insert("fields".into(), json!(fields));
    insert_opt(&mut options, "type", query.match_type.map(|t| t.as_str()));
    insert_opt(&mut options, "operator", query.operator.map(|o| o.as_str()));
    insert_opt(&mut options, "analyzer", query.analyzer.as_deref());
    insert_boost(&mut options, query.boost);
    Ok(wrap("multi_match", options))
}

fn compile_match_phrase(query: &MatchPhraseQuery) -> Value {
    let mut options = Map::new();
    options.insert("query".into(), json!(query.phrase));
    options.insert("slop".into(), json!(query.slop));
    insert_opt(&mut options, "analyzer", query.analyzer.as_deref());
    insert_boost(&mut options, query.boost);
    field_query("match_phrase", &query.field, options)
}

fn compile_term(query: &TermQuery) -> Value {
    let mut options = Map::new();
    options.insert("value".into(), query.term.clone());
    insert_boost(&mut options, query.boost);
    field_query("term", &query.field, options)
}

fn compile_terms(query: &TermsQuery) -> Value {
    let mut options = Map::new();
    options.insert(query.field.clone(), Value::Array(query.terms.clone()));
    insert_boost(&mut options, query.boost);
    wrap("terms", options)
}

fn compile_wildcard(query: &WildcardQuery) -> Value {
    let mut options = Map::new();
    options.insert("value".into(), json!(query.query));
    insert_boost(&mut options, query.boost);
    field_query("wildcard", &query.field, options)
}

fn compile_range(query: &RangeQuery) -> Value {
    if query.has_conflicting_bounds() {
        warn!(
            "Range query on '{}' has both an exclusive and an inclusive bound on one side; using the exclusive bound",
            query.field
        );
    }
    let mut options = Map::new();
    if let Some((operator, value)) = query.lower_bound() {
        options.insert(operator.into(), value.clone());
    }
    if let Some((operator, value)) = query.upper_bound() {
        options.insert(operator.into(), value.clone());
    }
    insert_opt(&mut options, "format", query.format.as_deref());
    insert_opt(&mut options, "relation", query.relation.map(|r| r.as_str()));
    insert_opt(&mut options, "time_zone", query.time_zone.as_deref());
    insert_boost(&mut options, query.boost);
    field_query("range", &query.field, options)
}

fn compile_simple_query_string(query: &SimpleQueryStringQuery) -> Result<Value> {
    let fields = weighted_fields(&query.fields, &query.field_boosts, "simple_query_string")?;
    let mut options = Map::new();
    options.insert("query".into(), json!(query.query));
    if !fields.is_empty() {
        options.insert("fields".into(), json!(fields));
    }
    insert_opt(&mut options, "default_operator", query.default_operator.map(|o| o.as_str()));
    insert_opt(&mut options, "analyzer", query.analyzer.as_deref());
    insert_opt(&mut options, "flags", query.flags_string());
    insert_opt(&mut options, "analyze_wildcard", query.analyze_wildcard);
    insert_opt(&mut options, "lenient", query.lenient);
    insert_opt(&mut options, "minimum_should_match", query.minimum_should_match.as_deref());
    insert_opt(&mut options, "quote_field_suffix", query.quote_field_suffix.as_deref());
    insert_boost(&mut options, query.boost);
    Ok(wrap("simple_query_string", options))
}

fn compile_lucene_syntax(query: &LuceneSyntaxQuery) -> Value {
    let mut options = Map::new();
    options.insert("query".into(), json!(query.query));
    insert_opt(&mut options, "default_field", query.default_field.as_deref());
    insert_opt(&mut options, "analyzer", query.analyzer.as_deref());
    insert_boost(&mut options, query.boost);
    wrap("query_string", options)
}

fn compile_bool(query: &BoolQuery) -> Result<Value> {
    query.validate()?;

    let mut by_occur: Vec<(Occur, Vec<Value>)> = Vec::new();
    for clause in query.clauses() {
        let compiled = clause
            .queries
            .iter()
            .map(compile_query)
            .collect::<Result<Vec<_>>>()?;
        match by_occur.iter_mut().find(|(occur, _)| *occur == clause.occur) {
            Some((_, queries)) => queries.extend(compiled),
            None => by_occur.push((clause.occur, compiled)),
        }
    }

    let mut options = Map::new();
    for (occur, queries) in by_occur {
        options.insert(occur.as_str().into(), Value::Array(queries));
    }
    insert_opt(&mut options, "minimum_should_match", query.minimum_should_match());
    insert_boost(&mut options, query.boost());
    Ok(wrap("bool", options))
}

fn compile_dis_max(query: &DisMaxQuery) -> Result<Value> {
    if query.queries.is_empty() {
        return Err(ElasticQueryError::invalid_argument(
            "Dis-max query must have at least one query",
        ));
    }
    let queries = query
        .queries
        .iter()
        .map(compile_query)
        .collect::<Result<Vec<_>>>()?;
    let mut options = Map::new();
    options.insert("queries".into(), Value::Array(queries));
    insert_opt(&mut options, "tie_breaker", query.tie_breaker);
    insert_boost(&mut options, query.boost);
    Ok(wrap("dis_max", options))
}

fn compile_nested(query: &NestedQuery) -> Result<Value> {
    let mut options = Map::new();
    options.insert("path".into(), json!(query.path));
    options.insert("query".into(), compile_query(&query.query)?);
    options.insert("score_mode".into(), json!(query.score_mode.as_str()));
    insert_boost(&mut options, query.boost);
    if let Some(inner_hits) = &query.inner_hits {
        options.insert("ignore_unmapped".into(), json!(true));
        options.insert("inner_hits".into(), compile_inner_hits(inner_hits)?);
    }
    Ok(wrap("nested", options))
}

fn compile_inner_hits(inner_hits: &InnerHits) -> Result<Value> {
    let mut options = Map::new();
    options.insert("_source".into(), json!(inner_hits.fetch_source));
    if !inner_hits.stored_fields.is_empty() {
        options.insert("stored_fields".into(), json!(inner_hits.stored_fields));
    }
    if let Some(highlight) = &inner_hits.highlight {
        options.insert("highlight".into(), highlight.compile(None)?);
    }
    options.insert("explain".into(), json!(inner_hits.explain));
    insert_opt(&mut options, "size", inner_hits.size);
    Ok(Value::Object(options))
}

fn compile_constant_score(query: &ConstantScoreQuery) -> Result<Value> {
    Ok(json!({
        "constant_score": {
            "filter": compile_query(&query.query)?,
            "boost": query.boost
        }
    }))
}

fn compile_function_score(query: &FunctionScoreQuery) -> Result<Value> {
    let scored = query.query.as_deref().ok_or_else(|| {
        ElasticQueryError::invalid_argument("Function score query has no query to score")
    })?;
    let function = query.function.as_ref().ok_or_else(|| {
        ElasticQueryError::invalid_argument("Function score query has no scoring function")
    })?;
    if !query.functions.is_empty() {
        return Err(ElasticQueryError::unsupported_feature(
            "function score queries with a list of functions",
        ));
    }

    let factor = match function {
        ScoreFunction::FieldValueFactor(factor) => factor,
        other => {
            return Err(ElasticQueryError::unsupported_feature(format!(
                "function score function '{}'",
                other.name()
            )));
        }
    };

    let mut options = Map::new();
    options.insert("query".into(), compile_query(scored)?);
    options.insert(
        "field_value_factor".into(),
        json!({
            "field": factor.field,
            "factor": factor.factor,
            "modifier": factor.modifier.as_str(),
            "missing": factor.missing
        }),
    );
    options.insert("boost_mode".into(), json!(query.boost_mode.as_str()));
    insert_opt(&mut options, "score_mode", query.score_mode.map(|m| m.as_str()));
    insert_boost(&mut options, query.boost);
    Ok(wrap("function_score", options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::*;
    use crate::request::highlight::{HighlightCommand, HighlightField};

    #[test]
    fn test_match_all() {
        assert_eq!(compile_query(&MatchAllQuery::new().into()).unwrap(), json!({"match_all": {}}));
        assert_eq!(
            compile_query(&MatchAllQuery::new().with_boost(2.0).into()).unwrap(),
            json!({"match_all": {"boost": 2.0}})
        );
    }

    #[test]
    fn test_match() {
        let query = MatchQuery::new("title", "rust search")
            .with_operator("AND".parse().unwrap())
            .with_analyzer("english")
            .with_minimum_should_match("  ")
            .with_boost(1.5);
        assert_eq!(
            compile_query(&query.into()).unwrap(),
            json!({"match": {"title": {
                "query": "rust search",
                "operator": "and",
                "analyzer": "english",
                "boost": 1.5
            }}})
        );
    }

    #[test]
    fn test_multi_match_weights() {
        let query = MultiMatchQuery::new("rust", ["title", "body"])
            .with_field_weights(vec![2.0, 0.5])
            .with_type(MultiMatchType::BestFields);
        assert_eq!(
            compile_query(&query.into()).unwrap(),
            json!({"multi_match": {
                "query": "rust",
                "fields": ["title^2", "body^0.5"],
                "type": "best_fields"
            }})
        );
    }

    #[test]
    fn test_multi_match_mismatched_weights() {
        let query = MultiMatchQuery::new("rust", ["title", "body"]).with_field_weights(vec![2.0]);
        assert!(matches!(
            compile_query(&query.into()),
            Err(ElasticQueryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_phrase_term_terms_wildcard() {
        assert_eq!(
            compile_query(&MatchPhraseQuery::new("body", "full text").with_slop(2).into()).unwrap(),
            json!({"match_phrase": {"body": {"query": "full text", "slop": 2}}})
        );
        assert_eq!(
            compile_query(&TermQuery::new("year", 2024).with_boost(3.0).into()).unwrap(),
            json!({"term": {"year": {"value": 2024, "boost": 3.0}}})
        );
        assert_eq!(
            compile_query(&TermsQuery::new("tag", ["a", "b"]).into()).unwrap(),
            json!({"terms": {"tag": ["a", "b"]}})
        );
        assert_eq!(
            compile_query(&WildcardQuery::new("name", "ru*").into()).unwrap(),
            json!({"wildcard": {"name": {"value": "ru*"}}})
        );
    }

    #[test]
    fn test_range() {
        let query = RangeQuery::new("date")
            .greater_than_or_equal("2020-01-01")
            .less_than_or_equal("2020-12-31")
            .with_format("yyyy-MM-dd")
            .with_relation(RangeRelation::Within)
            .with_time_zone("+01:00");
        assert_eq!(
            compile_query(&query.into()).unwrap(),
            json!({"range": {"date": {
                "gte": "2020-01-01",
                "lte": "2020-12-31",
                "format": "yyyy-MM-dd",
                "relation": "WITHIN",
                "time_zone": "+01:00"
            }}})
        );
    }

    #[test]
    fn test_range_exclusive_precedence() {
        let query = RangeQuery::new("n").greater_than(1).greater_than_or_equal(0).less_than(9).less_than_or_equal(10);
        assert_eq!(
            compile_query(&query.into()).unwrap(),
            json!({"range": {"n": {"gt": 1, "lt": 9}}})
        );
    }

    #[test]
    fn test_simple_query_string() {
        let query = SimpleQueryStringQuery::new("rust +search", ["title", "body"])
            .with_field_boosts(vec![3.0, 1.0])
            .with_default_operator(Operator::And)
            .with_flags(vec![SimpleQueryStringFlag::Phrase, SimpleQueryStringFlag::Prefix]);
        assert_eq!(
            compile_query(&query.into()).unwrap(),
            json!({"simple_query_string": {
                "query": "rust +search",
                "fields": ["title^3", "body^1"],
                "default_operator": "and",
                "flags": "PHRASE|PREFIX"
            }})
        );

        let query = SimpleQueryStringQuery::new("rust", ["title", "body"]).with_field_boosts(vec![1.0]);
        assert!(compile_query(&query.into()).is_err());
    }

    #[test]
    fn test_lucene_syntax() {
        let query = LuceneSyntaxQuery::new("title:rust AND body:search").with_default_field("body");
        assert_eq!(
            compile_query(&query.into()).unwrap(),
            json!({"query_string": {"query": "title:rust AND body:search", "default_field": "body"}})
        );
    }

    #[test]
    fn test_bool() {
        let query = BoolQuery::new(vec![
            BoolClause::must(TermQuery::new("a", 1).into()),
            BoolClause::new(
                Occur::Should,
                vec![TermQuery::new("b", 2).into(), TermQuery::new("c", 3).into()],
            )
            .unwrap(),
            BoolClause::must_not(TermQuery::new("d", 4).into()),
            BoolClause::filter(TermQuery::new("e", 5).into()),
            BoolClause::must(TermQuery::new("f", 6).into()),
        ])
        .unwrap()
        .with_minimum_should_match("1")
        .with_boost(2.0);

        assert_eq!(
            compile_query(&query.into()).unwrap(),
            json!({"bool": {
                "must": [{"term": {"a": {"value": 1}}}, {"term": {"f": {"value": 6}}}],
                "should": [{"term": {"b": {"value": 2}}}, {"term": {"c": {"value": 3}}}],
                "must_not": [{"term": {"d": {"value": 4}}}],
                "filter": [{"term": {"e": {"value": 5}}}],
                "minimum_should_match": "1",
                "boost": 2.0
            }})
        );
    }

    #[test]
    fn test_deserialized_empty_bool_fails() {
        let query = Query::from_json(json!({"type": "bool", "clauses": []})).unwrap();
        assert!(matches!(compile_query(&query), Err(ElasticQueryError::InvalidArgument(_))));

        let query = Query::from_json(json!({
            "type": "bool",
            "clauses": [{"occur": "filter", "queries": []}]
        }))
        .unwrap();
        assert!(matches!(compile_query(&query), Err(ElasticQueryError::InvalidArgument(_))));
    }

    #[test]
    fn test_dis_max() {
        let query = DisMaxQuery::new(vec![TermQuery::new("a", 1).into()]).with_tie_breaker(0.5);
        assert_eq!(
            compile_query(&query.into()).unwrap(),
            json!({"dis_max": {"queries": [{"term": {"a": {"value": 1}}}], "tie_breaker": 0.5}})
        );
        assert!(compile_query(&DisMaxQuery::new(Vec::new()).into()).is_err());
    }

    #[test]
    fn test_nested_with_inner_hits() {
        let query = NestedQuery::new("comments", MatchQuery::new("comments.text", "great").into())
            .with_score_mode(NestedScoreMode::Max)
            .with_inner_hits(
                InnerHits::new()
                    .with_stored_fields(vec!["comments.author".into()])
                    .with_highlight(
                        HighlightCommand::new()
                            .add_field(HighlightField::new("comments.text").with_fragments(1, 40)),
                    )
                    .with_size(3),
            );
        assert_eq!(
            compile_query(&query.into()).unwrap(),
            json!({"nested": {
                "path": "comments",
                "query": {"match": {"comments.text": {"query": "great"}}},
                "score_mode": "max",
                "ignore_unmapped": true,
                "inner_hits": {
                    "_source": false,
                    "stored_fields": ["comments.author"],
                    "highlight": {"fields": {"comments.text": {"fragment_size": 40, "number_of_fragments": 1}}},
                    "explain": false,
                    "size": 3
                }
            }})
        );
    }

    #[test]
    fn test_constant_score() {
        let query = ConstantScoreQuery::new(TermQuery::new("a", "b").into());
        assert_eq!(
            compile_query(&query.into()).unwrap(),
            json!({"constant_score": {"filter": {"term": {"a": {"value": "b"}}}, "boost": 1.0}})
        );
    }

    #[test]
    fn test_function_score() {
        let query = FunctionScoreQuery::field_value_factor(
            MatchAllQuery::new().into(),
            FieldValueFactor::new("popularity")
                .with_factor(1.5)
                .with_modifier(FieldValueFactorModifier::Log1p),
        )
        .with_boost_mode(BoostMode::Sum);
        assert_eq!(
            compile_query(&query.into()).unwrap(),
            json!({"function_score": {
                "query": {"match_all": {}},
                "field_value_factor": {"field": "popularity", "factor": 1.5, "modifier": "log1p", "missing": 1.0},
                "boost_mode": "sum"
            }})
        );
    }

    #[test]
    fn test_function_score_errors() {
        let mut query = FunctionScoreQuery::field_value_factor(
            MatchAllQuery::new().into(),
            FieldValueFactor::new("popularity"),
        );
        query.query = None;
        assert!(matches!(
            compile_query(&query.into()),
            Err(ElasticQueryError::InvalidArgument(_))
        ));

        let query = FunctionScoreQuery::new(
            MatchAllQuery::new().into(),
            ScoreFunction::ScriptScore {
                source: "doc['likes'].value".into(),
            },
        );
        assert!(matches!(
            compile_query(&query.into()),
            Err(ElasticQueryError::UnsupportedFeature(_))
        ));

        let mut query = FunctionScoreQuery::field_value_factor(
            MatchAllQuery::new().into(),
            FieldValueFactor::new("popularity"),
        );
        query.functions.push(ScoreFunction::Weight { weight: 2.0 });
        assert!(matches!(
            compile_query(&query.into()),
            Err(ElasticQueryError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_deterministic() {
        let query: Query = BoolQuery::new(vec![BoolClause::should(
            NestedQuery::new("n", RangeQuery::new("n.v").greater_than(3).into()).into(),
        )])
        .unwrap()
        .into();
        assert_eq!(compile_query(&query).unwrap(), compile_query(&query).unwrap());
    }
}
