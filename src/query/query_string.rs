//! Queries written in a query-string syntax.

use serde::{Deserialize, Serialize};

use crate::query::default_boost;
use crate::query::full_text::Operator;

/// Syntax features enabled for a simple query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimpleQueryStringFlag {
    All,
    None,
    And,
    Not,
    Or,
    Prefix,
    Phrase,
    Precedence,
    Escape,
    Whitespace,
    Fuzzy,
    Near,
    Slop,
}

impl SimpleQueryStringFlag {
    /// Native name of the flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            SimpleQueryStringFlag::All => "ALL",
            SimpleQueryStringFlag::None => "NONE",
            SimpleQueryStringFlag::And => "AND",
            SimpleQueryStringFlag::Not => "NOT",
            SimpleQueryStringFlag::Or => "OR",
            SimpleQueryStringFlag::Prefix => "PREFIX",
            SimpleQueryStringFlag::Phrase => "PHRASE",
            SimpleQueryStringFlag::Precedence => "PRECEDENCE",
            SimpleQueryStringFlag::Escape => "ESCAPE",
            SimpleQueryStringFlag::Whitespace => "WHITESPACE",
            SimpleQueryStringFlag::Fuzzy => "FUZZY",
            SimpleQueryStringFlag::Near => "NEAR",
            SimpleQueryStringFlag::Slop => "SLOP",
        }
    }
}

/// A query in the forgiving simple query string syntax.
///
/// `field_boosts` is parallel to `fields`. An empty list means no boosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleQueryStringQuery {
    /// The query text.
    pub query: String,
    /// The fields to search in.
    #[serde(default)]
    pub fields: Vec<String>,
    /// Per-field boosts, parallel to `fields`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_boosts: Vec<f32>,
    /// Operator used when none is written in the query text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_operator: Option<Operator>,
    /// Analyzer applied to the query text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    /// Enabled syntax features.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<SimpleQueryStringFlag>,
    /// Whether wildcard terms are analyzed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze_wildcard: Option<bool>,
    /// Whether format-based failures are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lenient: Option<bool>,
    /// Minimum number of clauses that should match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<String>,
    /// Suffix appended to fields for quoted text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_field_suffix: Option<String>,
    /// The boost factor for this query.
    #[serde(default = "default_boost")]
    pub boost: f32,
}

impl SimpleQueryStringQuery {
    /// Create a new simple query string query.
    pub fn new<Q, I, F>(query: Q, fields: I) -> Self
    where
        Q: Into<String>,
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        SimpleQueryStringQuery {
            query: query.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            field_boosts: Vec::new(),
            default_operator: None,
            analyzer: None,
            flags: Vec::new(),
            analyze_wildcard: None,
            lenient: None,
            minimum_should_match: None,
            quote_field_suffix: None,
            boost: 1.0,
        }
    }

    /// Set the per-field boosts.
    pub fn with_field_boosts(mut self, boosts: Vec<f32>) -> Self {
        self.field_boosts = boosts;
        self
    }

    /// Set the default operator.
    pub fn with_default_operator(mut self, operator: Operator) -> Self {
        self.default_operator = Some(operator);
        self
    }

    /// Set the enabled syntax features.
    pub fn with_flags(mut self, flags: Vec<SimpleQueryStringFlag>) -> Self {
        self.flags = flags;
        self
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Native `flags` string, `None` when no flag is set.
    pub fn flags_string(&self) -> Option<String> {
        if self.flags.is_empty() {
            return None;
        }
        let names: Vec<&str> = self.flags.iter().map(|flag| flag.as_str()).collect();
        Some(names.join("|"))
    }
}

/// A query in the full Lucene query syntax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuceneSyntaxQuery {
    /// The query text.
    pub query: String,
    /// Field used for terms without an explicit field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_field: Option<String>,
    /// Analyzer applied to the query text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    /// The boost factor for this query.
    #[serde(default = "default_boost")]
    pub boost: f32,
}

impl LuceneSyntaxQuery {
    /// Create a new Lucene syntax query.
    pub fn new<Q: Into<String>>(query: Q) -> Self {
        LuceneSyntaxQuery {
            query: query.into(),
            default_field: None,
            analyzer: None,
            boost: 1.0,
        }
    }

    /// Set the default field.
    pub fn with_default_field<S: Into<String>>(mut self, field: S) -> Self {
        self.default_field = Some(field.into());
        self
    }

    /// Set the analyzer.
    pub fn with_analyzer<S: Into<String>>(mut self, analyzer: S) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }
}
