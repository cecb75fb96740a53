//! Boolean query implementation for combining multiple queries.

use serde::{Deserialize, Serialize};

use crate::error::{ElasticQueryError, Result};
use crate::query::{Query, default_boost};

/// Occurrence requirements for boolean clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occur {
    /// The clause must match and contributes to the score.
    Must,
    /// The clause should match.
    Should,
    /// The clause must not match.
    MustNot,
    /// The clause must match but does not contribute to the score.
    Filter,
}

impl Occur {
    /// Native key of the occurrence inside a bool query.
    pub fn as_str(&self) -> &'static str {
        match self {
            Occur::Must => "must",
            Occur::Should => "should",
            Occur::MustNot => "must_not",
            Occur::Filter => "filter",
        }
    }
}

/// A clause in a boolean query: one occurrence applied to one or more queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolClause {
    /// The occurrence requirement.
    pub occur: Occur,
    /// The queries of this clause, never empty once validated.
    pub queries: Vec<Query>,
}

impl BoolClause {
    /// Create a new clause. Fails when `queries` is empty.
    pub fn new(occur: Occur, queries: Vec<Query>) -> Result<Self> {
        let clause = BoolClause { occur, queries };
        clause.validate()?;
        Ok(clause)
    }

    /// Create a MUST clause with a single query.
    pub fn must(query: Query) -> Self {
        BoolClause {
            occur: Occur::Must,
            queries: vec![query],
        }
    }

    /// Create a SHOULD clause with a single query.
    pub fn should(query: Query) -> Self {
        BoolClause {
            occur: Occur::Should,
            queries: vec![query],
        }
    }

    /// Create a MUST_NOT clause with a single query.
    pub fn must_not(query: Query) -> Self {
        BoolClause {
            occur: Occur::MustNot,
            queries: vec![query],
        }
    }

    /// Create a FILTER clause with a single query.
    pub fn filter(query: Query) -> Self {
        BoolClause {
            occur: Occur::Filter,
            queries: vec![query],
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.queries.is_empty() {
            return Err(ElasticQueryError::invalid_argument(format!(
                "Bool clause '{}' has no queries",
                self.occur.as_str()
            )));
        }
        Ok(())
    }
}

/// A boolean query that combines clauses with boolean logic.
///
/// A bool query always holds at least one clause and every clause holds at
/// least one query; the constructors reject anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    /// The clauses in this boolean query.
    clauses: Vec<BoolClause>,
    /// Minimum number of should clauses that must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    minimum_should_match: Option<String>,
    /// The boost factor for this query.
    #[serde(default = "default_boost")]
    boost: f32,
}

impl BoolQuery {
    /// Create a new boolean query from its clauses.
    pub fn new(clauses: Vec<BoolClause>) -> Result<Self> {
        let query = BoolQuery {
            clauses,
            minimum_should_match: None,
            boost: 1.0,
        };
        query.validate()?;
        Ok(query)
    }

    /// Add a clause to this boolean query.
    pub fn add_clause(&mut self, clause: BoolClause) -> Result<()> {
        clause.validate()?;
        self.clauses.push(clause);
        Ok(())
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Set the minimum number of should clauses that must match.
    pub fn with_minimum_should_match<S: Into<String>>(mut self, minimum: S) -> Self {
        self.minimum_should_match = Some(minimum.into());
        self
    }

    /// Get the clauses.
    pub fn clauses(&self) -> &[BoolClause] {
        &self.clauses
    }

    /// Get the minimum number of should clauses that must match.
    pub fn minimum_should_match(&self) -> Option<&str> {
        self.minimum_should_match.as_deref()
    }

    /// Get the boost factor.
    pub fn boost(&self) -> f32 {
        self.boost
    }

    /// Check the clause invariants. Deserialized queries are checked again
    /// when compiled.
    pub fn validate(&self) -> Result<()> {
        if self.clauses.is_empty() {
            return Err(ElasticQueryError::invalid_argument(
                "Bool query must have at least one clause",
            ));
        }
        self.clauses.iter().try_for_each(BoolClause::validate)
    }
}

/// A query that scores each document by its best matching child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisMaxQuery {
    /// The child queries.
    pub queries: Vec<Query>,
    /// Weight of the non-best matching children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tie_breaker: Option<f32>,
    /// The boost factor for this query.
    #[serde(default = "default_boost")]
    pub boost: f32,
}

impl DisMaxQuery {
    /// Create a new dis-max query.
    pub fn new(queries: Vec<Query>) -> Self {
        DisMaxQuery {
            queries,
            tie_breaker: None,
            boost: 1.0,
        }
    }

    /// Set the tie breaker.
    pub fn with_tie_breaker(mut self, tie_breaker: f32) -> Self {
        self.tie_breaker = Some(tie_breaker);
        self
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}
