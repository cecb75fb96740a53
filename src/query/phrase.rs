//! Phrase query implementation.

use serde::{Deserialize, Serialize};

use crate::query::default_boost;

/// A query that matches an exact phrase, allowing `slop` positions of movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPhraseQuery {
    /// The field to search in.
    pub field: String,
    /// The phrase to match.
    pub phrase: String,
    /// Maximum number of intervening positions.
    #[serde(default)]
    pub slop: u32,
    /// Analyzer applied to the phrase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    /// The boost factor for this query.
    #[serde(default = "default_boost")]
    pub boost: f32,
}

impl MatchPhraseQuery {
    /// Create a new phrase query with zero slop.
    pub fn new<F: Into<String>, P: Into<String>>(field: F, phrase: P) -> Self {
        MatchPhraseQuery {
            field: field.into(),
            phrase: phrase.into(),
            slop: 0,
            analyzer: None,
            boost: 1.0,
        }
    }

    /// Set the slop.
    pub fn with_slop(mut self, slop: u32) -> Self {
        self.slop = slop;
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
