//! Queries on nested objects.

use serde::{Deserialize, Serialize};

use crate::query::{Query, default_boost};
use crate::request::highlight::HighlightCommand;

/// How scores of matching nested objects combine into the parent score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestedScoreMode {
    #[default]
    Avg,
    Sum,
    Min,
    Max,
    None,
}

impl NestedScoreMode {
    /// Native name of the score mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            NestedScoreMode::Avg => "avg",
            NestedScoreMode::Sum => "sum",
            NestedScoreMode::Min => "min",
            NestedScoreMode::Max => "max",
            NestedScoreMode::None => "none",
        }
    }
}

/// Returns the nested objects that caused a parent document to match.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InnerHits {
    /// Whether the source of each nested hit is returned.
    #[serde(default)]
    pub fetch_source: bool,
    /// Stored fields returned for each nested hit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stored_fields: Vec<String>,
    /// Highlighting of the nested hits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<HighlightCommand>,
    /// Whether score explanations are returned.
    #[serde(default)]
    pub explain: bool,
    /// Maximum number of nested hits per parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl InnerHits {
    /// Create inner hits with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the source is returned.
    pub fn with_fetch_source(mut self, fetch_source: bool) -> Self {
        self.fetch_source = fetch_source;
        self
    }

    /// Set the stored fields.
    pub fn with_stored_fields(mut self, fields: Vec<String>) -> Self {
        self.stored_fields = fields;
        self
    }

    /// Set the highlighting.
    pub fn with_highlight(mut self, highlight: HighlightCommand) -> Self {
        self.highlight = Some(highlight);
        self
    }

    /// Set the maximum number of nested hits.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }
}

/// A query that runs its child against nested objects under `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedQuery {
    /// Path of the nested objects.
    pub path: String,
    /// Query run against each nested object.
    pub query: Box<Query>,
    /// How nested scores combine.
    #[serde(default)]
    pub score_mode: NestedScoreMode,
    /// Inner hits returned with each parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_hits: Option<InnerHits>,
    /// The boost factor for this query.
    #[serde(default = "default_boost")]
    pub boost: f32,
}

impl NestedQuery {
    /// Create a new nested query.
    pub fn new<P: Into<String>>(path: P, query: Query) -> Self {
        NestedQuery {
            path: path.into(),
            query: Box::new(query),
            score_mode: NestedScoreMode::Avg,
            inner_hits: None,
            boost: 1.0,
        }
    }

    /// Set the score mode.
    pub fn with_score_mode(mut self, score_mode: NestedScoreMode) -> Self {
        self.score_mode = score_mode;
        self
    }

    /// Set the inner hits.
    pub fn with_inner_hits(mut self, inner_hits: InnerHits) -> Self {
        self.inner_hits = Some(inner_hits);
        self
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}
