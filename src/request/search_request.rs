//! The backend-agnostic search request.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregation::AggregationRequest;
use crate::error::{ElasticQueryError, Result};
use crate::query::Query;
use crate::request::deep_pagination::DeepPagination;
use crate::request::highlight::HighlightCommand;
use crate::request::sort::SortCommand;
use crate::request::suggestion::SuggestionCommand;

fn default_rows() -> i64 {
    10
}

/// One logical search against one index.
///
/// A request is either a search (it has a `query`) or a completion
/// suggestion (it has a `suggestion`), never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchServerRequest {
    /// Target index (or alias, or comma separated list).
    pub index: String,
    /// Root of the query tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,
    /// Completion suggestion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<SuggestionCommand>,
    /// Filter applied to hits after aggregations were computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_filter: Option<Query>,
    /// Offset of the first hit.
    #[serde(default)]
    pub start: u32,
    /// Page size; negative means zero rows (aggregations only).
    #[serde(default = "default_rows")]
    pub rows: i64,
    /// Stored fields to return; every stored field when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields_to_return: Option<Vec<String>>,
    /// Whether the document source is returned.
    #[serde(default)]
    pub fetch_source: bool,
    /// Top level aggregations, by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aggregations: BTreeMap<String, AggregationRequest>,
    /// Highlighting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<HighlightCommand>,
    /// Sort order, primary key first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortCommand>,
    /// Search timeout in backend time syntax; the backend default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    /// Accuracy limit of the total hit count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_total_hits_up_to: Option<u64>,
    /// Only count matching documents.
    #[serde(default)]
    pub count_only: bool,
    /// Deep pagination controls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_pagination: Option<DeepPagination>,
}

impl SearchServerRequest {
    /// Create a search request.
    pub fn new<I: Into<String>>(index: I, query: Query) -> Self {
        SearchServerRequest {
            query: Some(query),
            ..Self::empty(index.into())
        }
    }

    /// Create a completion suggestion request.
    pub fn suggestion<I: Into<String>>(index: I, suggestion: SuggestionCommand) -> Self {
        SearchServerRequest {
            suggestion: Some(suggestion),
            ..Self::empty(index.into())
        }
    }

    fn empty(index: String) -> Self {
        SearchServerRequest {
            index,
            query: None,
            suggestion: None,
            post_filter: None,
            start: 0,
            rows: default_rows(),
            fields_to_return: None,
            fetch_source: false,
            aggregations: BTreeMap::new(),
            highlight: None,
            sort: Vec::new(),
            timeout: None,
            track_total_hits_up_to: None,
            count_only: false,
            deep_pagination: None,
        }
    }

    /// Set the offset of the first hit.
    pub fn with_start(mut self, start: u32) -> Self {
        self.start = start;
        self
    }

    /// Set the page size.
    pub fn with_rows(mut self, rows: i64) -> Self {
        self.rows = rows;
        self
    }

    /// Set the stored fields to return.
    pub fn with_fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.fields_to_return = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Set whether the document source is returned.
    pub fn with_fetch_source(mut self, fetch_source: bool) -> Self {
        self.fetch_source = fetch_source;
        self
    }

    /// Add a top level aggregation under its own name.
    pub fn add_aggregation(mut self, aggregation: AggregationRequest) -> Self {
        self.aggregations
            .insert(aggregation.name().to_string(), aggregation);
        self
    }

    /// Set the highlighting.
    pub fn with_highlight(mut self, highlight: HighlightCommand) -> Self {
        self.highlight = Some(highlight);
        self
    }

    /// Append a sort key.
    pub fn add_sort(mut self, sort: SortCommand) -> Self {
        self.sort.push(sort);
        self
    }

    /// Set the post filter.
    pub fn with_post_filter(mut self, query: Query) -> Self {
        self.post_filter = Some(query);
        self
    }

    /// Set the timeout.
    pub fn with_timeout<S: Into<String>>(mut self, timeout: S) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// Set the accuracy limit of the total hit count.
    pub fn with_track_total_hits_up_to(mut self, limit: u64) -> Self {
        self.track_total_hits_up_to = Some(limit);
        self
    }

    /// Only count matching documents.
    pub fn count_only(mut self) -> Self {
        self.count_only = true;
        self
    }

    /// Set the deep pagination controls.
    pub fn with_deep_pagination(mut self, deep_pagination: DeepPagination) -> Self {
        self.deep_pagination = Some(deep_pagination);
        self
    }

    /// Whether this request is a completion suggestion.
    pub fn is_suggestion(&self) -> bool {
        self.suggestion.is_some() && self.query.is_none()
    }

    /// Page size sent to the backend.
    pub fn size(&self) -> u32 {
        if self.rows < 0 {
            0
        } else {
            u32::try_from(self.rows).unwrap_or(u32::MAX)
        }
    }

    /// Check the structural invariants of the request.
    pub fn validate(&self) -> Result<()> {
        if self.index.trim().is_empty() {
            return Err(ElasticQueryError::invalid_argument(
                "The search request does not define an index to search on",
            ));
        }
        match (&self.query, &self.suggestion) {
            (None, None) => Err(ElasticQueryError::invalid_argument(
                "The search request defines neither a query nor a suggestion",
            )),
            (Some(_), Some(_)) => Err(ElasticQueryError::invalid_argument(
                "The search request defines both a query and a suggestion",
            )),
            _ => Ok(()),
        }?;
        if self.count_only && self.deep_pagination.is_some() {
            return Err(ElasticQueryError::invalid_argument(
                "A count request cannot use deep pagination",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::MatchAllQuery;

    #[test]
    fn test_defaults() {
        let request = SearchServerRequest::new("docs", MatchAllQuery::new().into());
        assert_eq!(request.rows, 10);
        assert_eq!(request.start, 0);
        assert!(request.fields_to_return.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_negative_rows() {
        let request = SearchServerRequest::new("docs", MatchAllQuery::new().into()).with_rows(-1);
        assert_eq!(request.size(), 0);
    }

    #[test]
    fn test_validate_index() {
        let request = SearchServerRequest::new("  ", MatchAllQuery::new().into());
        assert!(matches!(request.validate(), Err(ElasticQueryError::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_query_or_suggestion() {
        let mut request = SearchServerRequest::new("docs", MatchAllQuery::new().into());
        request.suggestion = Some(SuggestionCommand::new("ru", "suggest"));
        assert!(request.validate().is_err());

        request.query = None;
        assert!(request.validate().is_ok());
        assert!(request.is_suggestion());

        request.suggestion = None;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_deserialize() {
        let request: SearchServerRequest = serde_json::from_str(
            r#"{
                "index": "docs",
                "query": {"type": "match_all"},
                "rows": 500,
                "deep_pagination": {"method": "scroll", "keep_alive": "1m"}
            }"#,
        )
        .unwrap();
        assert_eq!(request.rows, 500);
        let deep = request.deep_pagination.unwrap();
        assert_eq!(deep.keep_alive.map(|k| k.to_string()).as_deref(), Some("1m"));
    }
}
