//! Per-request outcome of a search batch.

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::aggregation::materializer::materialize;
use crate::aggregation::request::AggregationRequest;
use crate::aggregation::result::AggregationResult;
use crate::error::TransportError;
use crate::request::suggestion::SUGGESTION_NAME;
use crate::response::cursor::DocumentCursor;
use crate::response::document::SearchServerDocument;
use crate::response::lease::ContinuationLease;
use crate::response::native::{NativeSearchResponse, NativeSuggestEntry, TotalHitsRelation};

/// Kind of failure flagged on a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryErrorKind {
    /// The backend gave no usable answer for the request.
    NoResponse,
    /// No backend node was reachable; the whole batch failed.
    NoNodeAvailable,
    /// The backend failed while executing the request.
    QueryError,
}

impl QueryErrorKind {
    /// The flag a transport failure maps to.
    pub fn from_transport_error(error: &TransportError) -> Self {
        match error {
            TransportError::NoNodeAvailable(_) => QueryErrorKind::NoNodeAvailable,
            TransportError::Io(_) => QueryErrorKind::QueryError,
            TransportError::Status { .. } => QueryErrorKind::NoResponse,
        }
    }
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryErrorKind::NoResponse => f.write_str("NoResponse"),
            QueryErrorKind::NoNodeAvailable => f.write_str("NoNodeAvailable"),
            QueryErrorKind::QueryError => f.write_str("QueryError"),
        }
    }
}

#[derive(Debug)]
enum Outcome {
    Search(NativeSearchResponse),
    Count(u64),
    Failed { kind: QueryErrorKind, message: String },
}

/// The response to one [`crate::request::SearchServerRequest`].
///
/// A response without an error flag is a success, even with zero hits.
#[derive(Debug)]
pub struct SearchServerResponse {
    outcome: Outcome,
    lease: Option<ContinuationLease>,
    limit: Option<usize>,
    suggestion: bool,
}

impl SearchServerResponse {
    /// A successful search response.
    pub fn from_native(
        native: NativeSearchResponse,
        lease: Option<ContinuationLease>,
        limit: Option<usize>,
    ) -> Self {
        SearchServerResponse {
            outcome: Outcome::Search(native),
            lease,
            limit,
            suggestion: false,
        }
    }

    /// A successful suggestion response.
    pub fn from_suggestion(native: NativeSearchResponse) -> Self {
        SearchServerResponse {
            suggestion: true,
            ..Self::from_native(native, None, None)
        }
    }

    /// A successful count response.
    pub fn from_count(count: u64) -> Self {
        SearchServerResponse {
            outcome: Outcome::Count(count),
            lease: None,
            limit: None,
            suggestion: false,
        }
    }

    /// A response flagged with an error.
    pub fn failed<S: Into<String>>(kind: QueryErrorKind, message: S) -> Self {
        SearchServerResponse {
            outcome: Outcome::Failed {
                kind,
                message: message.into(),
            },
            lease: None,
            limit: None,
            suggestion: false,
        }
    }

    /// A response flagged with the error a transport failure maps to.
    pub fn from_transport_error(error: &TransportError) -> Self {
        Self::failed(QueryErrorKind::from_transport_error(error), error.to_string())
    }

    /// Whether the response is flagged with an error.
    pub fn has_query_error(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }

    /// The error flag.
    pub fn query_error(&self) -> Option<QueryErrorKind> {
        match &self.outcome {
            Outcome::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The error message.
    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Whether this answers a count request.
    pub fn is_count_response(&self) -> bool {
        matches!(self.outcome, Outcome::Count(_))
    }

    /// Whether this answers a suggestion request.
    pub fn is_suggestion_search_response(&self) -> bool {
        self.suggestion
    }

    /// The native response, for successful searches.
    pub fn native(&self) -> Option<&NativeSearchResponse> {
        match &self.outcome {
            Outcome::Search(native) => Some(native),
            _ => None,
        }
    }

    /// Number of matching documents: the count of a count request, the
    /// total hits of a search, zero otherwise.
    pub fn num_found(&self) -> u64 {
        match &self.outcome {
            Outcome::Count(count) => *count,
            Outcome::Search(native) => native.total_hits(),
            Outcome::Failed { .. } => 0,
        }
    }

    /// Whether [`SearchServerResponse::num_found`] is exact or a lower bound.
    pub fn num_found_relation(&self) -> TotalHitsRelation {
        match &self.outcome {
            Outcome::Search(native) => native
                .hits
                .total
                .map(|total| total.relation)
                .unwrap_or_default(),
            _ => TotalHitsRelation::Eq,
        }
    }

    /// Whether the response still holds a scroll context or point-in-time.
    pub fn holds_lease(&self) -> bool {
        self.lease.as_ref().is_some_and(ContinuationLease::is_active)
    }

    /// The documents of the result set.
    ///
    /// The cursor takes over the hits and the continuation resource, so a
    /// second call yields an empty cursor. Flagged responses yield an empty
    /// cursor as well.
    pub fn document_results(&mut self) -> DocumentCursor {
        let lease = self.lease.take();
        match &mut self.outcome {
            Outcome::Search(native) => {
                let hits = std::mem::take(&mut native.hits.hits);
                DocumentCursor::new(hits, lease, self.limit)
            }
            _ => DocumentCursor::new(Vec::new(), lease, None),
        }
    }

    /// The result of a top level aggregation of the request.
    ///
    /// `None` when the backend returned no result under the aggregation's
    /// name; this is not an error.
    pub fn aggregation_result(&self, request: &AggregationRequest) -> Option<AggregationResult> {
        let native = self.native()?;
        materialize(request, &native.aggregations)
    }

    /// Whether the backend returned a top level aggregation named `name`.
    pub fn has_aggregation(&self, name: &str) -> bool {
        self.native()
            .is_some_and(|native| native.aggregations.contains_key(name))
    }

    /// Number of suggestion options returned.
    pub fn num_suggestions(&self) -> usize {
        self.suggestion_entries()
            .iter()
            .map(|entry| entry.options.len())
            .sum()
    }

    /// Suggestions as documents carrying a `text` field plus the payload of
    /// the suggested document.
    pub fn suggestion_results(&self) -> Vec<SearchServerDocument> {
        self.suggestion_entries()
            .into_iter()
            .flat_map(|entry| entry.options)
            .map(|option| {
                let mut hit = json!({
                    "_id": option.id,
                    "_score": option.score,
                    "_source": option.source,
                });
                if let Value::Object(map) = &mut hit {
                    map.retain(|_, value| !value.is_null());
                }
                let hit = serde_json::from_value(hit).unwrap_or_default();
                let document = SearchServerDocument::from_top_hit(hit);
                document.with_field("text", option.text)
            })
            .collect()
    }

    fn suggestion_entries(&self) -> Vec<NativeSuggestEntry> {
        let Some(value) = self.native().and_then(|native| native.suggest.get(SUGGESTION_NAME)) else {
            return Vec::new();
        };
        match serde_json::from_value(value.clone()) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not read suggestions: {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::request::MaxAggregation;

    fn native(value: Value) -> NativeSearchResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_error_mapping() {
        let response =
            SearchServerResponse::from_transport_error(&TransportError::Io("reset".into()));
        assert!(response.has_query_error());
        assert_eq!(response.query_error(), Some(QueryErrorKind::QueryError));
        assert_eq!(response.error_message(), Some("i/o failure: reset"));
        assert_eq!(response.num_found(), 0);

        let response = SearchServerResponse::from_transport_error(&TransportError::Status {
            status: 400,
            reason: "parsing_exception".into(),
        });
        assert_eq!(response.query_error(), Some(QueryErrorKind::NoResponse));

        let response = SearchServerResponse::from_transport_error(
            &TransportError::NoNodeAvailable("refused".into()),
        );
        assert_eq!(response.query_error(), Some(QueryErrorKind::NoNodeAvailable));
    }

    #[test]
    fn test_failed_response_has_no_documents() {
        let mut response = SearchServerResponse::failed(QueryErrorKind::NoResponse, "boom");
        assert_eq!(response.document_results().count(), 0);
        assert!(!response.has_aggregation("anything"));
    }

    #[test]
    fn test_num_found() {
        let response = SearchServerResponse::from_count(12);
        assert!(response.is_count_response());
        assert_eq!(response.num_found(), 12);

        let response = SearchServerResponse::from_native(
            native(json!({"hits": {"total": {"value": 10000, "relation": "gte"}, "hits": []}})),
            None,
            None,
        );
        assert!(!response.has_query_error());
        assert_eq!(response.num_found(), 10000);
        assert_eq!(response.num_found_relation(), TotalHitsRelation::Gte);
    }

    #[test]
    fn test_documents_and_aggregations() {
        let mut response = SearchServerResponse::from_native(
            native(json!({
                "hits": {"total": {"value": 2, "relation": "eq"}, "hits": [
                    {"_id": "1", "fields": {"title": ["a"]}},
                    {"_id": "2", "fields": {"title": ["b"]}}
                ]},
                "aggregations": {"max_year": {"value": 2020.0}}
            })),
            None,
            None,
        );

        let request: AggregationRequest = MaxAggregation::field("max_year", "year").into();
        assert!(response.has_aggregation("max_year"));
        let result = response.aggregation_result(&request).unwrap();
        assert_eq!(result.as_max().unwrap().value, Some(2020.0));

        let titles: Vec<_> = response
            .document_results()
            .filter_map(|document| document.field_as::<String>("title"))
            .collect();
        assert_eq!(titles, vec!["a", "b"]);
        assert_eq!(response.document_results().count(), 0);
        assert_eq!(response.num_found(), 2);
    }

    #[test]
    fn test_suggestions() {
        let response = SearchServerResponse::from_suggestion(native(json!({
            "suggest": {"completion": [{
                "text": "ru",
                "options": [
                    {"text": "rust", "_id": "1", "_score": 3.0, "_source": {"popularity": 10}},
                    {"text": "ruby", "_id": "2", "_score": 1.0}
                ]
            }]}
        })));

        assert!(response.is_suggestion_search_response());
        assert_eq!(response.num_suggestions(), 2);
        let suggestions = response.suggestion_results();
        assert_eq!(suggestions[0].field_as::<String>("text").as_deref(), Some("rust"));
        assert_eq!(suggestions[0].field_as::<i64>("popularity"), Some(10));
        assert_eq!(suggestions[1].id(), Some("2"));
    }
}
