//! Compilation of a [`SearchServerRequest`] into a native request.

use log::{debug, warn};
use serde_json::{Map, Value, json};

use crate::aggregation::compiler::compile_aggregations;
use crate::config::ElasticQueryConfig;
use crate::error::{ElasticQueryError, Result};
use crate::query::compiler::compile_query;
use crate::request::deep_pagination::{DeepPaginationMethod, KeepAlive};
use crate::request::search_request::SearchServerRequest;
use crate::request::sort::{SortCommand, SortOrder};
use crate::transport::NativeSearchRequest;

/// How a compiled request is executed.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledRequest {
    /// A search, possibly continued through deep pagination.
    Search {
        native: NativeSearchRequest,
        pagination: Option<ResolvedPagination>,
    },
    /// A count of matching documents.
    Count {
        index: String,
        query: Option<Value>,
    },
    /// A completion suggestion.
    Suggestion { native: NativeSearchRequest },
}

/// Deep pagination controls with configuration defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPagination {
    /// Continuation strategy.
    pub method: DeepPaginationMethod,
    /// Lifetime of the server-side context.
    pub keep_alive: KeepAlive,
    /// Maximum number of documents yielded.
    pub limit: Option<usize>,
}

/// Compile `request` into what is sent to the backend.
///
/// Point-in-time ids are not part of the result: the orchestrator opens the
/// point-in-time and inserts it with [`attach_point_in_time`].
pub fn build_request(request: &SearchServerRequest, config: &ElasticQueryConfig) -> Result<CompiledRequest> {
    request.validate()?;

    if let Some(suggestion) = &request.suggestion {
        let body = json!({"size": 0, "suggest": suggestion.compile()});
        debug!("Compiled suggestion for '{}': {body}", request.index);
        return Ok(CompiledRequest::Suggestion {
            native: NativeSearchRequest::new(request.index.clone(), body),
        });
    }

    let query = request
        .query
        .as_ref()
        .ok_or_else(|| ElasticQueryError::invalid_argument("The search request has no query"))?;
    let compiled_query = compile_query(query)?;

    if request.count_only {
        debug!("Compiled count for '{}': {compiled_query}", request.index);
        return Ok(CompiledRequest::Count {
            index: request.index.clone(),
            query: Some(compiled_query),
        });
    }

    let pagination = request.deep_pagination.as_ref().map(|deep| ResolvedPagination {
        method: deep.method,
        keep_alive: deep.keep_alive.unwrap_or(config.deep_pagination.keep_alive),
        limit: deep.limit.or(config.deep_pagination.limit),
    });

    let mut body = Map::new();
    body.insert("query".into(), compiled_query);
    if let Some(post_filter) = &request.post_filter {
        body.insert("post_filter".into(), compile_query(post_filter)?);
    }

    let aggs = compile_aggregations(&request.aggregations)?;
    if !aggs.is_empty() {
        body.insert("aggs".into(), Value::Object(aggs));
    }

    let sort = effective_sort(request);
    if !sort.is_empty() {
        body.insert(
            "sort".into(),
            Value::Array(sort.iter().map(SortCommand::compile).collect()),
        );
    }

    if let Some(highlight) = &request.highlight {
        body.insert("highlight".into(), highlight.compile(Some(&config.highlight))?);
    }

    let stored_fields = match &request.fields_to_return {
        Some(fields) => json!(fields),
        None => json!(["*"]),
    };
    body.insert("stored_fields".into(), stored_fields);
    body.insert("_source".into(), json!(request.fetch_source));

    // Offsets are not allowed in scroll and search_after contexts.
    if pagination.is_none() {
        body.insert("from".into(), json!(request.start));
    }
    body.insert("size".into(), json!(request.size()));

    if let Some(timeout) = &request.timeout {
        body.insert("timeout".into(), json!(timeout));
    }
    match request.track_total_hits_up_to {
        Some(limit) => body.insert("track_total_hits".into(), json!(limit)),
        None => body.insert("track_total_hits".into(), json!(true)),
    };

    let body = Value::Object(body);
    debug!("Compiled search for '{}': {body}", request.index);

    let mut native = NativeSearchRequest::new(request.index.clone(), body);
    if let Some(ResolvedPagination {
        method: DeepPaginationMethod::Scroll,
        keep_alive,
        ..
    }) = &pagination
    {
        native = native.with_scroll(*keep_alive);
    }

    Ok(CompiledRequest::Search { native, pagination })
}

/// The sort sent to the backend. A `search_after` request needs a total
/// order, so it falls back to `_shard_doc` when no sort was given.
fn effective_sort(request: &SearchServerRequest) -> Vec<SortCommand> {
    match &request.deep_pagination {
        Some(deep) if deep.method == DeepPaginationMethod::SearchAfter && request.sort.is_empty() => {
            vec![SortCommand::new(
                DeepPaginationMethod::SearchAfter.optimal_sort_field(),
                SortOrder::Ascending,
            )]
        }
        _ => request.sort.clone(),
    }
}

/// Scope a compiled search to an open point-in-time.
///
/// The point-in-time fixes the index, so the request no longer names one.
pub fn attach_point_in_time(native: &mut NativeSearchRequest, pit_id: &str, keep_alive: &KeepAlive) {
    if let Value::Object(body) = &mut native.body {
        body.insert(
            "pit".into(),
            json!({"id": pit_id, "keep_alive": keep_alive.to_string()}),
        );
    }
    native.index.clear();
}

/// Warn when a deep-paginated request sorts in an order the strategy serves
/// slowly. Returns whether a warning was emitted.
pub fn check_sort_order(request: &SearchServerRequest, config: &ElasticQueryConfig) -> bool {
    let Some(deep) = &request.deep_pagination else {
        return false;
    };
    if !config.warn_on_slow_sort || deep.suppress_sort_warning {
        return false;
    }

    let optimal = deep.method.optimal_sort_field();
    let sort = effective_sort(request);
    let is_optimal = matches!(sort.as_slice(), [only] if only.field == optimal && only.order == SortOrder::Ascending);
    if !is_optimal {
        let fields: Vec<&str> = sort.iter().map(|s| s.field.as_str()).collect();
        warn!(
            "Deep pagination with {} on index '{}' sorts by {:?}; sorting by {optimal} ascending is much faster",
            deep.method,
            request.index,
            fields
        );
    }
    !is_optimal
}
