//! Execution of search request batches against the backend.

use std::sync::Arc;

use log::{debug, error};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::component::SearchComponent;
use crate::component::carrier::SearchCarrier;
use crate::component::request_builder::{
    CompiledRequest, attach_point_in_time, build_request, check_sort_order,
};
use crate::config::ElasticQueryConfig;
use crate::error::{ElasticQueryError, Result, TransportError};
use crate::request::deep_pagination::DeepPaginationMethod;
use crate::request::search_request::SearchServerRequest;
use crate::request::suggestion::SuggestionCommand;
use crate::response::document::SearchServerDocument;
use crate::response::lease::ContinuationLease;
use crate::response::native::NativeSearchResponse;
use crate::response::search_response::{QueryErrorKind, SearchServerResponse};
use crate::transport::{NativeSearchRequest, SearchTransport, TransportResult};

/// Default name of the component in a chain.
pub const COMPONENT_NAME: &str = "elasticsearch";

/// An unreachable backend, with the search responses that arrived anyway.
type DispatchFailure = (TransportError, Vec<NativeSearchResponse>);

#[derive(Debug)]
enum Dispatched {
    Search(NativeSearchResponse),
    Count(u64),
}

/// A compiled request waiting for dispatch.
#[derive(Debug)]
struct Pending {
    compiled: CompiledRequest,
    pit_id: Option<String>,
    failure: Option<TransportError>,
}

impl Pending {
    fn native(&self) -> Option<&NativeSearchRequest> {
        match &self.compiled {
            CompiledRequest::Search { native, .. } | CompiledRequest::Suggestion { native } => {
                Some(native)
            }
            CompiledRequest::Count { .. } => None,
        }
    }
}

/// Runs batches of [`SearchServerRequest`]s through a [`SearchTransport`].
///
/// Compilation errors fail the whole batch before anything is sent. Backend
/// failures are flagged on the responses instead: an unreachable backend
/// yields a single `NoNodeAvailable` response for the batch, any other
/// failure flags only the request it happened to.
#[derive(Debug)]
pub struct ElasticSearchComponent {
    name: String,
    transport: Arc<dyn SearchTransport>,
    config: ElasticQueryConfig,
    thread_pool: Option<Arc<ThreadPool>>,
}

impl ElasticSearchComponent {
    /// Create a component sending requests through `transport`.
    pub fn new(transport: Arc<dyn SearchTransport>, config: ElasticQueryConfig) -> Result<Self> {
        config.validate()?;

        let thread_pool = if config.parallel_dispatch {
            let threads = config.dispatch_threads.unwrap_or_else(num_cpus::get);
            let pool = ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("elastic-query-dispatch-{i}"))
                .build()
                .map_err(|e| ElasticQueryError::other(format!("Failed to create thread pool: {e}")))?;
            Some(Arc::new(pool))
        } else {
            None
        };

        Ok(ElasticSearchComponent {
            name: COMPONENT_NAME.to_string(),
            transport,
            config,
            thread_pool,
        })
    }

    /// Rename the component.
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// The configuration.
    pub fn config(&self) -> &ElasticQueryConfig {
        &self.config
    }

    /// Execute a batch, returning one response per request in request order,
    /// or a single `NoNodeAvailable` response when the backend is unreachable.
    pub fn execute(&self, requests: &[SearchServerRequest]) -> Result<Vec<SearchServerResponse>> {
        let mut pending = Vec::with_capacity(requests.len());
        for request in requests {
            let compiled = build_request(request, &self.config)?;
            check_sort_order(request, &self.config);
            pending.push(Pending {
                compiled,
                pit_id: None,
                failure: None,
            });
        }
        debug!("Executing a batch of {} requests", pending.len());

        if let Err(e) = self.open_points_in_time(&mut pending) {
            return Ok(vec![self.abort_batch(&pending, Vec::new(), &e)]);
        }

        let jobs: Vec<&Pending> = pending.iter().filter(|p| p.failure.is_none()).collect();
        let dispatched = match self.dispatch(&jobs) {
            Ok(dispatched) => dispatched,
            Err((e, completed)) => return Ok(vec![self.abort_batch(&pending, completed, &e)]),
        };

        let mut dispatched = dispatched.into_iter();
        let responses = pending
            .into_iter()
            .map(|pending| {
                if let Some(e) = &pending.failure {
                    return SearchServerResponse::from_transport_error(e);
                }
                let outcome = dispatched.next().unwrap_or_else(|| {
                    Err(TransportError::Io("No response was received for the request".to_string()))
                });
                self.build_response(pending, outcome)
            })
            .collect();
        Ok(responses)
    }

    /// Complete the text of `command` against its completion field.
    pub fn suggest<I: Into<String>>(&self, index: I, command: SuggestionCommand) -> Result<Vec<SearchServerDocument>> {
        let request = SearchServerRequest::suggestion(index, command);
        let response = self
            .execute(std::slice::from_ref(&request))?
            .into_iter()
            .next()
            .ok_or_else(|| ElasticQueryError::no_response("No response for the suggestion"))?;

        match (response.query_error(), response.error_message()) {
            (Some(kind), message) => {
                let message = message.unwrap_or_default().to_string();
                Err(match kind {
                    QueryErrorKind::NoNodeAvailable => ElasticQueryError::NoNodeAvailable(message),
                    QueryErrorKind::NoResponse => ElasticQueryError::no_response(message),
                    QueryErrorKind::QueryError => ElasticQueryError::query(message),
                })
            }
            (None, _) => Ok(response.suggestion_results()),
        }
    }

    /// Open a point-in-time for every `search_after` request.
    ///
    /// A per-request failure is recorded on the request; an unreachable
    /// backend aborts with the error.
    fn open_points_in_time(&self, pending: &mut [Pending]) -> TransportResult<()> {
        for entry in pending.iter_mut() {
            let CompiledRequest::Search {
                native,
                pagination: Some(pagination),
            } = &mut entry.compiled
            else {
                continue;
            };
            if pagination.method != DeepPaginationMethod::SearchAfter {
                continue;
            }

            match self
                .transport
                .open_point_in_time(&native.index, &pagination.keep_alive)
            {
                Ok(pit_id) => {
                    debug!("Opened point-in-time on '{}'", native.index);
                    attach_point_in_time(native, &pit_id, &pagination.keep_alive);
                    entry.pit_id = Some(pit_id);
                }
                Err(e) if e.is_no_node_available() => return Err(e),
                Err(e) => {
                    error!("Could not open a point-in-time on '{}': {e}", native.index);
                    entry.failure = Some(e);
                }
            }
        }
        Ok(())
    }

    /// Send the jobs. On an unreachable backend the error comes back with
    /// the responses that did arrive, so their resources can be released.
    fn dispatch(
        &self,
        jobs: &[&Pending],
    ) -> std::result::Result<Vec<TransportResult<Dispatched>>, DispatchFailure> {
        let results = match &self.thread_pool {
            Some(pool) => pool.install(|| {
                jobs.par_iter()
                    .map(|job| self.dispatch_one(job))
                    .collect::<Vec<_>>()
            }),
            None => self.dispatch_sequential(jobs).map_err(|e| (e, Vec::new()))?,
        };

        let unreachable = results.iter().find_map(|result| match result {
            Err(e) if e.is_no_node_available() => Some(e.clone()),
            _ => None,
        });
        match unreachable {
            Some(e) => {
                let completed = results
                    .into_iter()
                    .filter_map(|result| match result {
                        Ok(Dispatched::Search(response)) => Some(response),
                        _ => None,
                    })
                    .collect();
                Err((e, completed))
            }
            None => Ok(results),
        }
    }

    fn dispatch_one(&self, job: &Pending) -> TransportResult<Dispatched> {
        match &job.compiled {
            CompiledRequest::Count { index, query } => {
                self.transport.count(index, query.as_ref()).map(Dispatched::Count)
            }
            CompiledRequest::Search { native, .. } | CompiledRequest::Suggestion { native } => {
                self.transport.search(native).map(Dispatched::Search)
            }
        }
    }

    /// Searches go out as one multi-search; counts are sent on their own.
    ///
    /// Only an unreachable backend fails the dispatch. Any other error of the
    /// multi-search call is flagged on each search it carried.
    fn dispatch_sequential(&self, jobs: &[&Pending]) -> TransportResult<Vec<TransportResult<Dispatched>>> {
        let searches: Vec<NativeSearchRequest> = jobs
            .iter()
            .filter_map(|job| job.native().cloned())
            .collect();
        let mut search_results = if searches.is_empty() {
            Vec::new().into_iter()
        } else {
            match self.transport.multi_search(&searches) {
                Ok(results) => results.into_iter(),
                Err(e) if e.is_no_node_available() => return Err(e),
                Err(e) => {
                    error!("The multi-search of {} requests failed: {e}", searches.len());
                    searches
                        .iter()
                        .map(|_| Err(e.clone()))
                        .collect::<Vec<_>>()
                        .into_iter()
                }
            }
        };

        let mut results = Vec::with_capacity(jobs.len());
        for job in jobs {
            let result = match job.native() {
                Some(_) => search_results
                    .next()
                    .unwrap_or_else(|| {
                        Err(TransportError::Io("The multi-search returned too few responses".to_string()))
                    })
                    .map(Dispatched::Search),
                None => match self.dispatch_one(job) {
                    Err(e) if e.is_no_node_available() => return Err(e),
                    result => result,
                },
            };
            results.push(result);
        }
        Ok(results)
    }

    fn build_response(&self, pending: Pending, outcome: TransportResult<Dispatched>) -> SearchServerResponse {
        match (pending.compiled, outcome) {
            (CompiledRequest::Search { native, pagination }, Ok(Dispatched::Search(response))) => {
                let limit = pagination.as_ref().and_then(|p| p.limit);
                let lease = pagination.and_then(|pagination| match pagination.method {
                    DeepPaginationMethod::Scroll => response.scroll_id.clone().map(|scroll_id| {
                        ContinuationLease::scroll(self.transport.clone(), scroll_id, pagination.keep_alive)
                    }),
                    DeepPaginationMethod::SearchAfter => pending.pit_id.map(|pit_id| {
                        let pit_id = response.pit_id.clone().unwrap_or(pit_id);
                        ContinuationLease::point_in_time(
                            self.transport.clone(),
                            pit_id,
                            pagination.keep_alive,
                            native,
                        )
                    }),
                });
                SearchServerResponse::from_native(response, lease, limit)
            }
            (CompiledRequest::Suggestion { .. }, Ok(Dispatched::Search(response))) => {
                SearchServerResponse::from_suggestion(response)
            }
            (CompiledRequest::Count { .. }, Ok(Dispatched::Count(count))) => {
                SearchServerResponse::from_count(count)
            }
            (_, Ok(_)) => SearchServerResponse::failed(
                QueryErrorKind::NoResponse,
                "The backend answered with a response of the wrong kind",
            ),
            (_, Err(e)) => {
                error!("Search failed: {e}");
                if let Some(pit_id) = pending.pit_id {
                    self.close_point_in_time(&pit_id);
                }
                SearchServerResponse::from_transport_error(&e)
            }
        }
    }

    /// Give up on the batch: release what was acquired and answer with a
    /// single `NoNodeAvailable` response.
    fn abort_batch(
        &self,
        pending: &[Pending],
        completed: Vec<NativeSearchResponse>,
        e: &TransportError,
    ) -> SearchServerResponse {
        error!("The search batch could not be dispatched: {e}");
        for pit_id in pending.iter().filter_map(|p| p.pit_id.as_deref()) {
            self.close_point_in_time(pit_id);
        }
        for scroll_id in completed.iter().filter_map(|r| r.scroll_id.as_deref()) {
            if let Err(e) = self.transport.clear_scroll(scroll_id) {
                error!("Could not release scroll: {e}");
            }
        }
        SearchServerResponse::failed(QueryErrorKind::NoNodeAvailable, e.to_string())
    }

    fn close_point_in_time(&self, pit_id: &str) {
        if let Err(e) = self.transport.close_point_in_time(pit_id) {
            error!("Could not release point-in-time: {e}");
        }
    }
}

impl SearchComponent for ElasticSearchComponent {
    fn name(&self) -> &str {
        &self.name
    }

    /// Replace the carrier's responses with the results of its requests.
    /// Stops the chain when the backend is unreachable.
    fn process_search(&self, carrier: &mut SearchCarrier) -> Result<bool> {
        let responses = self.execute(carrier.server_requests())?;
        let stop = responses
            .iter()
            .any(|response| response.query_error() == Some(QueryErrorKind::NoNodeAvailable));
        carrier.set_server_responses(responses);
        Ok(stop)
    }
}
