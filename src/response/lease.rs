//! Server-side continuation resources held by a result set.

use std::sync::Arc;

use log::{debug, error};
use serde_json::{Value, json};

use crate::request::deep_pagination::KeepAlive;
use crate::response::native::NativeSearchResponse;
use crate::transport::{NativeSearchRequest, SearchTransport, TransportResult};

/// The backend handle a result set continues from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Continuation {
    /// An open scroll context.
    Scroll {
        scroll_id: String,
        keep_alive: KeepAlive,
    },
    /// An open point-in-time and the request that is replayed against it.
    PointInTime {
        pit_id: String,
        keep_alive: KeepAlive,
        request: NativeSearchRequest,
    },
}

/// Scoped ownership of a scroll context or point-in-time.
///
/// The resource is released at most once: explicitly through
/// [`ContinuationLease::release`], or when the lease is dropped.
#[derive(Debug)]
pub struct ContinuationLease {
    transport: Arc<dyn SearchTransport>,
    continuation: Option<Continuation>,
}

impl ContinuationLease {
    pub(crate) fn scroll(
        transport: Arc<dyn SearchTransport>,
        scroll_id: String,
        keep_alive: KeepAlive,
    ) -> Self {
        ContinuationLease {
            transport,
            continuation: Some(Continuation::Scroll {
                scroll_id,
                keep_alive,
            }),
        }
    }

    pub(crate) fn point_in_time(
        transport: Arc<dyn SearchTransport>,
        pit_id: String,
        keep_alive: KeepAlive,
        request: NativeSearchRequest,
    ) -> Self {
        ContinuationLease {
            transport,
            continuation: Some(Continuation::PointInTime {
                pit_id,
                keep_alive,
                request,
            }),
        }
    }

    /// Whether the resource is still held.
    pub fn is_active(&self) -> bool {
        self.continuation.is_some()
    }

    /// Fetch the batch following the hit whose sort values are `last_sort`.
    ///
    /// Scroll continuations ignore `last_sort`. The held id is replaced with
    /// the one the backend returns, if any.
    pub(crate) fn fetch_next(&mut self, last_sort: &[Value]) -> TransportResult<NativeSearchResponse> {
        let Some(continuation) = self.continuation.as_mut() else {
            return Ok(NativeSearchResponse::default());
        };

        match continuation {
            Continuation::Scroll {
                scroll_id,
                keep_alive,
            } => {
                let response = self.transport.scroll(scroll_id, keep_alive)?;
                if let Some(next_id) = &response.scroll_id {
                    scroll_id.clone_from(next_id);
                }
                Ok(response)
            }
            Continuation::PointInTime {
                pit_id,
                keep_alive,
                request,
            } => {
                let next = search_after_request(request, pit_id, keep_alive, last_sort);
                let response = self.transport.search(&next)?;
                if let Some(next_id) = &response.pit_id {
                    pit_id.clone_from(next_id);
                }
                Ok(response)
            }
        }
    }

    /// Release the resource. Calls after the first one do nothing.
    ///
    /// Returns whether this call released something. A failed release is
    /// logged and the resource is considered gone either way.
    pub fn release(&mut self) -> bool {
        let Some(continuation) = self.continuation.take() else {
            return false;
        };

        let (kind, outcome) = match &continuation {
            Continuation::Scroll { scroll_id, .. } => {
                ("scroll", self.transport.clear_scroll(scroll_id))
            }
            Continuation::PointInTime { pit_id, .. } => {
                ("point-in-time", self.transport.close_point_in_time(pit_id))
            }
        };
        match outcome {
            Ok(()) => debug!("Released {kind}"),
            Err(e) => error!("Could not release {kind}: {e}"),
        }
        true
    }
}

impl Drop for ContinuationLease {
    fn drop(&mut self) {
        self.release();
    }
}

/// The replayed request for the batch after `last_sort`.
fn search_after_request(
    template: &NativeSearchRequest,
    pit_id: &str,
    keep_alive: &KeepAlive,
    last_sort: &[Value],
) -> NativeSearchRequest {
    let mut body = template.body.clone();
    if let Value::Object(map) = &mut body {
        // Aggregations and offsets only apply to the first batch.
        map.remove("aggs");
        map.remove("from");
        map.insert("track_total_hits".into(), json!(false));
        map.insert(
            "pit".into(),
            json!({"id": pit_id, "keep_alive": keep_alive.to_string()}),
        );
        map.insert("search_after".into(), Value::Array(last_sort.to_vec()));
    }
    NativeSearchRequest::new(template.index.clone(), body)
}
