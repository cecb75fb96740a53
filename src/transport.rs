//! Transport abstraction towards the search backend.
//!
//! The crate never talks to the network itself; everything it needs from the
//! backend goes through a [`SearchTransport`]. Implementations are shared
//! across requests and cursors, so they must be `Send + Sync` and must not
//! keep per-request state visible to other callers.
//!
//! Scroll ids and point-in-time ids are opaque capability handles: they are
//! passed back to the transport exactly as received.

pub mod memory;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;
use crate::request::deep_pagination::KeepAlive;
use crate::response::native::NativeSearchResponse;

pub use memory::InMemoryTransport;

/// Result type of transport calls.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// A compiled search request, ready to be sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeSearchRequest {
    /// Target index. Left empty when the body carries a point-in-time, which
    /// already fixes the index scope.
    pub index: String,
    /// Native request body.
    pub body: Value,
    /// Scroll keep-alive, when the search opens a scroll.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll: Option<KeepAlive>,
}

impl NativeSearchRequest {
    /// Create a request against `index`.
    pub fn new<I: Into<String>>(index: I, body: Value) -> Self {
        NativeSearchRequest {
            index: index.into(),
            body,
            scroll: None,
        }
    }

    /// Open a scroll with the given keep-alive.
    pub fn with_scroll(mut self, keep_alive: KeepAlive) -> Self {
        self.scroll = Some(keep_alive);
        self
    }
}

/// A client able to execute native requests against the backend.
pub trait SearchTransport: Send + Sync + std::fmt::Debug {
    /// Execute one search.
    fn search(&self, request: &NativeSearchRequest) -> TransportResult<NativeSearchResponse>;

    /// Execute a batch of searches, one result per request in request order.
    ///
    /// An outer error means the batch could not be dispatched at all. The
    /// default implementation runs the searches one after the other and gives
    /// up on the batch as soon as the backend turns out to be unreachable.
    fn multi_search(
        &self,
        requests: &[NativeSearchRequest],
    ) -> TransportResult<Vec<TransportResult<NativeSearchResponse>>> {
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            match self.search(request) {
                Err(e) if e.is_no_node_available() => return Err(e),
                result => responses.push(result),
            }
        }
        Ok(responses)
    }

    /// Fetch the next batch of a scroll.
    fn scroll(&self, scroll_id: &str, keep_alive: &KeepAlive)
    -> TransportResult<NativeSearchResponse>;

    /// Release a scroll.
    fn clear_scroll(&self, scroll_id: &str) -> TransportResult<()>;

    /// Open a point-in-time over `index`, returning its id.
    fn open_point_in_time(&self, index: &str, keep_alive: &KeepAlive) -> TransportResult<String>;

    /// Release a point-in-time.
    fn close_point_in_time(&self, pit_id: &str) -> TransportResult<()>;

    /// Count the documents of `index` matching a native query.
    fn count(&self, index: &str, query: Option<&Value>) -> TransportResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_native_request() {
        let request = NativeSearchRequest::new("docs", json!({"size": 0}))
            .with_scroll(KeepAlive::minutes(1));
        assert_eq!(request.index, "docs");
        assert_eq!(request.scroll.as_ref().map(ToString::to_string).as_deref(), Some("1m"));

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"index": "docs", "body": {"size": 0}, "scroll": "1m"}));
    }
}
