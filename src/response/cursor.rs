//! Lazy iteration over every document of a result set.
//!
//! A [`DocumentCursor`] starts with the hits of the first response. When a
//! batch runs out and the result set holds a [`ContinuationLease`], the next
//! batch is fetched from the backend inside [`Iterator::next`], so advancing
//! the cursor may block on I/O. A failed fetch ends the iteration like
//! normal exhaustion; [`DocumentCursor::state`] and
//! [`DocumentCursor::failure`] tell the two apart.
//!
//! The lease is released once the cursor reaches a terminal state, or when
//! the cursor is dropped early.

use std::collections::VecDeque;

use log::{debug, error};
use serde_json::Value;

use crate::error::TransportError;
use crate::response::document::SearchServerDocument;
use crate::response::lease::ContinuationLease;
use crate::response::native::NativeHit;

/// Position of a cursor in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Unread documents remain in the current batch.
    HasBatch,
    /// The current batch is used up; more documents may exist.
    NeedFetch,
    /// No more documents exist.
    Exhausted,
    /// The document limit was reached.
    Capped,
    /// Fetching a further batch failed.
    Failed,
}

impl CursorState {
    /// Whether the cursor will yield no further documents.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CursorState::Exhausted | CursorState::Capped | CursorState::Failed
        )
    }
}

/// Iterator over the documents of a search, across batches.
#[derive(Debug)]
pub struct DocumentCursor {
    batch: VecDeque<NativeHit>,
    lease: Option<ContinuationLease>,
    limit: Option<usize>,
    yielded: usize,
    last_batch_len: usize,
    last_sort: Vec<Value>,
    state: CursorState,
    failure: Option<TransportError>,
}

impl DocumentCursor {
    /// A cursor over `hits`, continuing through `lease` when present and
    /// yielding at most `limit` documents.
    pub fn new(hits: Vec<NativeHit>, lease: Option<ContinuationLease>, limit: Option<usize>) -> Self {
        let state = if hits.is_empty() {
            CursorState::NeedFetch
        } else {
            CursorState::HasBatch
        };
        DocumentCursor {
            last_batch_len: hits.len(),
            batch: hits.into(),
            lease,
            limit,
            yielded: 0,
            last_sort: Vec::new(),
            state,
            failure: None,
        }
    }

    /// A cursor without documents.
    pub fn empty() -> Self {
        Self::new(Vec::new(), None, None)
    }

    /// Current state.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// The error that ended the iteration, if a fetch failed.
    pub fn failure(&self) -> Option<&TransportError> {
        self.failure.as_ref()
    }

    /// Number of documents yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Whether a continuation resource is still held.
    pub fn holds_lease(&self) -> bool {
        self.lease.as_ref().is_some_and(ContinuationLease::is_active)
    }

    /// Stop iterating and release the continuation resource.
    ///
    /// Safe to call any number of times.
    pub fn close(&mut self) {
        if !self.state.is_terminal() {
            self.finish(CursorState::Exhausted);
        }
        self.release();
    }

    fn finish(&mut self, state: CursorState) {
        debug!("Cursor finished as {state:?} after {} documents", self.yielded);
        self.state = state;
        self.batch.clear();
        self.release();
    }

    fn release(&mut self) {
        if let Some(lease) = self.lease.as_mut() {
            lease.release();
        }
    }

    fn fetch(&mut self) {
        let Some(lease) = self.lease.as_mut().filter(|lease| lease.is_active()) else {
            self.finish(CursorState::Exhausted);
            return;
        };

        match lease.fetch_next(&self.last_sort) {
            Ok(response) => {
                let hits = response.hits.hits;
                self.last_batch_len = hits.len();
                if hits.is_empty() {
                    self.finish(CursorState::Exhausted);
                } else {
                    debug!("Fetched a batch of {} documents", hits.len());
                    self.batch = hits.into();
                    self.state = CursorState::HasBatch;
                }
            }
            Err(e) => {
                error!("Could not retrieve the next batch: {e}");
                self.failure = Some(e);
                self.finish(CursorState::Failed);
            }
        }
    }
}

impl Iterator for DocumentCursor {
    type Item = SearchServerDocument;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.state.is_terminal() {
                return None;
            }
            if self.limit.is_some_and(|limit| self.yielded >= limit) {
                self.finish(CursorState::Capped);
                return None;
            }

            if let Some(hit) = self.batch.pop_front() {
                self.yielded += 1;
                if self.batch.is_empty() {
                    self.state = CursorState::NeedFetch;
                    self.last_sort.clone_from(&hit.sort);
                }
                return Some(SearchServerDocument::from_hit(hit));
            }

            if self.last_batch_len == 0 {
                self.finish(CursorState::Exhausted);
                return None;
            }
            self.fetch();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hits(ids: &[&str]) -> Vec<NativeHit> {
        ids.iter()
            .map(|id| NativeHit {
                id: Some(id.to_string()),
                sort: vec![json!(id)],
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_single_page() {
        let mut cursor = DocumentCursor::new(hits(&["a", "b"]), None, None);
        assert_eq!(cursor.state(), CursorState::HasBatch);
        let ids: Vec<_> = cursor.by_ref().map(|d| d.id().unwrap().to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn test_limit() {
        let mut cursor = DocumentCursor::new(hits(&["a", "b", "c"]), None, Some(2));
        assert_eq!(cursor.by_ref().count(), 2);
        assert_eq!(cursor.state(), CursorState::Capped);
        assert_eq!(cursor.yielded(), 2);
    }

    #[test]
    fn test_empty() {
        let mut cursor = DocumentCursor::empty();
        assert_eq!(cursor.next(), None);
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert!(cursor.failure().is_none());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut cursor = DocumentCursor::new(hits(&["a"]), None, None);
        cursor.close();
        cursor.close();
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert_eq!(cursor.next(), None);
    }
}
