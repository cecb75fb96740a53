//! Search responses and the documents they carry.
//!
//! A [`SearchServerResponse`] is produced for every request of a batch. It is
//! either a success (search, count or suggestion) or flagged with a
//! [`QueryErrorKind`]. Documents are consumed through a [`DocumentCursor`],
//! which transparently continues deep-paginated result sets.

pub mod cursor;
pub mod document;
pub mod lease;
pub mod native;
pub mod search_response;

pub use cursor::{CursorState, DocumentCursor};
pub use document::SearchServerDocument;
pub use lease::ContinuationLease;
pub use native::{NativeHit, NativeSearchResponse, NativeTotalHits, TotalHitsRelation};
pub use search_response::{QueryErrorKind, SearchServerResponse};
