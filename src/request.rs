//! Search request model.

pub mod deep_pagination;
pub mod highlight;
pub mod search_request;
pub mod sort;
pub mod suggestion;

pub use deep_pagination::{DeepPagination, DeepPaginationMethod, KeepAlive};
pub use highlight::{HighlightCommand, HighlightField};
pub use search_request::SearchServerRequest;
pub use sort::{SortCommand, SortOrder};
pub use suggestion::SuggestionCommand;
