//! Error types for the elastic-query library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`ElasticQueryError`] enum. Structural problems with a request are
//! reported when the request is compiled; backend failures observed while a
//! batch executes are captured on the response objects instead (see
//! [`crate::response::QueryErrorKind`]).
//!
//! # Examples
//!
//! ```
//! use elastic_query::error::{ElasticQueryError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(ElasticQueryError::invalid_argument("bool query without clauses"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for elastic-query operations.
#[derive(Error, Debug)]
pub enum ElasticQueryError {
    /// Malformed request construction (empty bool query, mismatched parallel lists, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A query document named a query type outside the supported set.
    #[error("Unsupported query type: {0}")]
    UnsupportedQueryType(String),

    /// A query or aggregation option that is recognised but not implemented.
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// No backend node could be reached.
    #[error("No node available: {0}")]
    NoNodeAvailable(String),

    /// The backend did not produce a usable response for a request.
    #[error("No response: {0}")]
    NoResponse(String),

    /// The backend failed while executing a request.
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration errors.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Errors reported by a transport implementation.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// I/O errors (request files, index files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors carrying extra context from the command line tools.
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

/// Failures reported by a [`crate::transport::SearchTransport`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// None of the configured nodes accepted the connection.
    #[error("no node available: {0}")]
    NoNodeAvailable(String),

    /// The request was sent but the exchange failed on the wire.
    #[error("i/o failure: {0}")]
    Io(String),

    /// The backend answered with a non-success status.
    #[error("status {status}: {reason}")]
    Status {
        /// HTTP-like status code.
        status: u16,
        /// Reason reported by the backend.
        reason: String,
    },
}

impl TransportError {
    /// Whether the failure means the whole backend is unreachable.
    pub fn is_no_node_available(&self) -> bool {
        matches!(self, TransportError::NoNodeAvailable(_))
    }
}

/// Result type alias for operations that may fail with ElasticQueryError.
pub type Result<T> = std::result::Result<T, ElasticQueryError>;

impl ElasticQueryError {
    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        ElasticQueryError::InvalidArgument(msg.into())
    }

    /// Create a new unsupported query type error.
    pub fn unsupported_query_type<S: Into<String>>(msg: S) -> Self {
        ElasticQueryError::UnsupportedQueryType(msg.into())
    }

    /// Create a new unsupported feature error.
    pub fn unsupported_feature<S: Into<String>>(msg: S) -> Self {
        ElasticQueryError::UnsupportedFeature(msg.into())
    }

    /// Create a new no-response error.
    pub fn no_response<S: Into<String>>(msg: S) -> Self {
        ElasticQueryError::NoResponse(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        ElasticQueryError::Query(msg.into())
    }

    /// Create a new invalid configuration error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        ElasticQueryError::InvalidConfig(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        ElasticQueryError::Other(msg.into())
    }
}
