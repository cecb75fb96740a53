//! # elastic-query
//!
//! Backend-agnostic search requests compiled to the Elasticsearch query DSL.
//!
//! ## Features
//!
//! - A typed query tree (match, term, range, bool, nested, function score, ...)
//! - Terms, significant terms, max and top hits aggregations
//! - Batched execution with per-request error flags
//! - Deep pagination through scroll or point-in-time with `search_after`,
//!   behind a lazy document cursor that always releases its server context
//! - An in-memory transport for tests and offline simulation
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use elastic_query::component::ElasticSearchComponent;
//! use elastic_query::config::ElasticQueryConfig;
//! use elastic_query::query::{Query, TermQuery};
//! use elastic_query::request::SearchServerRequest;
//! use elastic_query::transport::InMemoryTransport;
//! use serde_json::json;
//!
//! let transport = Arc::new(InMemoryTransport::new());
//! transport.add_document("books", "1", json!({"lang": "rust"})).unwrap();
//!
//! let component = ElasticSearchComponent::new(transport, ElasticQueryConfig::default()).unwrap();
//! let request = SearchServerRequest::new("books", Query::Term(TermQuery::new("lang", "rust")));
//! let mut responses = component.execute(&[request]).unwrap();
//!
//! assert_eq!(responses[0].num_found(), 1);
//! assert_eq!(responses[0].document_results().count(), 1);
//! ```

pub mod aggregation;
pub mod cli;
pub mod component;
pub mod config;
pub mod error;
pub mod query;
pub mod request;
pub mod response;
pub mod transport;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
