//! Aggregation model, compiler and result materializer.
//!
//! An [`AggregationRequest`] tree is compiled into the backend's native
//! `aggs` object by [`compiler::compile_aggregation`], and the native result
//! map of a response is turned back into an [`AggregationResult`] tree by
//! [`materializer::materialize`]. Results are addressed by the request's name
//! at every level of the tree.

pub mod compiler;
pub mod materializer;
pub mod request;
pub mod result;

pub use compiler::{NativeAggregation, compile_aggregation, compile_aggregations};
pub use materializer::materialize;
pub use request::{
    AggregationRequest, AggregationScript, IncludeExclude, MaxAggregation, NoOpAggregation,
    OrderCommand, OrderMetric, OrderReference, SignificantTermsAggregation, TermsAggregation,
    TopHitsAggregation,
};
pub use result::{
    AggregationResult, MaxAggregationResult, SignificantTermsAggregationResult,
    SignificantTermsUnit, TermsAggregationResult, TermsAggregationUnit, TopHitsAggregationResult,
};
