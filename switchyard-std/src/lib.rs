//! # switchyard-std
//!
//! Standard implementations of the capabilities the Switchyard engine
//! consumes:
//!
//! - **Path patterns**: [`PathPattern`] compiles pattern strings (or raw
//!   regular expressions) into a [`PathMatcher`](switchyard_core::PathMatcher)
//! - **Query predicates**: [`QueryCondition`] gates a layer on the request's
//!   query mapping

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use switchyard_core;

// Modules
pub mod pattern;
pub mod query;

pub use pattern::{PathOptions, PathPattern, PathSource};
pub use query::{QueryCondition, QueryPredicate, QueryRule};
