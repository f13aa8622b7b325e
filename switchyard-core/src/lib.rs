//! # switchyard-core
//!
//! Core request model for the Switchyard dispatch engine.
//!
//! This crate has minimal dependencies and is meant to be imported by
//! handler libraries and path-matcher implementations that don't need the
//! full engine.
//!
//! # Contents
//!
//! - [`Context`] - the per-request record a dispatch call mutates
//! - [`Params`] - captured path parameters
//! - [`Signal`] - the control-flow value threaded through continuations
//! - [`PathMatcher`] - the capability a compiled path pattern exposes
//!
//! # Error Types
//!
//! - [`DispatchError`] - errors raised by the engine while dispatching
//! - [`ConfigError`] - errors raised while building routing tables
//! - [`BoxError`] - the boxed error handlers propagate

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod context;
mod error;
mod params;
mod path;
mod signal;

// Re-exports
pub use context::{Context, Query};
pub use error::{BoxError, ConfigError, DispatchError, DispatchResult};
pub use params::Params;
pub use path::{PathKey, PathMatch, PathMatcher};
pub use signal::Signal;
