//! # switchyard - Ordered Request Dispatch
//!
//! `switchyard` routes a request through an ordered table of middleware and
//! routes. Tables nest: a [`Router`] is itself a [`Middleware`], mounted under
//! a path prefix that is trimmed while it runs. Path captures can carry
//! callbacks that run once per value, and every handler controls how far the
//! request travels through its continuation ([`Next`]).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchyard::{Context, Router, Signal, from_fn};
//!
//! let mut users = Router::new();
//! users.param("id", |_ctx, id, _name| {
//!     let numeric = id.bytes().all(|b| b.is_ascii_digit());
//!     Box::pin(async move {
//!         Ok(if numeric { Signal::Continue } else { Signal::SkipRoute })
//!     })
//! });
//! users.get("/:id", from_fn(|ctx, _next| {
//!     Box::pin(async move {
//!         ctx.body = ctx.params.get("id").map(str::to_owned);
//!         Ok(())
//!     })
//! }))?;
//!
//! let mut app = Router::new();
//! app.use_at("/users", users)?;
//!
//! let mut ctx = Context::get("/users/42");
//! app.dispatch(&mut ctx).await?;
//! assert_eq!(ctx.body.as_deref(), Some("42"));
//! ```
//!
//! ## Control Flow
//!
//! | call                     | effect                                          |
//! |--------------------------|-------------------------------------------------|
//! | `next.run(ctx)`          | next matching handler                           |
//! | `next.skip_route(ctx)`   | leave the current route, resume the router scan |
//! | `next.skip_router(ctx)`  | leave the current router entirely               |
//! | not calling `next`       | the request ends here                           |
//!
//! ## Features
//!
//! - `tracing`: log statements and [`TracingMiddleware`] spans
//! - `timeout`: `TimeoutMiddleware`, backed by tokio

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod handler;
mod layer;
pub mod middleware;
mod next;
mod options;
mod params;
mod route;
mod router;
pub mod testing;

// Engine
pub use handler::{FromFn, Middleware, from_fn};
pub use layer::{Layer, LayerMatch};
pub use next::Next;
pub use options::RouterOptions;
pub use params::{ParamCallback, SharedParamCallback, merge_params, param_fn};
pub use route::Route;
pub use router::Router;

// Stock middleware
pub use middleware::{LoggingMiddleware, TracingMiddleware};
#[cfg(feature = "timeout")]
pub use middleware::{TimeoutError, TimeoutMiddleware};

// Request model and errors
pub use switchyard_core::{
    BoxError, ConfigError, Context, DispatchError, DispatchResult, Params, PathKey, PathMatch,
    PathMatcher, Query, Signal,
};

// Standard path and query matching
pub use regex::Regex;
pub use switchyard_std::{
    PathOptions, PathPattern, PathSource, QueryCondition, QueryPredicate, QueryRule,
};
