//! # Middleware
//!
//! The one handler shape the engine knows: take the request context and the
//! rest of the dispatch, return a future. Plain middleware, route handlers
//! and mounted routers all look like this from the outside.
//!
//! # Closures
//!
//! Closures are adapted with [`from_fn`]. The explicit `Box::pin` is what
//! lets the closure borrow the context across `.await`:
//!
//! ```rust,ignore
//! let hello = from_fn(|ctx, _next| {
//!     Box::pin(async move {
//!         ctx.body = Some("hello".into());
//!         Ok(())
//!     })
//! });
//! ```

use crate::next::Next;
use futures::future::BoxFuture;
use std::{fmt, sync::Arc};
use switchyard_core::{Context, DispatchResult};

/// A request handler.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a middleware",
    label = "missing `Middleware` implementation",
    note = "Wrap closures with `switchyard::from_fn(|ctx, next| Box::pin(async move {{ .. }}))`."
)]
pub trait Middleware: Send + Sync + 'static {
    /// Handle the request, calling `next` to pass it on.
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult>;
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult> {
        (**self).call(ctx, next)
    }
}

impl<M: Middleware + ?Sized> Middleware for Box<M> {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult> {
        (**self).call(ctx, next)
    }
}

/// Middleware built from a closure. See [`from_fn`].
#[derive(Clone)]
pub struct FromFn<F> {
    f: F,
}

/// Adapt a closure into a [`Middleware`].
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, DispatchResult>
        + Send
        + Sync
        + 'static,
{
    FromFn { f }
}

impl<F> Middleware for FromFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, DispatchResult>
        + Send
        + Sync
        + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult> {
        (self.f)(ctx, next)
    }
}

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FromFn(..)")
    }
}
