//! Time-limited middleware.

use crate::{handler::Middleware, next::Next};
use futures::future::BoxFuture;
use std::time::Duration;
use switchyard_core::{BoxError, Context, DispatchResult};
use thiserror::Error;

/// Returned when the wrapped middleware does not finish in time.
#[derive(Debug, Clone, Copy, Error)]
#[error("middleware timed out after {0:?}")]
pub struct TimeoutError(pub Duration);

/// Wraps one middleware with a deadline.
///
/// The deadline covers the wrapped middleware and everything it awaits,
/// including its continuation.
#[derive(Debug, Clone)]
pub struct TimeoutMiddleware<M> {
    inner: M,
    duration: Duration,
}

impl<M> TimeoutMiddleware<M> {
    /// Wrap `inner` with a `duration` deadline.
    pub fn new(inner: M, duration: Duration) -> Self {
        Self { inner, duration }
    }
}

impl<M: Middleware> Middleware for TimeoutMiddleware<M> {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult> {
        Box::pin(async move {
            match tokio::time::timeout(self.duration, self.inner.call(ctx, next)).await {
                Ok(result) => result,
                Err(_) => Err(Box::new(TimeoutError(self.duration)) as BoxError),
            }
        })
    }
}
