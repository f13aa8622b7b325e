//! # Continuations
//!
//! Every handler receives a [`Next`]: the rest of the dispatch, packaged as a
//! value. Calling it resumes the enclosing Route walk or Router scan; not
//! calling it ends the request there.
//!
//! ```rust,ignore
//! let audit = from_fn(|ctx, next| {
//!     Box::pin(async move {
//!         let result = next.run(ctx).await;
//!         if result.is_err() {
//!             ctx.status = Some(StatusCode::INTERNAL_SERVER_ERROR);
//!         }
//!         result
//!     })
//! });
//! ```
//!
//! A continuation is consumed by the call, so it resumes dispatch at most once.

use crate::{route::RouteFrame, router::RouterFrame};
use futures::future::{self, BoxFuture};
use std::fmt;
use switchyard_core::{Context, DispatchResult, Signal};

type Fallback<'a> =
    Box<dyn for<'c> FnOnce(&'c mut Context) -> BoxFuture<'c, DispatchResult> + Send + 'a>;

enum Step<'a> {
    End,
    Fallback(Fallback<'a>),
    Router(Box<RouterFrame<'a>>),
    Route(Box<RouteFrame<'a>>),
}

/// The remainder of a dispatch.
pub struct Next<'a> {
    step: Step<'a>,
}

impl<'a> Next<'a> {
    /// A continuation that does nothing and succeeds.
    pub fn end() -> Self {
        Self { step: Step::End }
    }

    /// A continuation that hands the request to `f` once the engine is done
    /// with it.
    ///
    /// The signal is not forwarded: whatever skipped out of the engine has
    /// already been honoured by the time `f` runs.
    pub fn fallback<F>(f: F) -> Self
    where
        F: for<'c> FnOnce(&'c mut Context) -> BoxFuture<'c, DispatchResult> + Send + 'a,
    {
        Self {
            step: Step::Fallback(Box::new(f)),
        }
    }

    pub(crate) fn router(frame: Box<RouterFrame<'a>>) -> Self {
        Self {
            step: Step::Router(frame),
        }
    }

    pub(crate) fn route(frame: Box<RouteFrame<'a>>) -> Self {
        Self {
            step: Step::Route(frame),
        }
    }

    /// Continue with the next matching layer.
    pub fn run<'b>(self, ctx: &'b mut Context) -> BoxFuture<'b, DispatchResult>
    where
        'a: 'b,
    {
        self.signal(ctx, Signal::Continue)
    }

    /// Abandon the remaining layers of the current route.
    pub fn skip_route<'b>(self, ctx: &'b mut Context) -> BoxFuture<'b, DispatchResult>
    where
        'a: 'b,
    {
        self.signal(ctx, Signal::SkipRoute)
    }

    /// Abandon the remaining layers of the current router.
    pub fn skip_router<'b>(self, ctx: &'b mut Context) -> BoxFuture<'b, DispatchResult>
    where
        'a: 'b,
    {
        self.signal(ctx, Signal::SkipRouter)
    }

    /// Resume dispatch with an explicit signal.
    pub fn signal<'b>(self, ctx: &'b mut Context, signal: Signal) -> BoxFuture<'b, DispatchResult>
    where
        'a: 'b,
    {
        match self.step {
            Step::End => Box::pin(future::ready(Ok(()))),
            Step::Fallback(f) => f(ctx),
            Step::Router(frame) => frame.resume(ctx, signal),
            Step::Route(frame) => frame.resume(ctx, signal),
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match &self.step {
            Step::End => "end",
            Step::Fallback(_) => "fallback",
            Step::Router(_) => "router",
            Step::Route(_) => "route",
        };
        f.debug_struct("Next").field("step", &step).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[tokio::test]
    async fn test_end_succeeds_without_touching_context() {
        let mut ctx = Context::get("/");
        Next::end().skip_router(&mut ctx).await.unwrap();
        assert!(!ctx.is_answered());
    }

    #[tokio::test]
    async fn test_fallback_runs_once_whatever_the_signal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let next = Next::fallback(move |ctx| {
            seen.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                ctx.body = Some("fallback".to_string());
                Ok(())
            })
        });

        let mut ctx = Context::get("/");
        next.skip_route(&mut ctx).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.body.as_deref(), Some("fallback"));
    }

    #[test]
    fn test_debug_names_the_step() {
        assert_eq!(format!("{:?}", Next::end()), r#"Next { step: "end" }"#);
    }
}
