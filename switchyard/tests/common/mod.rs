#![allow(dead_code)]

use http::StatusCode;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use switchyard::{BoxError, Context, Middleware, Next, Signal, from_fn};

// ============================================================================
// Handlers
// ============================================================================

/// Answers with the value of param `name` as body.
pub fn echo_param(name: &'static str) -> impl Middleware {
    from_fn(move |ctx, _next| {
        Box::pin(async move {
            ctx.status = Some(StatusCode::OK);
            ctx.body = ctx.params.get(name).map(str::to_owned);
            Ok(())
        })
    })
}

/// Answers with `ctx.url` and `ctx.base_url`, joined by `|`.
pub fn echo_location() -> impl Middleware {
    from_fn(|ctx, _next| {
        Box::pin(async move {
            ctx.body = Some(format!("{}|{}", ctx.url, ctx.base_url));
            Ok(())
        })
    })
}

/// Fails with `message`.
pub fn failing(message: &'static str) -> impl Middleware {
    from_fn(move |_ctx, _next| Box::pin(async move { Err(BoxError::from(message)) }))
}

/// Final continuation writing `404`.
pub fn not_found<'a>() -> Next<'a> {
    Next::fallback(|ctx| {
        Box::pin(async move {
            ctx.status = Some(StatusCode::NOT_FOUND);
            Ok(())
        })
    })
}

// ============================================================================
// Param Callbacks
// ============================================================================

/// Counter shared with a param callback.
#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Dispatch `url` as `GET` and return the finished context.
pub async fn get(router: &switchyard::Router, url: &str) -> Context {
    let mut ctx = Context::get(url);
    router.dispatch(&mut ctx).await.unwrap();
    ctx
}

/// Signal for a value that must be all digits.
pub fn digits_only(value: &str) -> Signal {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        Signal::Continue
    } else {
        Signal::SkipRoute
    }
}
