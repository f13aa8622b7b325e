//! Request logging.

use crate::{handler::Middleware, next::Next};
use futures::future::BoxFuture;
use switchyard_core::{Context, DispatchResult};

#[cfg(feature = "tracing")]
use tracing::Instrument;

/// Logs method, URL and outcome of every request passing through.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult> {
        Box::pin(async move {
            #[cfg(feature = "tracing")]
            let (method, url) = (ctx.method.clone(), ctx.url.clone());

            let result = next.run(ctx).await;

            #[cfg(feature = "tracing")]
            match &result {
                Ok(()) => tracing::info!(%method, %url, status = ?ctx.status, "request dispatched"),
                Err(error) => tracing::warn!(%method, %url, %error, "request failed"),
            }
            result
        })
    }
}

/// Runs everything downstream inside an `info` span named `dispatch`.
///
/// Without the `tracing` feature this only passes the request on.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult> {
        #[cfg(feature = "tracing")]
        {
            let span = tracing::info_span!("dispatch", method = %ctx.method, url = %ctx.url);
            Box::pin(next.run(ctx).instrument(span))
        }
        #[cfg(not(feature = "tracing"))]
        {
            next.run(ctx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Router, testing::Terminal};

    #[tokio::test]
    async fn test_logging_passes_result_through() {
        let mut router = Router::new();
        router.use_middleware(TracingMiddleware);
        router.use_middleware(LoggingMiddleware);
        router.get("/", Terminal::with_body("ok")).unwrap();

        let mut ctx = Context::get("/");
        router.dispatch(&mut ctx).await.unwrap();
        assert_eq!(ctx.body.as_deref(), Some("ok"));
    }
}
