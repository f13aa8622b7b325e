mod common;

use common::{Calls, digits_only, echo_param, get};
use http::StatusCode;
use regex::Regex;
use std::sync::Arc;
use switchyard::{
    BoxError, Context, DispatchError, Router, RouterOptions, Signal, param_fn,
    testing::{CallLog, RecordingMiddleware},
};

#[tokio::test]
async fn test_validating_param_runs_once() {
    let calls = Calls::new();
    let seen = calls.clone();
    let mut router = Router::new();
    router.param("id", move |_ctx, value, _name| {
        seen.hit();
        let signal = digits_only(value);
        Box::pin(async move { Ok(signal) })
    });
    router.get("/foo/:id/bar", echo_param("id")).unwrap();

    let ctx = get(&router, "/foo/123/bar").await;
    assert_eq!(ctx.body.as_deref(), Some("123"));
    assert_eq!(calls.get(), 1);
}

#[tokio::test]
async fn test_param_memoized_across_sibling_layers() {
    let calls = Calls::new();
    let seen = calls.clone();
    let recorder = RecordingMiddleware::new();
    let mut router = Router::new();
    router.param("id", move |_ctx, _value, _name| {
        seen.hit();
        Box::pin(async { Ok(Signal::Continue) })
    });
    router.use_at("/user/:id", recorder.clone()).unwrap();
    router.use_at("/user/:id", recorder.clone()).unwrap();
    router.get("/user/:id/edit", echo_param("id")).unwrap();

    let ctx = get(&router, "/user/5/edit").await;
    assert_eq!(ctx.body.as_deref(), Some("5"));
    assert_eq!(recorder.count(), 2);
    assert_eq!(calls.get(), 1);

    // A new top-level dispatch starts with a fresh memo.
    get(&router, "/user/5/edit").await;
    assert_eq!(calls.get(), 2);
}

#[tokio::test]
async fn test_param_rewrite_is_replayed() {
    let calls = Calls::new();
    let seen = calls.clone();
    let recorder = RecordingMiddleware::new();
    let mut router = Router::new();
    router.param("name", move |ctx, value, name| {
        seen.hit();
        Box::pin(async move {
            ctx.params.insert(name, value.to_uppercase());
            Ok(Signal::Continue)
        })
    });
    router.use_at("/:name", recorder.clone()).unwrap();
    router.get("/:name", echo_param("name")).unwrap();

    let ctx = get(&router, "/alice").await;
    assert_eq!(recorder.observations()[0].params.get("name"), Some("ALICE"));
    assert_eq!(ctx.body.as_deref(), Some("ALICE"));
    assert_eq!(calls.get(), 1);
}

#[tokio::test]
async fn test_skip_route_from_param_tries_later_layers() {
    let mut router = Router::new();
    router.param("id", |_ctx, value, _name| {
        let signal = digits_only(value);
        Box::pin(async move { Ok(signal) })
    });
    router.get("/:id", echo_param("id")).unwrap();
    router.get("/:slug", echo_param("slug")).unwrap();

    assert_eq!(get(&router, "/42").await.body.as_deref(), Some("42"));
    assert_eq!(get(&router, "/abc").await.body.as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_skip_router_from_param_leaves_router() {
    let log = CallLog::new();
    let mut child = Router::new();
    child.param("id", |_ctx, _value, _name| {
        Box::pin(async { Ok(Signal::SkipRouter) })
    });
    child.get("/:id", log.stop("child")).unwrap();
    child.use_middleware(log.stop("child-tail"));

    let mut app = Router::new();
    app.mount(child).unwrap();
    app.use_middleware(log.stop("app"));

    get(&app, "/7").await;
    assert_eq!(log.entries(), ["app"]);
}

#[tokio::test]
async fn test_param_error_propagates() {
    let mut router = Router::new();
    router.param("id", |_ctx, _value, _name| {
        Box::pin(async { Err(BoxError::from("no such record")) })
    });
    router.get("/:id", echo_param("id")).unwrap();

    let err = router
        .dispatch(&mut Context::get("/9"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "no such record");
}

#[tokio::test]
async fn test_callbacks_run_in_order_and_stop_on_signal() {
    let log = CallLog::new();
    let (first, second, third) = (log.clone(), log.clone(), log.clone());
    let mut router = Router::new();
    router
        .param("id", move |_ctx, _value, _name| {
            first.push("first");
            Box::pin(async { Ok(Signal::Continue) })
        })
        .param("id", move |_ctx, _value, _name| {
            second.push("second");
            Box::pin(async { Ok(Signal::SkipRoute) })
        })
        .param("id", move |_ctx, _value, _name| {
            third.push("third");
            Box::pin(async { Ok(Signal::Continue) })
        });
    router.get("/:id", log.stop("handler")).unwrap();

    get(&router, "/1").await;
    assert_eq!(log.entries(), ["first", "second"]);
}

#[tokio::test]
async fn test_param_transform_decorates_later_callbacks() {
    let log = CallLog::new();
    let audit = log.clone();
    let mut router = Router::new();
    router.param_transform(move |name, callback| {
        let audit = audit.clone();
        let name = name.to_string();
        Some(param_fn(move |ctx, value, param| {
            audit.push(format!("{name}={value}"));
            let callback = Arc::clone(&callback);
            Box::pin(async move { callback.invoke(ctx, value, param).await })
        }))
    });
    router.param("id", |_ctx, _value, _name| {
        Box::pin(async { Ok(Signal::Continue) })
    });
    router.get("/:id", echo_param("id")).unwrap();

    let ctx = get(&router, "/3").await;
    assert_eq!(ctx.body.as_deref(), Some("3"));
    assert_eq!(log.entries(), ["id=3"]);
}

#[tokio::test]
async fn test_merge_params_from_parent() {
    let mut child = Router::with_options(RouterOptions::default().merge_params(true));
    child.get("/posts/:pid", echo_param("uid")).unwrap();
    let mut isolated = Router::new();
    isolated.get("/posts/:pid", echo_param("uid")).unwrap();

    let mut app = Router::new();
    app.use_at("/user/:uid", child).unwrap();
    let ctx = get(&app, "/user/7/posts/1").await;
    assert_eq!(ctx.body.as_deref(), Some("7"));

    let mut app = Router::new();
    app.use_at("/user/:uid", isolated).unwrap();
    let ctx = get(&app, "/user/7/posts/1").await;
    assert_eq!(ctx.status, Some(StatusCode::OK));
    assert_eq!(ctx.body, None);
}

#[tokio::test]
async fn test_merge_params_renumbers_positional() {
    let recorder = RecordingMiddleware::new();
    let mut child = Router::with_options(RouterOptions::default().merge_params(true));
    child
        .use_at(Regex::new(r"^/(\d+)").unwrap(), recorder.clone())
        .unwrap();

    let mut app = Router::new();
    app.use_at(Regex::new(r"^/(\w+)").unwrap(), child).unwrap();
    get(&app, "/a/5").await;

    let seen = recorder.observations();
    let params = &seen[0].params;
    assert_eq!(params.positional(0), Some("a"));
    assert_eq!(params.positional(1), Some("5"));
}

#[tokio::test]
async fn test_params_restored_after_nested_router() {
    let recorder = RecordingMiddleware::new();
    let mut child = Router::new();
    child.use_middleware(recorder.clone());

    let mut app = Router::new();
    app.use_at("/user/:uid", child).unwrap();
    let ctx = get(&app, "/user/7").await;

    assert_eq!(recorder.observations()[0].params.get("uid"), None);
    assert!(ctx.params.is_empty());
    assert_eq!(ctx.url, "/user/7");
    assert_eq!(ctx.base_url, "");
}

#[tokio::test]
async fn test_malformed_escape_is_bad_request() {
    let mut router = Router::new();
    router.get("/files/:name", echo_param("name")).unwrap();

    let err = router
        .dispatch(&mut Context::get("/files/%E0%A4%A"))
        .await
        .unwrap_err();
    let err = err.downcast_ref::<DispatchError>().unwrap();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.to_string(), "failed to decode param '%E0%A4%A'");
}
