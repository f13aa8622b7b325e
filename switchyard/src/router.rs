//! # Routers
//!
//! A [`Router`] is an ordered dispatch table. Each request is scanned
//! against its layers from the top; every match runs, and a handler that
//! calls its continuation resumes the scan right after the layer that
//! matched. Earlier layers are never revisited.
//!
//! # Mounting
//!
//! Middleware layers match path prefixes. While a mounted handler runs,
//! the matched prefix is cut from `ctx.url` and appended to `ctx.base_url`;
//! both are put back when the handler continues. A [`Router`] is itself a
//! [`Middleware`], so routers nest.
//!
//! # Absolute URLs
//!
//! A URL carrying a scheme and host (`http://host/path`) is matched on its
//! path only. Trimming keeps the scheme and host in front.
//!
//! # Automatic `OPTIONS`
//!
//! An `OPTIONS` request that no layer answers gets a `200` with an `Allow`
//! header listing the verbs of every route whose path matched.

use crate::{
    handler::Middleware,
    layer::{Layer, LayerKind, LayerMatch},
    next::Next,
    options::RouterOptions,
    params::{MemoEntry, MemoScope, ParamMemo, SharedParamCallback, merge_params, param_fn},
    route::Route,
};
use futures::future::BoxFuture;
use http::{Method, StatusCode, header};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use switchyard_core::{BoxError, ConfigError, Context, DispatchResult, Params, Signal};
use switchyard_std::{PathPattern, PathSource, QueryCondition};

static NEXT_ROUTER_ID: AtomicU64 = AtomicU64::new(1);

type ParamTransform =
    Arc<dyn Fn(&str, SharedParamCallback) -> Option<SharedParamCallback> + Send + Sync>;

macro_rules! verbs {
    ($($(#[$doc:meta])* $name:ident => $method:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(
                &mut self,
                path: impl Into<PathSource>,
                handler: impl Middleware,
            ) -> Result<&mut Self, ConfigError> {
                self.on(Method::$method, path, handler)
            }
        )*
    };
}

/// An ordered dispatch table.
pub struct Router {
    id: u64,
    options: RouterOptions,
    layers: Vec<Layer>,
    params: HashMap<String, Vec<SharedParamCallback>>,
    transforms: Vec<ParamTransform>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut params: Vec<&str> = self.params.keys().map(String::as_str).collect();
        params.sort_unstable();
        f.debug_struct("Router")
            .field("options", &self.options)
            .field("layers", &self.layers)
            .field("params", &params)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Create a router with default options.
    pub fn new() -> Self {
        Self::with_options(RouterOptions::default())
    }

    /// Create a router with `options`.
    pub fn with_options(options: RouterOptions) -> Self {
        Self {
            id: NEXT_ROUTER_ID.fetch_add(1, Ordering::Relaxed),
            options,
            layers: Vec::new(),
            params: HashMap::new(),
            transforms: Vec::new(),
        }
    }

    /// The options this router was built with.
    pub fn config(&self) -> &RouterOptions {
        &self.options
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Registered layers, in dispatch order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    // ---------------------------------------------------------------------
    // Middleware
    // ---------------------------------------------------------------------

    /// Add middleware that sees every request.
    pub fn use_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.layers
            .push(Layer::new(PathPattern::root(), Arc::new(middleware)));
        self
    }

    /// Add middleware under a path prefix.
    pub fn use_at(
        &mut self,
        path: impl Into<PathSource>,
        middleware: impl Middleware,
    ) -> Result<&mut Self, ConfigError> {
        self.use_with(path, None, vec![Arc::new(middleware)])
    }

    /// Add several middleware under a path prefix, optionally gated by a
    /// query condition.
    ///
    /// Fails if `handlers` is empty or the path does not compile.
    pub fn use_with(
        &mut self,
        path: impl Into<PathSource>,
        query: Option<QueryCondition>,
        handlers: Vec<Arc<dyn Middleware>>,
    ) -> Result<&mut Self, ConfigError> {
        if handlers.is_empty() {
            return Err(ConfigError::MissingHandler {
                method: "Router.use".to_string(),
                rendered: "[]".to_string(),
            });
        }
        let matcher = PathPattern::compile(path, self.options.middleware_path())?;
        for handler in handlers {
            self.layers
                .push(Layer::new(matcher.clone(), handler).with_query(query.clone()));
        }
        Ok(self)
    }

    /// Mount `router` at its configured prefix (or `/`).
    pub fn mount(&mut self, router: Router) -> Result<&mut Self, ConfigError> {
        let prefix = match router.options.prefix.as_str() {
            "" => "/".to_string(),
            prefix => prefix.to_string(),
        };
        self.use_at(prefix, router)
    }

    // ---------------------------------------------------------------------
    // Routes
    // ---------------------------------------------------------------------

    /// Add a route for `path` and return it for handler registration.
    pub fn route(&mut self, path: impl Into<PathSource>) -> Result<&mut Route, ConfigError> {
        self.route_with(path, None)
    }

    /// Add a route for `path` that also requires `query` to hold.
    pub fn route_with(
        &mut self,
        path: impl Into<PathSource>,
        query: Option<QueryCondition>,
    ) -> Result<&mut Route, ConfigError> {
        let source = path.into();
        let route = Route::new(source.to_string());
        let matcher = PathPattern::compile(source, self.options.route_path())?;
        self.layers
            .push(Layer::for_route(matcher, route).with_query(query));
        match self.layers.last_mut().map(Layer::kind_mut) {
            Some(LayerKind::Route(route)) => Ok(route),
            _ => unreachable!("a route layer was just pushed"),
        }
    }

    verbs! {
        /// Route `GET` requests for `path` to `handler`.
        get => GET,
        /// Route `POST` requests for `path` to `handler`.
        post => POST,
        /// Route `PUT` requests for `path` to `handler`.
        put => PUT,
        /// Route `PATCH` requests for `path` to `handler`.
        patch => PATCH,
        /// Route `DELETE` requests for `path` to `handler`.
        delete => DELETE,
        /// Route `HEAD` requests for `path` to `handler`.
        head => HEAD,
        /// Route `OPTIONS` requests for `path` to `handler`.
        options => OPTIONS,
    }

    /// Route every verb for `path` to `handler`.
    pub fn all(
        &mut self,
        path: impl Into<PathSource>,
        handler: impl Middleware,
    ) -> Result<&mut Self, ConfigError> {
        self.route(path)?.all(handler);
        Ok(self)
    }

    /// Route `method` requests for `path` to `handler`.
    pub fn on(
        &mut self,
        method: Method,
        path: impl Into<PathSource>,
        handler: impl Middleware,
    ) -> Result<&mut Self, ConfigError> {
        self.route(path)?.method(method, handler);
        Ok(self)
    }

    /// Like [`on`](Self::on), gated by a query condition.
    pub fn on_with(
        &mut self,
        method: Method,
        path: impl Into<PathSource>,
        query: QueryCondition,
        handler: impl Middleware,
    ) -> Result<&mut Self, ConfigError> {
        self.route_with(path, Some(query))?.method(method, handler);
        Ok(self)
    }

    // ---------------------------------------------------------------------
    // Parameters
    // ---------------------------------------------------------------------

    /// Bind a callback to the capture `name`.
    ///
    /// ```rust,ignore
    /// router.param("id", |ctx, value, _name| {
    ///     let valid = value.bytes().all(|b| b.is_ascii_digit());
    ///     Box::pin(async move {
    ///         if valid { Ok(Signal::Continue) } else { Ok(Signal::SkipRoute) }
    ///     })
    /// });
    /// ```
    pub fn param<F>(&mut self, name: impl Into<String>, callback: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context, &'a str, &'a str) -> BoxFuture<'a, Result<Signal, BoxError>>
            + Send
            + Sync
            + 'static,
    {
        self.param_callback(name, param_fn(callback))
    }

    /// Bind an already shared callback to the capture `name`.
    pub fn param_callback(
        &mut self,
        name: impl Into<String>,
        callback: SharedParamCallback,
    ) -> &mut Self {
        let name = name.into();
        let callback = self
            .transforms
            .iter()
            .fold(callback, |cb, transform| {
                transform(&name, Arc::clone(&cb)).unwrap_or(cb)
            });
        self.params.entry(name).or_default().push(callback);
        self
    }

    /// Install a decorator applied to every callback registered afterwards.
    ///
    /// Returning `Some` replaces the callback; `None` keeps it.
    pub fn param_transform<T>(&mut self, transform: T) -> &mut Self
    where
        T: Fn(&str, SharedParamCallback) -> Option<SharedParamCallback> + Send + Sync + 'static,
    {
        self.transforms.push(Arc::new(transform));
        self
    }

    // ---------------------------------------------------------------------
    // Export
    // ---------------------------------------------------------------------

    /// Export the router as a single middleware.
    ///
    /// With `mountable = false` and a non-empty prefix, the router is
    /// wrapped in an anonymous parent that mounts it at that prefix, so
    /// callers that do not trim paths themselves still get it right.
    pub fn routes(self, mountable: bool) -> Result<Arc<dyn Middleware>, ConfigError> {
        if mountable || self.options.prefix.is_empty() {
            return Ok(Arc::new(self));
        }
        let mut parent = Router::with_options(RouterOptions {
            prefix: String::new(),
            merge_params: false,
            ..self.options.clone()
        });
        parent.mount(self)?;
        Ok(Arc::new(parent))
    }

    // ---------------------------------------------------------------------
    // Dispatch
    // ---------------------------------------------------------------------

    /// Dispatch `ctx`, calling `out` once this router is done with it.
    pub fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        out: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult> {
        Box::pin(async move {
            let mut scope = MemoScope::enter(ctx);
            let frame = Box::new(RouterFrame::enter(self, &mut scope, out));
            frame.resume(&mut scope, Signal::Continue).await
        })
    }

    /// Top-level dispatch with nothing after this router.
    pub async fn dispatch(&self, ctx: &mut Context) -> DispatchResult {
        self.handle(ctx, Next::end()).await
    }

    /// Run the callbacks bound to `layer`'s captures.
    async fn process_params(&self, layer: &Layer, ctx: &mut Context) -> Result<Signal, BoxError> {
        if self.params.is_empty() {
            return Ok(Signal::Continue);
        }

        for key in layer.keys() {
            let name = key.name.as_str();
            let Some(callbacks) = self.params.get(name) else {
                continue;
            };
            let Some(value) = ctx.params.get(name).map(str::to_owned) else {
                continue;
            };

            if let Some(prev) = ParamMemo::lookup(ctx, self.id, name)
                && prev.replays(&value)
            {
                ctx.params.insert(name, prev.value);
                match prev.signal {
                    Some(signal) => return Ok(signal),
                    None => continue,
                }
            }

            let mut entry = MemoEntry {
                matched: value.clone(),
                value: value.clone(),
                signal: None,
            };
            for callback in callbacks {
                let signal = callback.invoke(ctx, &value, name).await?;
                entry.value = ctx.params.get(name).unwrap_or(&value).to_owned();
                if signal.is_skip() {
                    entry.signal = Some(signal);
                    break;
                }
            }

            let signal = entry.signal;
            ParamMemo::record(ctx, self.id, name, entry);
            if let Some(signal) = signal {
                return Ok(signal);
            }
        }
        Ok(Signal::Continue)
    }
}

impl Middleware for Router {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult> {
        self.handle(ctx, next)
    }
}

/// A paused scan over a router's layers.
pub(crate) struct RouterFrame<'a> {
    router: &'a Router,
    idx: usize,
    protohost: String,
    parent_url: String,
    removed: String,
    slash_added: bool,
    saved_base_url: String,
    saved_params: Params,
    allow: Vec<Method>,
    out: Next<'a>,
}

impl<'a> RouterFrame<'a> {
    fn enter(router: &'a Router, ctx: &mut Context, out: Next<'a>) -> Self {
        if ctx.original_url.is_none() {
            ctx.original_url = Some(ctx.url.clone());
        }
        Self {
            router,
            idx: 0,
            protohost: ctx.protohost().to_string(),
            parent_url: ctx.base_url.clone(),
            removed: String::new(),
            slash_added: false,
            saved_base_url: ctx.base_url.clone(),
            saved_params: ctx.params.clone(),
            allow: Vec::new(),
            out,
        }
    }

    pub(crate) fn resume<'b>(
        self: Box<Self>,
        ctx: &'b mut Context,
        signal: Signal,
    ) -> BoxFuture<'b, DispatchResult>
    where
        'a: 'b,
    {
        Box::pin(self.scan(ctx, signal))
    }

    async fn scan<'b>(mut self: Box<Self>, ctx: &'b mut Context, signal: Signal) -> DispatchResult
    where
        'a: 'b,
    {
        self.restore_url(ctx);
        if signal == Signal::SkipRouter {
            return self.finish(ctx).await;
        }

        let router = self.router;
        loop {
            let Some(path) = ctx.pathname().map(str::to_owned) else {
                return self.finish(ctx).await;
            };
            let Some((layer, found)) = self.next_match(ctx, &path)? else {
                return self.finish(ctx).await;
            };

            ctx.params = if router.options.merge_params {
                merge_params(found.params, &self.saved_params)
            } else {
                found.params
            };

            match router.process_params(layer, ctx).await? {
                Signal::Continue => {}
                Signal::SkipRoute => continue,
                Signal::SkipRouter => return self.finish(ctx).await,
            }

            if layer.route().is_none() && !self.trim_prefix(ctx, &path, &found.path) {
                continue;
            }
            return layer.handle(ctx, Next::router(self)).await;
        }
    }

    /// Scan forward for the next layer matching `path`.
    fn next_match(
        &mut self,
        ctx: &Context,
        path: &str,
    ) -> Result<Option<(&'a Layer, LayerMatch)>, BoxError> {
        let router: &'a Router = self.router;
        let layers = &router.layers;
        while let Some(layer) = layers.get(self.idx) {
            self.idx += 1;
            let Some(found) = layer.matches(path, ctx)? else {
                continue;
            };

            if let Some(route) = layer.route()
                && !route.handles_method(&ctx.method)
            {
                if ctx.method == Method::OPTIONS {
                    for method in route.allowed_methods() {
                        if !self.allow.contains(&method) {
                            self.allow.push(method);
                        }
                    }
                }
                continue;
            }

            #[cfg(feature = "tracing")]
            tracing::trace!(index = self.idx - 1, ?layer, path, "layer matched");
            return Ok(Some((layer, found)));
        }
        Ok(None)
    }

    /// Cut the matched prefix from `ctx.url` before running middleware.
    ///
    /// Returns `false` if the prefix ends mid-segment (`/foo` against
    /// `/foobar`), which rejects the match.
    fn trim_prefix(&mut self, ctx: &mut Context, path: &str, matched: &str) -> bool {
        if matched.is_empty() {
            return true;
        }
        if !path.starts_with(matched) {
            return false;
        }
        match path[matched.len()..].chars().next() {
            None | Some('/') | Some('.') => {}
            Some(_) => return false,
        }

        let host = self.protohost.len();
        let rest = ctx.url.get(host + matched.len()..).unwrap_or_default();
        ctx.url = format!("{}{}", self.protohost, rest);
        if host == 0 && !ctx.url.starts_with('/') {
            ctx.url.insert(0, '/');
            self.slash_added = true;
        }
        self.removed = matched.to_string();

        let base = format!("{}{}", self.parent_url, self.removed);
        ctx.base_url = base.strip_suffix('/').unwrap_or(&base).to_string();
        true
    }

    /// Undo what [`trim_prefix`](Self::trim_prefix) did.
    fn restore_url(&mut self, ctx: &mut Context) {
        if self.slash_added {
            if ctx.url.starts_with('/') {
                ctx.url.remove(0);
            }
            self.slash_added = false;
        }
        if !self.removed.is_empty() {
            let rest = ctx.url.get(self.protohost.len()..).unwrap_or_default();
            ctx.url = format!("{}{}{}", self.protohost, self.removed, rest);
            ctx.base_url = self.parent_url.clone();
            self.removed.clear();
        }
    }

    /// Restore the router's entry state and leave it.
    async fn finish<'b>(self: Box<Self>, ctx: &'b mut Context) -> DispatchResult
    where
        'a: 'b,
    {
        let RouterFrame {
            saved_base_url,
            saved_params,
            allow,
            out,
            ..
        } = *self;
        ctx.base_url = saved_base_url;
        ctx.params = saved_params;

        if ctx.method == Method::OPTIONS && !allow.is_empty() {
            let allow = allow
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(",");
            #[cfg(feature = "tracing")]
            tracing::debug!(url = %ctx.url, allow = %allow, "answering OPTIONS");
            ctx.status = Some(StatusCode::OK);
            ctx.set_header(header::ALLOW, &allow);
            ctx.body = Some(allow);
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(url = %ctx.url, "router exhausted");
        out.run(ctx).await
    }
}
