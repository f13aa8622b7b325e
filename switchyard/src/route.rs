//! # Routes
//!
//! A [`Route`] groups the handlers registered for one path, each tagged with
//! a verb (or none, meaning any). Dispatch walks them in registration order
//! and runs those whose verb and query condition fit the request.
//!
//! # Verb Resolution
//!
//! `HEAD` is served by `GET` handlers unless the route declares `HEAD`
//! handlers of its own.

use crate::{handler::Middleware, layer::Layer, next::Next};
use futures::future::BoxFuture;
use http::Method;
use std::sync::Arc;
use switchyard_core::{ConfigError, Context, DispatchResult, Signal};
use switchyard_std::{PathPattern, QueryCondition};

macro_rules! verbs {
    ($($(#[$doc:meta])* $name:ident => $method:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self, handler: impl Middleware) -> &mut Self {
                self.method(Method::$method, handler)
            }
        )*
    };
}

/// Handlers sharing one path.
#[derive(Debug)]
pub struct Route {
    path: String,
    stack: Vec<Layer>,
    methods: Vec<Method>,
    all: bool,
}

impl Route {
    /// Create an empty route for `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stack: Vec::new(),
            methods: Vec::new(),
            all: false,
        }
    }

    /// The path this route was registered for.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns `true` if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    verbs! {
        /// Add a `GET` handler.
        get => GET,
        /// Add a `POST` handler.
        post => POST,
        /// Add a `PUT` handler.
        put => PUT,
        /// Add a `PATCH` handler.
        patch => PATCH,
        /// Add a `DELETE` handler.
        delete => DELETE,
        /// Add a `HEAD` handler.
        head => HEAD,
        /// Add an `OPTIONS` handler.
        options => OPTIONS,
    }

    /// Add a handler for every verb.
    pub fn all(&mut self, handler: impl Middleware) -> &mut Self {
        self.push(None, None, Arc::new(handler))
    }

    /// Add a handler for `method`.
    pub fn method(&mut self, method: Method, handler: impl Middleware) -> &mut Self {
        self.push(Some(method), None, Arc::new(handler))
    }

    /// Add a handler for `method` that also requires `query` to hold.
    pub fn method_when(
        &mut self,
        method: Method,
        query: QueryCondition,
        handler: impl Middleware,
    ) -> &mut Self {
        self.push(Some(method), Some(query), Arc::new(handler))
    }

    /// Add several handlers at once. `None` registers them for every verb.
    ///
    /// Fails if `handlers` is empty.
    pub fn handlers(
        &mut self,
        method: Option<Method>,
        handlers: Vec<Arc<dyn Middleware>>,
    ) -> Result<&mut Self, ConfigError> {
        if handlers.is_empty() {
            let verb = method
                .as_ref()
                .map_or("all".to_string(), |m| m.as_str().to_lowercase());
            return Err(ConfigError::MissingHandler {
                method: format!("Route.{verb}"),
                rendered: "[]".to_string(),
            });
        }
        for handler in handlers {
            self.push(method.clone(), None, handler);
        }
        Ok(self)
    }

    fn push(
        &mut self,
        method: Option<Method>,
        query: Option<QueryCondition>,
        handler: Arc<dyn Middleware>,
    ) -> &mut Self {
        match &method {
            Some(m) if !self.methods.contains(m) => self.methods.push(m.clone()),
            Some(_) => {}
            None => self.all = true,
        }
        self.stack.push(
            Layer::new(PathPattern::root(), handler)
                .with_method(method)
                .with_query(query),
        );
        self
    }

    /// Returns `true` if some handler would run for `method`.
    pub fn handles_method(&self, method: &Method) -> bool {
        self.all || self.methods.contains(&self.effective_method(method))
    }

    /// Declared verbs, sorted and deduplicated, with `HEAD` implied by `GET`.
    pub fn allowed_methods(&self) -> Vec<Method> {
        let mut methods = self.methods.clone();
        if methods.contains(&Method::GET) && !methods.contains(&Method::HEAD) {
            methods.push(Method::HEAD);
        }
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods.dedup();
        methods
    }

    fn effective_method(&self, method: &Method) -> Method {
        if *method == Method::HEAD && !self.methods.contains(&Method::HEAD) {
            Method::GET
        } else {
            method.clone()
        }
    }

    /// Run the handlers that fit the request, then `out`.
    pub fn dispatch<'a>(
        &'a self,
        ctx: &'a mut Context,
        out: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult> {
        if self.stack.is_empty() {
            return out.run(ctx);
        }
        ctx.route = Some(self.path.clone());
        let frame = RouteFrame {
            route: self,
            idx: 0,
            method: self.effective_method(&ctx.method),
            out,
        };
        Box::new(frame).resume(ctx, Signal::Continue)
    }
}

/// A paused walk over a route's handlers.
pub(crate) struct RouteFrame<'a> {
    route: &'a Route,
    idx: usize,
    method: Method,
    out: Next<'a>,
}

impl<'a> RouteFrame<'a> {
    pub(crate) fn resume<'b>(
        self: Box<Self>,
        ctx: &'b mut Context,
        signal: Signal,
    ) -> BoxFuture<'b, DispatchResult>
    where
        'a: 'b,
    {
        Box::pin(self.walk(ctx, signal))
    }

    async fn walk<'b>(mut self: Box<Self>, ctx: &'b mut Context, signal: Signal) -> DispatchResult
    where
        'a: 'b,
    {
        match signal {
            Signal::Continue => {}
            Signal::SkipRoute => return self.out.run(ctx).await,
            Signal::SkipRouter => return self.out.skip_router(ctx).await,
        }

        let route = self.route;
        while let Some(layer) = route.stack.get(self.idx) {
            self.idx += 1;
            if layer.method().is_some_and(|m| *m != self.method) || !layer.query_matches(ctx) {
                continue;
            }
            return layer.handle(ctx, Next::route(self)).await;
        }
        self.out.run(ctx).await
    }
}
