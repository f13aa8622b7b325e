//! # Layers
//!
//! A [`Layer`] is one entry of a dispatch table: a path matcher, an optional
//! verb tag and query condition, and what to run on a match (a middleware or
//! an owned [`Route`]).
//!
//! Matching returns a fresh [`LayerMatch`] instead of writing into the
//! layer, so one table serves any number of concurrent requests.

use crate::{handler::Middleware, next::Next, route::Route};
use futures::future::BoxFuture;
use http::Method;
use percent_encoding::percent_decode_str;
use std::{fmt, sync::Arc};
use switchyard_core::{Context, DispatchError, DispatchResult, Params, PathKey, PathMatcher};
use switchyard_std::QueryCondition;

pub(crate) enum LayerKind {
    Handler(Arc<dyn Middleware>),
    Route(Route),
}

/// What a successful [`Layer::matches`] produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerMatch {
    /// Decoded captures keyed by name.
    pub params: Params,
    /// The matched portion of the path.
    pub path: String,
}

/// One path(+query) matching unit.
pub struct Layer {
    matcher: Box<dyn PathMatcher>,
    method: Option<Method>,
    query: Option<QueryCondition>,
    kind: LayerKind,
}

impl Layer {
    /// A layer running `handler`.
    pub fn new(matcher: impl PathMatcher, handler: Arc<dyn Middleware>) -> Self {
        Self {
            matcher: Box::new(matcher),
            method: None,
            query: None,
            kind: LayerKind::Handler(handler),
        }
    }

    pub(crate) fn for_route(matcher: impl PathMatcher, route: Route) -> Self {
        Self {
            matcher: Box::new(matcher),
            method: None,
            query: None,
            kind: LayerKind::Route(route),
        }
    }

    /// Tag the layer with a verb. `None` means any verb.
    pub fn with_method(mut self, method: Option<Method>) -> Self {
        self.method = method;
        self
    }

    /// Attach a query condition.
    pub fn with_query(mut self, query: Option<QueryCondition>) -> Self {
        self.query = query.filter(|q| !q.is_empty());
        self
    }

    /// The verb tag, if any.
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Capture slots of the path matcher.
    pub fn keys(&self) -> &[PathKey] {
        self.matcher.keys()
    }

    /// The owned route, for route layers.
    pub fn route(&self) -> Option<&Route> {
        match &self.kind {
            LayerKind::Route(route) => Some(route),
            LayerKind::Handler(_) => None,
        }
    }

    pub(crate) fn kind_mut(&mut self) -> &mut LayerKind {
        &mut self.kind
    }

    /// Returns `true` if the query condition holds (or there is none).
    pub fn query_matches(&self, ctx: &Context) -> bool {
        self.query.as_ref().is_none_or(|q| q.test(ctx))
    }

    /// Match `path` and the request's query.
    ///
    /// Captures are percent-decoded; a malformed escape is a client error.
    pub fn matches(&self, path: &str, ctx: &Context) -> Result<Option<LayerMatch>, DispatchError> {
        let Some(found) = self.matcher.test(path) else {
            return Ok(None);
        };
        if !self.query_matches(ctx) {
            return Ok(None);
        }

        let mut params = Params::new();
        for (key, raw) in self.matcher.keys().iter().zip(&found.captures) {
            if let Some(raw) = raw {
                params.insert(key.name.as_str(), decode_param(raw)?);
            }
        }
        Ok(Some(LayerMatch {
            params,
            path: found.matched(path).to_string(),
        }))
    }

    /// Run what this layer wraps.
    pub fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult> {
        match &self.kind {
            LayerKind::Handler(handler) => handler.call(ctx, next),
            LayerKind::Route(route) => route.dispatch(ctx, next),
        }
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Layer");
        s.field("matcher", &self.matcher);
        if let Some(method) = &self.method {
            s.field("method", method);
        }
        if let Some(query) = &self.query {
            s.field("query", query);
        }
        match &self.kind {
            LayerKind::Handler(_) => s.field("kind", &"handler"),
            LayerKind::Route(route) => s.field("route", &route.path()),
        };
        s.finish()
    }
}

fn decode_param(raw: &str) -> Result<String, DispatchError> {
    let malformed = raw.match_indices('%').any(|(at, _)| {
        !raw.get(at + 1..at + 3)
            .is_some_and(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
    });
    let decoded = if malformed {
        None
    } else {
        percent_decode_str(raw).decode_utf8().ok()
    };
    match decoded {
        Some(value) => Ok(value.into_owned()),
        None => {
            #[cfg(feature = "tracing")]
            tracing::debug!(value = raw, "param decode failed");
            Err(DispatchError::DecodeParam {
                value: raw.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::from_fn;
    use switchyard_std::{PathOptions, PathPattern};

    fn noop() -> Arc<dyn Middleware> {
        Arc::new(from_fn(|ctx, next| next.run(ctx)))
    }

    fn layer(pattern: &str, options: PathOptions) -> Layer {
        Layer::new(PathPattern::compile(pattern, options).unwrap(), noop())
    }

    #[test]
    fn test_decode_param() {
        assert_eq!(decode_param("caf%C3%A9").unwrap(), "café");
        assert_eq!(decode_param("a+b").unwrap(), "a+b");
        assert_eq!(decode_param("").unwrap(), "");
        assert!(decode_param("100%").is_err());
        assert!(decode_param("%zz").is_err());
        assert!(decode_param("%FF").is_err());
    }

    #[test]
    fn test_match_decodes_captures_and_reports_prefix() {
        let layer = layer("/users/:id", PathOptions::prefix(false));
        let ctx = Context::get("/users/a%20b/posts");

        let found = layer.matches("/users/a%20b/posts", &ctx).unwrap().unwrap();
        assert_eq!(found.params.get("id"), Some("a b"));
        assert_eq!(found.path, "/users/a%20b");
    }

    #[test]
    fn test_match_surfaces_decode_failure() {
        let layer = layer("/users/:id", PathOptions::exact(false, false));
        let ctx = Context::get("/users/%E0%A4%A");

        let err = layer.matches("/users/%E0%A4%A", &ctx).unwrap_err();
        assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_optional_capture_left_out() {
        let layer = layer("/files/:name?", PathOptions::exact(false, false));
        let ctx = Context::get("/files");

        let found = layer.matches("/files", &ctx).unwrap().unwrap();
        assert!(!found.params.contains("name"));
    }

    #[test]
    fn test_query_condition_gates_match() {
        let layer = layer("/", PathOptions::exact(false, false))
            .with_query(Some(QueryCondition::new().equals("state", "started")));

        let hit = Context::get("/?state=started");
        let miss = Context::get("/?state=idle");
        assert!(layer.matches("/", &hit).unwrap().is_some());
        assert!(layer.matches("/", &miss).unwrap().is_none());
    }

    #[test]
    fn test_empty_query_condition_is_dropped() {
        let layer = layer("/", PathOptions::prefix(false)).with_query(Some(QueryCondition::new()));
        assert!(!format!("{layer:?}").contains("query"));
    }
}
