//! # Request Context
//!
//! The per-request record a dispatch call reads and mutates.
//!
//! The host runtime creates a [`Context`] for each request, hands it to the
//! top-level router, and owns it again once dispatch resolves. Routers and
//! routes rewrite `url`, `base_url`, `params` and `route` while the request
//! travels through them and restore what they changed on the way out.

use crate::params::Params;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use std::collections::BTreeMap;

/// Parsed query string: key to value.
///
/// When a key repeats, the last occurrence wins.
pub type Query = BTreeMap<String, String>;

/// Per-request mutable state.
#[derive(Debug, Clone)]
pub struct Context {
    /// Request verb.
    pub method: Method,
    /// Current URL, relative to the router presently scanning.
    ///
    /// Mounted middleware sees this with its mount path trimmed off.
    pub url: String,
    /// Query mapping consulted by query conditions.
    pub query: Query,
    /// Captures of the layer currently executing.
    pub params: Params,
    /// The portion of the original path consumed by enclosing mounts.
    pub base_url: String,
    /// URL as first seen by the engine; set once.
    pub original_url: Option<String>,
    /// Path of the route currently dispatching, if any.
    pub route: Option<String>,
    /// Response status, when something answered.
    pub status: Option<StatusCode>,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body, when something answered.
    pub body: Option<String>,
    /// Request-local typed storage shared by the engine and handlers.
    pub extensions: Extensions,
}

impl Context {
    /// Create a context for `method` and `url`, parsing the query string.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let url = url.into();
        let query = parse_query(&url);
        Self {
            method,
            url,
            query,
            params: Params::new(),
            base_url: String::new(),
            original_url: None,
            route: None,
            status: None,
            headers: HeaderMap::new(),
            body: None,
            extensions: Extensions::new(),
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Replace the query mapping.
    pub fn with_query<K, V>(mut self, query: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query = query
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Scheme and host prefix of `url`, or `""` when it is host-relative.
    ///
    /// `http://example.com/a/b?c` yields `http://example.com`.
    pub fn protohost(&self) -> &str {
        protohost(&self.url)
    }

    /// Path portion of `url`: no scheme, host, query or fragment.
    ///
    /// Returns `None` when no path can be determined.
    pub fn pathname(&self) -> Option<&str> {
        let host = protohost(&self.url);
        let rest = &self.url[host.len()..];
        let end = rest.find(['?', '#']).unwrap_or(rest.len());
        match &rest[..end] {
            "" if host.is_empty() => None,
            "" => Some("/"),
            path => Some(path),
        }
    }

    /// Set a response header, replacing earlier values.
    ///
    /// Returns `false` if `value` is not a valid header value.
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> bool {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
                true
            }
            Err(_) => false,
        }
    }

    /// Returns `true` once a status or body has been written.
    pub fn is_answered(&self) -> bool {
        self.status.is_some() || self.body.is_some()
    }
}

fn protohost(url: &str) -> &str {
    if url.is_empty() || url.starts_with('/') {
        return "";
    }
    let path_len = url.find('?').unwrap_or(url.len());
    let head = &url[..path_len];
    match head.find("://") {
        Some(at) => match head[at + 3..].find('/') {
            Some(slash) => &url[..at + 3 + slash],
            None => head,
        },
        None => "",
    }
}

fn parse_query(url: &str) -> Query {
    let Some((_, rest)) = url.split_once('?') else {
        return Query::new();
    };
    let raw = rest.split('#').next().unwrap_or_default();
    url::form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_is_parsed_from_url() {
        let ctx = Context::get("/search?q=rust+lang&page=2&page=3");
        assert_eq!(ctx.query.get("q").map(String::as_str), Some("rust lang"));
        assert_eq!(ctx.query.get("page").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_protohost_only_for_absolute_urls() {
        assert_eq!(Context::get("/a/b").protohost(), "");
        assert_eq!(
            Context::get("http://example.com/a/b?x=1").protohost(),
            "http://example.com"
        );
        assert_eq!(Context::get("/redirect?to=http://x/y").protohost(), "");
    }

    #[test]
    fn test_pathname_strips_host_and_query() {
        assert_eq!(
            Context::get("https://example.com:8080/blog/post?x=1").pathname(),
            Some("/blog/post")
        );
        assert_eq!(Context::get("http://example.com").pathname(), Some("/"));
        assert_eq!(Context::get("/a#frag").pathname(), Some("/a"));
        assert_eq!(Context::get("").pathname(), None);
        assert_eq!(Context::get("?x=1").pathname(), None);
    }

    #[test]
    fn test_set_header_rejects_invalid_value() {
        let mut ctx = Context::get("/");
        assert!(ctx.set_header(http::header::ALLOW, "GET,HEAD"));
        assert!(!ctx.set_header(http::header::ALLOW, "bad\nvalue"));
        assert_eq!(ctx.headers.get(http::header::ALLOW).unwrap(), "GET,HEAD");
    }
}
