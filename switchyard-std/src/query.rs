//! Query-string predicates attached to layers.
//!
//! A [`QueryCondition`] is an ordered list of `(key, rule)` pairs. It holds
//! when every rule accepts the request's value for its key; rules are
//! evaluated in declaration order and evaluation stops at the first miss.

use regex::Regex;
use serde_json::Value;
use std::{fmt, sync::Arc};
use switchyard_core::Context;

/// Custom query predicate: receives the actual value (if the key is present)
/// and the request context.
pub type QueryPredicate = Arc<dyn Fn(Option<&str>, &Context) -> bool + Send + Sync>;

/// How a single query value is compared.
#[derive(Clone)]
pub enum QueryRule {
    /// Exact string equality.
    Equals(String),
    /// Regular expression test.
    Pattern(Regex),
    /// Membership in a list of strings.
    OneOf(Vec<String>),
    /// Custom predicate; the only rule consulted for a missing key.
    Predicate(QueryPredicate),
    /// The actual value parsed as JSON must equal this value.
    Literal(Value),
}

impl QueryRule {
    /// Classify a declared JSON value the way a condition table would:
    /// strings compare exactly, arrays of strings by membership, anything
    /// else as a structured literal.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => QueryRule::Equals(s),
            Value::Array(items) if items.iter().all(Value::is_string) => QueryRule::OneOf(
                items
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            other => QueryRule::Literal(other),
        }
    }

    /// Test one actual value.
    pub fn test(&self, actual: Option<&str>, ctx: &Context) -> bool {
        match (self, actual) {
            (QueryRule::Predicate(predicate), actual) => predicate(actual, ctx),
            (_, None) => false,
            (QueryRule::Equals(expected), Some(actual)) => expected == actual,
            (QueryRule::Pattern(regex), Some(actual)) => regex.is_match(actual),
            (QueryRule::OneOf(allowed), Some(actual)) => allowed.iter().any(|v| v == actual),
            (QueryRule::Literal(expected), Some(actual)) => {
                serde_json::from_str::<Value>(actual).is_ok_and(|parsed| parsed == *expected)
            }
        }
    }
}

impl fmt::Debug for QueryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryRule::Equals(v) => f.debug_tuple("Equals").field(v).finish(),
            QueryRule::Pattern(r) => f.debug_tuple("Pattern").field(&r.as_str()).finish(),
            QueryRule::OneOf(v) => f.debug_tuple("OneOf").field(v).finish(),
            QueryRule::Predicate(_) => f.write_str("Predicate(..)"),
            QueryRule::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
        }
    }
}

/// Ordered conjunction of query rules.
#[derive(Debug, Clone, Default)]
pub struct QueryCondition {
    rules: Vec<(String, QueryRule)>,
}

impl QueryCondition {
    /// Create an empty (always true) condition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule for `key`.
    pub fn rule(mut self, key: impl Into<String>, rule: QueryRule) -> Self {
        self.rules.push((key.into(), rule));
        self
    }

    /// `key` must equal `value`.
    pub fn equals(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.rule(key, QueryRule::Equals(value.into()))
    }

    /// `key` must match `regex`.
    pub fn matches(self, key: impl Into<String>, regex: Regex) -> Self {
        self.rule(key, QueryRule::Pattern(regex))
    }

    /// `key` must be one of `values`.
    pub fn one_of<I, S>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule(
            key,
            QueryRule::OneOf(values.into_iter().map(Into::into).collect()),
        )
    }

    /// `predicate` decides.
    pub fn predicate<F>(self, key: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Option<&str>, &Context) -> bool + Send + Sync + 'static,
    {
        self.rule(key, QueryRule::Predicate(Arc::new(predicate)))
    }

    /// `key`, parsed as JSON, must equal `value`.
    pub fn literal(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.rule(key, QueryRule::Literal(value.into()))
    }

    /// Build a condition from a JSON object, classifying each value with
    /// [`QueryRule::from_value`]. Rules keep the object's key order.
    /// Returns `None` for anything but an object.
    pub fn from_json(value: Value) -> Option<Self> {
        let Value::Object(map) = value else {
            return None;
        };
        Some(
            map.into_iter()
                .fold(Self::new(), |cond, (k, v)| cond.rule(k, QueryRule::from_value(v))),
        )
    }

    /// The keys the rules test, in evaluation order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(key, _)| key.as_str())
    }

    /// Returns `true` if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate against the request's query mapping.
    pub fn test(&self, ctx: &Context) -> bool {
        self.rules
            .iter()
            .all(|(key, rule)| rule.test(ctx.query.get(key).map(String::as_str), ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx(query: &[(&str, &str)]) -> Context {
        Context::get("/").with_query(query.iter().copied())
    }

    #[test]
    fn test_empty_condition_is_vacuously_true() {
        assert!(QueryCondition::new().test(&ctx(&[])));
    }

    #[test]
    fn test_each_comparator() {
        let req = ctx(&[("state", "started"), ("id", "a12"), ("n", "5"), ("tag", "b")]);

        assert!(QueryCondition::new().equals("state", "started").test(&req));
        assert!(!QueryCondition::new().equals("state", "stopped").test(&req));

        let re = Regex::new(r"^a\d+$").unwrap();
        assert!(QueryCondition::new().matches("id", re).test(&req));

        assert!(QueryCondition::new().one_of("tag", ["a", "b"]).test(&req));
        assert!(!QueryCondition::new().one_of("tag", ["c"]).test(&req));

        assert!(QueryCondition::new().literal("n", 5).test(&req));
        assert!(!QueryCondition::new().literal("n", 6).test(&req));
        assert!(!QueryCondition::new().literal("state", true).test(&req));

        assert!(
            QueryCondition::new()
                .predicate("n", |v, _| v.is_some_and(|v| v.len() == 1))
                .test(&req)
        );
    }

    #[test]
    fn test_missing_key_only_reaches_predicates() {
        let req = ctx(&[]);
        assert!(!QueryCondition::new().equals("state", "").test(&req));
        assert!(!QueryCondition::new().literal("n", json!(null)).test(&req));
        assert!(
            QueryCondition::new()
                .predicate("state", |v, _| v.is_none())
                .test(&req)
        );
    }

    #[test]
    fn test_short_circuits_in_declared_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let cond = QueryCondition::new()
            .equals("state", "started")
            .predicate("other", move |_, _| {
                seen.fetch_add(1, Ordering::SeqCst);
                true
            });

        assert!(!cond.test(&ctx(&[("state", "idle")])));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(cond.test(&ctx(&[("state", "started")])));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_json_classifies_values() {
        let cond = QueryCondition::from_json(json!({
            "state": "started",
            "tag": ["a", "b"],
            "page": 2,
            "flags": {"x": true}
        }))
        .unwrap();

        let req = ctx(&[
            ("state", "started"),
            ("tag", "a"),
            ("page", "2"),
            ("flags", r#"{"x":true}"#),
        ]);
        assert!(cond.test(&req));

        let req = ctx(&[
            ("state", "started"),
            ("tag", "a"),
            ("page", "two"),
            ("flags", r#"{"x":true}"#),
        ]);
        assert!(!cond.test(&req));
        assert!(QueryCondition::from_json(json!("nope")).is_none());
    }

    #[test]
    fn test_from_json_keeps_document_order() {
        let cond = QueryCondition::from_json(
            serde_json::from_str(r#"{"zone": "eu", "action": "read", "mode": "fast"}"#).unwrap(),
        )
        .unwrap();
        assert_eq!(cond.keys().collect::<Vec<_>>(), ["zone", "action", "mode"]);
    }
}
