//! Testing utilities for Switchyard.
//!
//! # Contents
//!
//! - [`RecordingMiddleware`]: records what it saw, then continues
//! - [`CallLog`]: a shared log that hands out labelled middleware
//! - [`Terminal`]: answers the request and stops the chain

use crate::{handler::Middleware, next::Next};
use futures::future::BoxFuture;
use http::StatusCode;
use std::sync::{Arc, Mutex, PoisonError};
use switchyard_core::{Context, DispatchResult, Params, Signal};

// ============================================================================
// Recording Middleware
// ============================================================================

/// What a [`RecordingMiddleware`] saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// `ctx.url` at call time.
    pub url: String,
    /// `ctx.base_url` at call time.
    pub base_url: String,
    /// `ctx.original_url` at call time.
    pub original_url: Option<String>,
    /// `ctx.params` at call time.
    pub params: Params,
}

/// A middleware that records the request state it observes and continues.
///
/// Clones share the same record.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingMiddleware::new();
/// router.use_at("/api", recorder.clone())?;
/// router.dispatch(&mut Context::get("/api/users")).await?;
/// assert_eq!(recorder.observations()[0].url, "/users");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingMiddleware {
    seen: Arc<Mutex<Vec<Observation>>>,
}

impl RecordingMiddleware {
    /// Create a recorder with an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything observed so far, oldest first.
    pub fn observations(&self) -> Vec<Observation> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls.
    pub fn count(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Middleware for RecordingMiddleware {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult> {
        let observation = Observation {
            url: ctx.url.clone(),
            base_url: ctx.base_url.clone(),
            original_url: ctx.original_url.clone(),
            params: ctx.params.clone(),
        };
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observation);
        next.run(ctx)
    }
}

// ============================================================================
// Call Log
// ============================================================================

/// A shared, ordered log of labels.
///
/// Middleware handed out by [`step`](Self::step), [`skip`](Self::skip) and
/// [`stop`](Self::stop) append their label when called, which makes
/// dispatch order easy to assert.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Middleware that logs `label` and continues.
    pub fn step(&self, label: impl Into<String>) -> LogStep {
        self.skip(label, Signal::Continue)
    }

    /// Middleware that logs `label` and resumes with `signal`.
    pub fn skip(&self, label: impl Into<String>, signal: Signal) -> LogStep {
        LogStep {
            log: self.clone(),
            label: label.into(),
            action: Some(signal),
        }
    }

    /// Middleware that logs `label` and ends the request.
    pub fn stop(&self, label: impl Into<String>) -> LogStep {
        LogStep {
            log: self.clone(),
            label: label.into(),
            action: None,
        }
    }

    /// Append `label` directly.
    pub fn push(&self, label: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(label.into());
    }

    /// Logged labels, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Middleware produced by a [`CallLog`].
#[derive(Debug, Clone)]
pub struct LogStep {
    log: CallLog,
    label: String,
    action: Option<Signal>,
}

impl Middleware for LogStep {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult> {
        self.log.push(self.label.as_str());
        match self.action {
            Some(signal) => next.signal(ctx, signal),
            None => Box::pin(async { Ok(()) }),
        }
    }
}

// ============================================================================
// Terminal
// ============================================================================

/// Answers the request with `200` and an optional body, without continuing.
#[derive(Debug, Clone, Default)]
pub struct Terminal {
    body: Option<String>,
}

impl Terminal {
    /// Answer with an empty `200`.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Answer with `200` and `body`.
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
        }
    }
}

impl Middleware for Terminal {
    fn call<'a>(&'a self, ctx: &'a mut Context, _next: Next<'a>) -> BoxFuture<'a, DispatchResult> {
        ctx.status = Some(StatusCode::OK);
        ctx.body = self.body.clone();
        Box::pin(async { Ok(()) })
    }
}
