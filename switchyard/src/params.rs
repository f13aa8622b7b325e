//! # Parameter Callbacks
//!
//! A router can bind callbacks to a capture name. They run after a layer
//! matches and before its handler, in registration order, and usually load
//! or validate whatever the capture refers to.
//!
//! Within one top-level dispatch a callback runs once per distinct value:
//! outcomes are memoized per (router, name) in the request's extensions and
//! replayed when the same value shows up in another layer.
//!
//! The module also holds the `merge_params` rule for nested routers.

use futures::future::BoxFuture;
use std::{
    collections::HashMap,
    ops::{Deref, DerefMut},
    sync::Arc,
};
use switchyard_core::{BoxError, Context, Params, Signal};

/// A callback bound to a capture name.
///
/// Receives the context, the decoded value and the name. It may rewrite
/// `ctx.params[name]`; the rewritten value is what later layers see.
pub trait ParamCallback: Send + Sync + 'static {
    /// Run the callback.
    fn invoke<'a>(
        &'a self,
        ctx: &'a mut Context,
        value: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Signal, BoxError>>;
}

impl<F> ParamCallback for F
where
    F: for<'a> Fn(&'a mut Context, &'a str, &'a str) -> BoxFuture<'a, Result<Signal, BoxError>>
        + Send
        + Sync
        + 'static,
{
    fn invoke<'a>(
        &'a self,
        ctx: &'a mut Context,
        value: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Signal, BoxError>> {
        self(ctx, value, name)
    }
}

/// Shared handle to a callback.
pub type SharedParamCallback = Arc<dyn ParamCallback>;

/// Box a closure as a [`SharedParamCallback`].
///
/// Mostly useful inside [`Router::param_transform`](crate::Router::param_transform),
/// where a replacement callback has to be built by hand.
pub fn param_fn<F>(f: F) -> SharedParamCallback
where
    F: for<'a> Fn(&'a mut Context, &'a str, &'a str) -> BoxFuture<'a, Result<Signal, BoxError>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Merge a child router's params with its parent's.
///
/// Named captures: the child wins. Positional captures: when both sides
/// have index `0`, the child's indices are shifted past the parent's so
/// nothing is overwritten.
pub fn merge_params(mut params: Params, parent: &Params) -> Params {
    if params.contains("0") && parent.contains("0") {
        let offset = parent.positional_len();
        for index in (0..params.positional_len()).rev() {
            if let Some(value) = params.remove(&index.to_string()) {
                params.insert((index + offset).to_string(), value);
            }
        }
    }
    let mut merged = parent.clone();
    merged.extend_from(params);
    merged
}

#[derive(Debug, Clone)]
pub(crate) struct MemoEntry {
    /// Capture value the callbacks ran for.
    pub(crate) matched: String,
    /// `ctx.params[name]` after the callbacks.
    pub(crate) value: String,
    /// Signal that stopped the callbacks, if any.
    pub(crate) signal: Option<Signal>,
}

impl MemoEntry {
    /// Whether `matched` can be answered from this entry.
    pub(crate) fn replays(&self, matched: &str) -> bool {
        self.matched == matched || self.signal.is_some_and(|s| s != Signal::SkipRoute)
    }
}

/// Request-local memo of parameter callback outcomes.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParamMemo {
    entries: HashMap<(u64, String), MemoEntry>,
}

impl ParamMemo {
    /// Install an empty memo unless one is already present.
    ///
    /// Returns `true` if this call installed it and so owns its removal.
    pub(crate) fn install(ctx: &mut Context) -> bool {
        if ctx.extensions.get::<ParamMemo>().is_some() {
            return false;
        }
        ctx.extensions.insert(ParamMemo::default());
        true
    }

    pub(crate) fn discard(ctx: &mut Context) {
        ctx.extensions.remove::<ParamMemo>();
    }

    pub(crate) fn lookup(ctx: &Context, router: u64, name: &str) -> Option<MemoEntry> {
        ctx.extensions
            .get::<ParamMemo>()?
            .entries
            .get(&(router, name.to_string()))
            .cloned()
    }

    pub(crate) fn record(ctx: &mut Context, router: u64, name: &str, entry: MemoEntry) {
        if let Some(memo) = ctx.extensions.get_mut::<ParamMemo>() {
            memo.entries.insert((router, name.to_string()), entry);
        }
    }
}

/// Borrow of the context for the span of one `handle` call.
///
/// The memo installed on entry is removed when the scope drops, including
/// when the dispatch future is dropped before it completes.
pub(crate) struct MemoScope<'c> {
    ctx: &'c mut Context,
    owns_memo: bool,
}

impl<'c> MemoScope<'c> {
    pub(crate) fn enter(ctx: &'c mut Context) -> Self {
        let owns_memo = ParamMemo::install(ctx);
        Self { ctx, owns_memo }
    }
}

impl Deref for MemoScope<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.ctx
    }
}

impl DerefMut for MemoScope<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.ctx
    }
}

impl Drop for MemoScope<'_> {
    fn drop(&mut self) {
        if self.owns_memo {
            ParamMemo::discard(self.ctx);
        }
    }
}
