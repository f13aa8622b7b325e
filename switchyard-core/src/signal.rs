//! Control-flow signal passed to a continuation.

/// Tells the engine how to proceed when a handler hands control back.
///
/// # Propagation
///
/// - Inside a Route, [`Signal::SkipRoute`] abandons the remaining handlers of
///   that Route and resumes the enclosing Router's scan.
/// - [`Signal::SkipRouter`] abandons everything left in the enclosing Router
///   and resumes whatever continuation that Router was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signal {
    /// Advance to the next matching handler.
    #[default]
    Continue,
    /// Skip the remaining handlers of the current Route.
    SkipRoute,
    /// Skip the remaining layers of the current Router.
    SkipRouter,
}

impl Signal {
    /// Returns `true` for anything other than [`Signal::Continue`].
    pub const fn is_skip(self) -> bool {
        !matches!(self, Signal::Continue)
    }
}
