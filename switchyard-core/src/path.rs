//! # Path Matching Capability
//!
//! The engine never parses path patterns itself. It relies on a compiled
//! matcher that answers one question: does this path start with (or equal)
//! the pattern, and what did it capture?
//!
//! The standard implementation lives in `switchyard-std`; anything that
//! implements [`PathMatcher`] can be plugged into a layer instead.

use std::fmt::Debug;

/// A capture slot declared by a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathKey {
    /// Capture name; positional captures are named `"0"`, `"1"`, ...
    pub name: String,
    /// Whether the pattern allows the capture to be absent.
    pub optional: bool,
}

impl PathKey {
    /// A required named capture.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    /// A positional capture at `index`.
    pub fn positional(index: usize) -> Self {
        Self {
            name: index.to_string(),
            optional: false,
        }
    }
}

/// The result of a successful [`PathMatcher::test`].
///
/// Owned and immutable: it belongs to the request that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMatch {
    /// Byte offset where the match starts; `0` for anchored patterns.
    pub offset: usize,
    /// Byte length of the matched portion of the tested path.
    pub matched_len: usize,
    /// Raw (still percent-encoded) capture values, aligned with
    /// [`PathMatcher::keys`]. `None` marks an optional capture that did not
    /// participate.
    pub captures: Vec<Option<String>>,
}

/// A compiled path pattern.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be used as a path matcher",
    label = "missing `PathMatcher` implementation",
    note = "Compile patterns with `switchyard_std::PathPattern` or implement `PathMatcher`."
)]
pub trait PathMatcher: Debug + Send + Sync + 'static {
    /// Test `path` against the pattern.
    fn test(&self, path: &str) -> Option<PathMatch>;

    /// The capture slots, in capture order.
    fn keys(&self) -> &[PathKey];
}

impl PathMatch {
    /// The matched portion of `path`, which must be the string tested.
    pub fn matched<'p>(&self, path: &'p str) -> &'p str {
        path.get(self.offset..self.offset + self.matched_len)
            .unwrap_or_default()
    }
}
