//! Router configuration.

use serde::{Deserialize, Serialize};
use switchyard_std::PathOptions;

/// Options fixed when a [`Router`](crate::Router) is built.
///
/// Missing fields deserialize to their defaults, so partial documents work:
///
/// ```rust,ignore
/// let options: RouterOptions = serde_json::from_str(r#"{"merge_params": true}"#)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
    /// Match path patterns case-sensitively.
    pub case_sensitive: bool,
    /// Treat a trailing slash on route paths as significant.
    pub strict: bool,
    /// Merge the enclosing router's params into this router's params.
    pub merge_params: bool,
    /// Mount path used by [`Router::mount`](crate::Router::mount) and
    /// [`Router::routes`](crate::Router::routes).
    pub prefix: String,
}

impl RouterOptions {
    /// Set case sensitivity.
    pub fn case_sensitive(mut self, enabled: bool) -> Self {
        self.case_sensitive = enabled;
        self
    }

    /// Set strict trailing-slash matching.
    pub fn strict(mut self, enabled: bool) -> Self {
        self.strict = enabled;
        self
    }

    /// Set parameter merging.
    pub fn merge_params(mut self, enabled: bool) -> Self {
        self.merge_params = enabled;
        self
    }

    /// Set the mount prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub(crate) fn middleware_path(&self) -> PathOptions {
        PathOptions::prefix(self.case_sensitive)
    }

    pub(crate) fn route_path(&self) -> PathOptions {
        PathOptions::exact(self.case_sensitive, self.strict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let options: RouterOptions =
            serde_json::from_str(r#"{"merge_params": true, "prefix": "/api"}"#).unwrap();
        assert_eq!(
            options,
            RouterOptions::default().merge_params(true).prefix("/api")
        );
    }

    #[test]
    fn test_compile_options_follow_router_options() {
        let options = RouterOptions::default().case_sensitive(true).strict(true);
        assert_eq!(options.middleware_path(), PathOptions::prefix(true));
        assert!(options.route_path().strict);
        assert!(options.route_path().end);
        assert!(!options.middleware_path().end);
    }
}
