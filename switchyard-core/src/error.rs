//! Error types for Switchyard.
//!
//! - [`DispatchError`] - Errors raised by the engine during a dispatch call
//! - [`ConfigError`] - Errors raised while registering layers and routes
//!
//! Handler failures are not wrapped: they travel as [`BoxError`] through
//! the continuation chain exactly as the handler produced them.

use http::StatusCode;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The outcome of every dispatch step.
pub type DispatchResult = Result<(), BoxError>;

/// Errors the engine itself produces while dispatching a request.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A path capture could not be percent-decoded.
    #[error("failed to decode param '{value}'")]
    DecodeParam {
        /// The raw capture as it appeared in the path.
        value: String,
    },
}

impl DispatchError {
    /// The HTTP status a host should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::DecodeParam { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

/// Errors raised synchronously while building routing tables.
///
/// These are meant to abort setup; nothing is deferred to dispatch time.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A registration call was given nothing to register.
    #[error("{method}() requires a middleware function but got {rendered}")]
    MissingHandler {
        /// The registration method that was called.
        method: String,
        /// Rendering of the offending argument.
        rendered: String,
    },

    /// A path pattern failed to compile.
    #[error("invalid path pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The pattern as registered.
        pattern: String,
        /// What the compiler rejected.
        #[source]
        source: BoxError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_is_client_error() {
        let err = DispatchError::DecodeParam {
            value: "%zz".to_string(),
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "failed to decode param '%zz'");
    }

    #[test]
    fn test_missing_handler_renders_argument() {
        let err = ConfigError::MissingHandler {
            method: "Router::use_with".to_string(),
            rendered: "[]".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Router::use_with() requires a middleware function but got []"
        );
    }
}
