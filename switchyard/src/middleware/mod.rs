//! Stock middleware.
//!
//! - [`LoggingMiddleware`] - logs each request once downstream is done
//! - [`TracingMiddleware`] - runs downstream inside a request span
//! - `TimeoutMiddleware` - bounds one middleware's run time (feature `timeout`)

mod logging;
#[cfg(feature = "timeout")]
mod timeout;

pub use logging::{LoggingMiddleware, TracingMiddleware};
#[cfg(feature = "timeout")]
pub use timeout::{TimeoutError, TimeoutMiddleware};
