//! Pluggable middleware around handler invocation.
//!
//! Before-hooks run in registration order and may short-circuit with a
//! pre-built response or an authorization rejection; after-hooks run in the
//! same order and thread the evolving handler result toward the response
//! adapter.

mod access_log;
mod core;

pub use access_log::AccessLogMiddleware;
pub use core::{BeforeOutcome, Middleware, MiddlewareChain, MiddlewareContext};
