use crate::ids::RequestId;
use crate::request::Request;
use crate::response::{HandlerValue, Response};
use std::sync::Arc;
use std::time::Duration;

/// Per-request context handed to every middleware hook.
///
/// Owned by one in-flight request and discarded once the response is
/// produced. The request and the evolving end result travel as explicit hook
/// arguments.
#[derive(Debug, Clone)]
pub struct MiddlewareContext {
    pub request_id: RequestId,
    /// Escape-safe route id of the resolved handler.
    pub route_id: String,
    pub handler_name: String,
    pub module_label: Option<String>,
    pub name_label: Option<String>,
    pub permission_required: bool,
}

/// What a before-hook decided.
pub enum BeforeOutcome {
    /// Keep going down the chain.
    Continue,
    /// Stop the chain; the request is unauthorized.
    Reject,
    /// Stop the chain and return this response immediately.
    Respond(Response),
}

pub trait Middleware: Send + Sync {
    /// Runs before handler invocation, in registration order.
    fn before(&self, _ctx: &MiddlewareContext, _req: &Request) -> BeforeOutcome {
        BeforeOutcome::Continue
    }

    /// Runs after handler invocation, in registration order, threading the
    /// evolving result value.
    fn after(
        &self,
        _ctx: &MiddlewareContext,
        _req: &Request,
        value: HandlerValue,
        _latency: Duration,
    ) -> HandlerValue {
        value
    }
}

/// Ordered middleware chain, registered once at process start.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run every before-hook in registration order; the first hook that does
    /// not continue stops the chain.
    pub fn invoke(&self, ctx: &MiddlewareContext, req: &Request) -> BeforeOutcome {
        for mw in &self.middlewares {
            match mw.before(ctx, req) {
                BeforeOutcome::Continue => {}
                stop => return stop,
            }
        }
        BeforeOutcome::Continue
    }

    /// Run every after-hook in registration order, each receiving the prior
    /// hook's value.
    pub fn end(
        &self,
        ctx: &MiddlewareContext,
        req: &Request,
        mut value: HandlerValue,
        latency: Duration,
    ) -> HandlerValue {
        for mw in &self.middlewares {
            value = mw.after(ctx, req, value, latency);
        }
        value
    }
}
