use std::time::Duration;

use tracing::info;

use super::{BeforeOutcome, Middleware, MiddlewareContext};
use crate::request::Request;
use crate::response::HandlerValue;

/// Structured access logging around handler invocation.
pub struct AccessLogMiddleware;

impl Middleware for AccessLogMiddleware {
    fn before(&self, ctx: &MiddlewareContext, req: &Request) -> BeforeOutcome {
        info!(
            request_id = %ctx.request_id,
            method = %req.method(),
            handler = %ctx.handler_name,
            route_id = %ctx.route_id,
            module = ctx.module_label.as_deref().unwrap_or(""),
            "Dispatch start"
        );
        BeforeOutcome::Continue
    }

    fn after(
        &self,
        ctx: &MiddlewareContext,
        _req: &Request,
        value: HandlerValue,
        latency: Duration,
    ) -> HandlerValue {
        info!(
            request_id = %ctx.request_id,
            handler = %ctx.handler_name,
            latency_ms = latency.as_millis() as u64,
            "Dispatch complete"
        );
        value
    }
}
