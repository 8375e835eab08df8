//! Dispatcher core - hot path for request dispatch.
//!
//! Resolves `(entry, name, method)` to a registered handler through the
//! route-root mapping table and a process-lifetime resolved-entry cache, then
//! invokes the handler behind the middleware chain. Every failure on this
//! path terminates in a `Response`; nothing propagates past the dispatcher
//! boundary.

use crate::binder::bind_args;
use crate::config::{MissingParamPolicy, RouteRootMapping, RouterConfig};
use crate::extract::{ParamSpec, RouteAnnotation};
use crate::ids::{route_id, RequestId};
use crate::middleware::{BeforeOutcome, Middleware, MiddlewareChain, MiddlewareContext};
use crate::registry::{HandlerFn, ModuleRegistry};
use crate::request::Request;
use crate::response::{adapt, Response};
use dashmap::DashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Pre-dispatch rewrite hook: may replace `(entry, name)` before matching
/// proceeds (alias normalization owned by an external collaborator).
pub type BeforeDispatchHook =
    Arc<dyn Fn(&Request, &str, Option<&str>) -> (String, Option<String>) + Send + Sync>;

/// Cached outcome of one fully-qualified-name resolution.
///
/// Values are deterministic functions of static module contents, so benign
/// races on first use may recompute but never corrupt.
#[derive(Clone)]
pub struct ResolvedEntry {
    pub module_path: String,
    pub function: String,
    pub route_id: String,
    pub annotation: RouteAnnotation,
    pub params: Arc<[ParamSpec]>,
    pub handler: HandlerFn,
}

enum CacheSlot {
    Resolved(Arc<ResolvedEntry>),
    /// Negative marker: no valid route exists at this name.
    Missing,
}

/// Runtime dispatcher over a route-root mapping table and a module registry.
pub struct Dispatcher {
    /// Mappings sorted by descending prefix length, registration order on
    /// ties. Immutable after construction.
    mappings: Vec<RouteRootMapping>,
    registry: Arc<ModuleRegistry>,
    cache: DashMap<String, CacheSlot>,
    chain: MiddlewareChain,
    before_dispatch: Option<BeforeDispatchHook>,
    policy: MissingParamPolicy,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl Dispatcher {
    /// Build a dispatcher from validated configuration. The mapping table is
    /// fixed here for the process lifetime.
    pub fn new(config: &RouterConfig, registry: Arc<ModuleRegistry>) -> Self {
        let mappings = config.sorted_mappings();
        info!(
            mapping_count = mappings.len(),
            "Route-root mapping table loaded"
        );
        Self {
            mappings,
            registry,
            cache: DashMap::new(),
            chain: MiddlewareChain::new(),
            before_dispatch: None,
            policy: config.missing_param_policy,
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    /// Add middleware; executed in the order added.
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.chain.add(mw);
    }

    /// Install the optional pre-dispatch rewrite hook.
    pub fn set_before_dispatch(&mut self, hook: BeforeDispatchHook) {
        self.before_dispatch = Some(hook);
    }

    /// `(hits, misses)` against the resolved-entry cache.
    pub fn cache_stats(&self) -> (u64, u64) {
        (
            self.cache_hits.load(Ordering::Relaxed),
            self.cache_misses.load(Ordering::Relaxed),
        )
    }

    /// Dispatch a URI of the shape `/{entry}` or `/{entry}/{name}`.
    pub fn dispatch_path(&self, req: &Request, path: &str) -> Response {
        let trimmed = path.trim_matches('/');
        let (entry, name) = match trimmed.split_once('/') {
            Some((entry, name)) => (entry, Some(name)),
            None => (trimmed, None),
        };
        self.dispatch(req, entry, name)
    }

    /// Resolve and invoke the handler for `(entry, name)`.
    pub fn dispatch(&self, req: &Request, entry: &str, name: Option<&str>) -> Response {
        let (entry, name) = match &self.before_dispatch {
            Some(hook) => hook(req, entry, name),
            None => (entry.to_string(), name.map(str::to_string)),
        };
        let name = name.filter(|n| !n.is_empty());

        let method = req.method().as_str().to_ascii_lowercase();
        let function = match &name {
            Some(name) => format!("{method}_{}", name.to_lowercase()),
            None => method,
        };

        let Some(module_path) = self.map_route(&entry) else {
            warn!(entry = %entry, "Cannot find route map for entry");
            return Response::not_found();
        };

        let resolved = match self.resolve(&module_path, &function) {
            Some(resolved) => resolved,
            None => return Response::not_found(),
        };

        self.invoke(req, &resolved)
    }

    /// Longest-prefix mapping match: substitute the matched prefix with its
    /// package prefix, keep the remainder, trim stray separators.
    fn map_route(&self, entry: &str) -> Option<String> {
        let hit = self
            .mappings
            .iter()
            .find(|m| entry.starts_with(&m.http_prefix))?;
        let remainder = &entry[hit.http_prefix.len()..];
        Some(
            format!("{}{}", hit.package_prefix, remainder)
                .trim_matches('.')
                .to_string(),
        )
    }

    /// Look the fully-qualified name up in the cache, consulting the registry
    /// at most once per name.
    fn resolve(&self, module_path: &str, function: &str) -> Option<Arc<ResolvedEntry>> {
        let fullname = format!("{module_path}.{function}");

        if let Some(slot) = self.cache.get(&fullname) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return match slot.value() {
                CacheSlot::Resolved(entry) => Some(Arc::clone(entry)),
                CacheSlot::Missing => None,
            };
        }
        self.cache_misses.fetch_add(1, Ordering::Relaxed);

        // Module load failure is not cached: the registry may still be
        // populated by a later startup phase.
        let Some((module, via_package)) = self.registry.unit(module_path) else {
            warn!(module_path = %module_path, "Load module failed");
            return None;
        };
        if via_package {
            info!(
                module_path = %module_path,
                "Entry is a package, binding its initializer"
            );
        }

        let Some(func) = module.function(function) else {
            debug!(fullname = %fullname, "Function not found on module");
            self.cache.insert(fullname, CacheSlot::Missing);
            return None;
        };

        let Some(annotation) = func.annotation.clone() else {
            warn!(
                fullname = %fullname,
                "Route annotation not found on function, did you forget it?"
            );
            self.cache.insert(fullname, CacheSlot::Missing);
            return None;
        };

        let entry = Arc::new(ResolvedEntry {
            module_path: module_path.to_string(),
            function: function.to_string(),
            route_id: route_id(module_path, function),
            annotation,
            params: Arc::from(func.params.clone()),
            handler: Arc::clone(&func.handler),
        });
        self.cache
            .insert(fullname, CacheSlot::Resolved(Arc::clone(&entry)));
        Some(entry)
    }

    fn invoke(&self, req: &Request, resolved: &ResolvedEntry) -> Response {
        let ctx = MiddlewareContext {
            request_id: RequestId::from_header_or_new(req.header("x-request-id")),
            route_id: resolved.route_id.clone(),
            handler_name: resolved.function.clone(),
            module_label: resolved.annotation.module.clone(),
            name_label: resolved.annotation.name.clone(),
            permission_required: resolved.annotation.permission,
        };

        match self.chain.invoke(&ctx, req) {
            BeforeOutcome::Continue => {}
            BeforeOutcome::Reject => return Response::unauthorized(),
            BeforeOutcome::Respond(resp) => return resp,
        }

        let args = match bind_args(req, &resolved.params, self.policy) {
            Ok(args) => args,
            Err(missing) => {
                return Response::bad_request(&format!("missing parameter `{}`", missing.name))
            }
        };

        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| (resolved.handler)(req, &args)));
        let latency = started.elapsed();

        let value = match outcome {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                error!(
                    request_id = %ctx.request_id,
                    handler = %ctx.handler_name,
                    error = %e,
                    "Handler invocation failed"
                );
                return Response::internal_error(&format!("handler invocation failed: {e}"));
            }
            Err(panic) => {
                error!(
                    request_id = %ctx.request_id,
                    handler = %ctx.handler_name,
                    panic = ?panic,
                    "Handler panicked"
                );
                return Response::internal_error("handler panicked");
            }
        };

        adapt(self.chain.end(&ctx, req, value, latency))
    }
}
