//! Explicit module/handler registry.
//!
//! In the dispatch model, "loading a module" is a lookup in this registry: a
//! process-wide mapping from dotted module paths to handler descriptors,
//! populated once at startup by the generated registration artifact or by
//! explicit self-registration. The leading request parameter is an interface
//! contract enforced here at registration time, not discovered later.

use crate::extract::{ParamSpec, RouteAnnotation};
use crate::request::Request;
use crate::response::HandlerValue;
use anyhow::{bail, Result};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Plain function handler, the shape emitted into the generated artifact.
pub type RawHandler = fn(&Request, &[Value]) -> Result<HandlerValue>;

/// Boxed handler, allowing closures for self-registered routes.
pub type HandlerFn = Arc<dyn Fn(&Request, &[Value]) -> Result<HandlerValue> + Send + Sync>;

/// One registered function on a module.
///
/// A function without an annotation is registered but never dispatchable;
/// this keeps a same-named plain function from becoming reachable by
/// accident.
#[derive(Clone)]
pub struct RouteFunction {
    pub annotation: Option<RouteAnnotation>,
    pub params: Vec<ParamSpec>,
    pub handler: HandlerFn,
}

/// One registered module: a plain source unit or a package initializer.
///
/// A package initializer (`mod.rs`) registers at the bare package path; the
/// dispatcher binds it when a resolved path denotes the package.
pub struct ModuleHandle {
    path: String,
    package: bool,
    functions: HashMap<String, RouteFunction>,
}

impl std::fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("path", &self.path)
            .field("package", &self.package)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModuleHandle {
    /// A plain source unit, e.g. `server.api.user`.
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            package: false,
            functions: HashMap::new(),
        }
    }

    /// A package initializer addressed at the package path itself.
    pub fn package(path: &str) -> Self {
        Self {
            package: true,
            ..Self::new(path)
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_package(&self) -> bool {
        self.package
    }

    /// Register an annotated, dispatchable route function.
    ///
    /// `params` must describe the full declared signature; the first entry is
    /// the reserved request-context parameter (`req` or `request`).
    pub fn route_fn<F>(
        &mut self,
        name: &str,
        annotation: RouteAnnotation,
        params: Vec<ParamSpec>,
        handler: F,
    ) -> Result<&mut Self>
    where
        F: Fn(&Request, &[Value]) -> Result<HandlerValue> + Send + Sync + 'static,
    {
        let leading = params.first().map(|p| p.name.as_str());
        if !matches!(leading, Some("req") | Some("request")) {
            bail!(
                "fn `{}.{name}`: the first declared parameter must be the request context",
                self.path
            );
        }
        if let Some(first) = params.first() {
            if first.default.is_some() {
                bail!(
                    "fn `{}.{name}`: the request-context parameter cannot carry a default",
                    self.path
                );
            }
        }
        self.functions.insert(
            name.to_string(),
            RouteFunction {
                annotation: Some(annotation),
                params,
                handler: Arc::new(handler),
            },
        );
        Ok(self)
    }

    /// Register a plain function without the route annotation. It shares the
    /// module namespace but can never be dispatched.
    pub fn plain_fn<F>(&mut self, name: &str, handler: F) -> &mut Self
    where
        F: Fn(&Request, &[Value]) -> Result<HandlerValue> + Send + Sync + 'static,
    {
        self.functions.insert(
            name.to_string(),
            RouteFunction {
                annotation: None,
                params: Vec::new(),
                handler: Arc::new(handler),
            },
        );
        self
    }

    pub fn function(&self, name: &str) -> Option<&RouteFunction> {
        self.functions.get(name)
    }
}

/// Process-wide registry of modules, keyed by dotted module path.
///
/// Write-once at startup, read-many afterward; lookups are counted so load
/// behavior stays observable.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: DashMap<String, Arc<ModuleHandle>>,
    lookups: AtomicU64,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry instance, created on first access and alive
    /// for the process lifetime.
    pub fn global() -> &'static ModuleRegistry {
        static GLOBAL: OnceCell<ModuleRegistry> = OnceCell::new();
        GLOBAL.get_or_init(ModuleRegistry::new)
    }

    /// Register a module. An existing module at the same path is replaced.
    pub fn register(&self, module: ModuleHandle) {
        let path = module.path.clone();
        if self.modules.insert(path.clone(), Arc::new(module)).is_some() {
            warn!(module_path = %path, "Replaced existing module registration");
        }
    }

    /// Resolve a module path to its unit, counting the attempt.
    ///
    /// Returns the module and whether it was bound through a package
    /// initializer.
    pub fn unit(&self, path: &str) -> Option<(Arc<ModuleHandle>, bool)> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.modules.get(path).map(|entry| {
            let module = Arc::clone(entry.value());
            let via_package = module.package;
            (module, via_package)
        })
    }

    /// Number of module load attempts since startup.
    pub fn load_count(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::HandlerValue;

    fn noop(_req: &Request, _args: &[Value]) -> Result<HandlerValue> {
        Ok(HandlerValue::None)
    }

    #[test]
    fn registration_enforces_request_context_contract() {
        let mut module = ModuleHandle::new("server.api.user");
        let err = module
            .route_fn(
                "get",
                RouteAnnotation::new(),
                vec![ParamSpec::new("id")],
                noop,
            )
            .unwrap_err();
        assert!(err.to_string().contains("request context"));

        module
            .route_fn(
                "get",
                RouteAnnotation::new(),
                vec![ParamSpec::new("req").hint("&Request")],
                noop,
            )
            .unwrap();
        assert!(module.function("get").is_some());
    }

    #[test]
    fn unit_counts_lookups_and_flags_packages() {
        let registry = ModuleRegistry::new();
        registry.register(ModuleHandle::package("server.api"));
        assert_eq!(registry.load_count(), 0);

        let (module, via_package) = registry.unit("server.api").unwrap();
        assert!(via_package);
        assert_eq!(module.path(), "server.api");
        assert!(registry.unit("server.missing").is_none());
        assert_eq!(registry.load_count(), 2);
    }
}
