use http::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Declarative metadata carried by a `#[route(...)]` annotation.
///
/// `permission` and `ajax` default to `true`; every field the annotation does
/// not set keeps its default. Keys outside the declared shape collect into
/// `extra` untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteAnnotation {
    pub module: Option<String>,
    pub name: Option<String>,
    pub permission: bool,
    pub ajax: bool,
    pub referer: Option<Vec<String>>,
    pub extra: BTreeMap<String, Value>,
}

impl Default for RouteAnnotation {
    fn default() -> Self {
        Self {
            module: None,
            name: None,
            permission: true,
            ajax: true,
            referer: None,
            extra: BTreeMap::new(),
        }
    }
}

impl RouteAnnotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, module: &str) -> Self {
        self.module = Some(module.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_permission(mut self, permission: bool) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_ajax(mut self, ajax: bool) -> Self {
        self.ajax = ajax;
        self
    }

    pub fn with_referers(mut self, referers: &[&str]) -> Self {
        self.referer = Some(referers.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }
}

/// One declared handler parameter.
///
/// The first declared parameter of every handler is reserved for the request
/// context and is excluded from binding. Type hints are informational only;
/// the binder never coerces. Defaults are declared on the registered
/// descriptor, not in source, since the language has no default arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub type_hint: Option<String>,
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_hint: None,
            default: None,
        }
    }

    pub fn hint(mut self, type_hint: &str) -> Self {
        self.type_hint = Some(type_hint.to_string());
        self
    }

    pub fn default_value(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Everything the extractor knows about one discovered route.
#[derive(Debug, Clone)]
pub struct RouteMetadata {
    /// Escape-safe unique id derived from module path and function name.
    pub id: String,
    /// Declared annotation metadata (labels, access policy, extras).
    pub annotation: RouteAnnotation,
    /// HTTP method derived from the function name.
    pub method: Method,
    /// Optional second path segment selecting among same-method handlers.
    pub discriminator: Option<String>,
    /// Handler function name, e.g. `get_detail`.
    pub handler: String,
    /// Package-prefixed module path, e.g. `server.api.user`.
    pub module_path: String,
    /// Canonical request path, discriminator appended when present.
    pub http_path: String,
    /// Source file the route was discovered in.
    pub file: PathBuf,
    /// Whether the file is a package initializer (`mod.rs`).
    pub package: bool,
    /// `http_prefix` of the owning route-root mapping.
    pub root: String,
    /// Declared parameters captured from the function signature.
    pub params: Vec<ParamSpec>,
}
