//! Routing configuration, supplied once by the host at startup and immutable
//! afterward.

use crate::extract::SymbolTable;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One configured route root: a URL prefix backed by a package prefix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteRootMapping {
    pub http_prefix: String,
    pub package_prefix: String,
}

/// Policy for a declared parameter that is absent from the request and has no
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingParamPolicy {
    /// Bind `null`, log a warning, keep going (historical behavior).
    Lenient,
    /// Fail the request with 400 before the handler runs.
    Strict,
}

impl Default for MissingParamPolicy {
    fn default() -> Self {
        MissingParamPolicy::Lenient
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    base_dir: Option<PathBuf>,
    #[serde(default)]
    routes: Vec<RouteRootMapping>,
    #[serde(default)]
    symbols: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    missing_param_policy: Option<MissingParamPolicy>,
}

/// Immutable routing configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Directory route-root package prefixes are resolved against.
    pub base_dir: PathBuf,
    /// Route-root mappings in registration order.
    pub routes: Vec<RouteRootMapping>,
    /// Auxiliary symbols available to annotation arguments.
    pub symbols: SymbolTable,
    pub missing_param_policy: MissingParamPolicy,
}

impl RouterConfig {
    /// Build a configuration from mappings in registration order.
    ///
    /// An empty mapping table is a configuration error: process start must
    /// abort rather than serve an unroutable tree.
    pub fn new(routes: Vec<RouteRootMapping>) -> Result<Self> {
        if routes.is_empty() {
            bail!("route map setting is empty");
        }
        Ok(Self {
            base_dir: PathBuf::from("."),
            routes,
            symbols: SymbolTable::new(),
            missing_param_policy: MissingParamPolicy::default(),
        })
    }

    /// Load a configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let file: ConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("parse config file {}", path.display()))?;

        let mut config = Self::new(file.routes)
            .with_context(|| format!("validate config file {}", path.display()))?;
        if let Some(base_dir) = file.base_dir {
            config.base_dir = base_dir;
        }
        if let Some(policy) = file.missing_param_policy {
            config.missing_param_policy = policy;
        }
        for (name, value) in file.symbols {
            let value = serde_json::to_value(&value)
                .with_context(|| format!("symbol `{name}` is not a literal value"))?;
            config.symbols.register(&name, value);
        }
        Ok(config)
    }

    pub fn with_base_dir(mut self, base_dir: &Path) -> Self {
        self.base_dir = base_dir.to_path_buf();
        self
    }

    pub fn with_missing_param_policy(mut self, policy: MissingParamPolicy) -> Self {
        self.missing_param_policy = policy;
        self
    }

    pub fn with_symbol(mut self, name: &str, value: serde_json::Value) -> Self {
        self.symbols.register(name, value);
        self
    }

    /// Mappings ordered for request-time matching: descending prefix length,
    /// registration order breaking ties.
    pub fn sorted_mappings(&self) -> Vec<RouteRootMapping> {
        let mut mappings = self.routes.clone();
        mappings.sort_by(|a, b| b.http_prefix.len().cmp(&a.http_prefix.len()));
        mappings
    }

    /// Backing directory for one mapping: base_dir joined with the package
    /// prefix as a path.
    pub fn route_root_dir(&self, mapping: &RouteRootMapping) -> PathBuf {
        let mut dir = self.base_dir.clone();
        for part in mapping.package_prefix.split('.') {
            if !part.is_empty() {
                dir.push(part);
            }
        }
        dir
    }
}
