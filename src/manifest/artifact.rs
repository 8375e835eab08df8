//! Generated registration artifact.
//!
//! Renders the manifest into a checked-in Rust source file: one import alias
//! per discovered handler plus the ordered `(METHOD, path, handler)` table
//! for the host framework's static routing facility, and a `register_all`
//! function that populates a module registry for dynamic resolution.
//! Rendering is deterministic, so an unchanged tree reproduces the artifact
//! byte for byte.

use crate::extract::{ParamSpec, RouteAnnotation, RouteMetadata};
use anyhow::{Context, Result};
use askama::Template;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

pub struct ImportAlias {
    pub path: String,
    pub alias: String,
}

pub struct RouteRow {
    pub method: String,
    pub path: String,
    pub alias: String,
}

pub struct FnReg {
    pub name: String,
    pub alias: String,
    pub annotation_expr: String,
    pub params_expr: String,
}

pub struct ModuleReg {
    pub path: String,
    pub package: bool,
    pub functions: Vec<FnReg>,
}

#[derive(Template)]
#[template(path = "manifest.rs.txt")]
struct ManifestTemplate {
    imports: Vec<ImportAlias>,
    rows: Vec<RouteRow>,
    modules: Vec<ModuleReg>,
}

fn annotation_expr(annotation: &RouteAnnotation) -> String {
    let mut expr = String::from("RouteAnnotation::new()");
    if let Some(module) = &annotation.module {
        expr.push_str(&format!(".with_module({module:?})"));
    }
    if let Some(name) = &annotation.name {
        expr.push_str(&format!(".with_name({name:?})"));
    }
    if !annotation.permission {
        expr.push_str(".with_permission(false)");
    }
    if !annotation.ajax {
        expr.push_str(".with_ajax(false)");
    }
    if let Some(referers) = &annotation.referer {
        let items: Vec<String> = referers.iter().map(|r| format!("{r:?}")).collect();
        expr.push_str(&format!(".with_referers(&[{}])", items.join(", ")));
    }
    for (key, value) in &annotation.extra {
        expr.push_str(&format!(
            ".with_extra({key:?}, serde_json::json!({value}))"
        ));
    }
    expr
}

fn params_expr(params: &[ParamSpec]) -> String {
    let items: Vec<String> = params
        .iter()
        .map(|p| {
            let mut expr = format!("ParamSpec::new({:?})", p.name);
            if let Some(hint) = &p.type_hint {
                expr.push_str(&format!(".hint({hint:?})"));
            }
            expr
        })
        .collect();
    format!("vec![{}]", items.join(", "))
}

fn import_path(route: &RouteMetadata) -> String {
    let module = route.module_path.replace('.', "::");
    format!("crate::{module}::{}", route.handler)
}

/// Render the artifact source for an ordered manifest.
pub fn render_artifact(routes: &[RouteMetadata]) -> Result<String> {
    let imports: Vec<ImportAlias> = routes
        .iter()
        .map(|r| ImportAlias {
            path: import_path(r),
            alias: r.id.clone(),
        })
        .collect();

    let rows: Vec<RouteRow> = routes
        .iter()
        .map(|r| RouteRow {
            method: r.method.as_str().to_string(),
            path: r.http_path.clone(),
            alias: r.id.clone(),
        })
        .collect();

    let mut modules: Vec<ModuleReg> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for route in routes {
        let at = *index.entry(route.module_path.clone()).or_insert_with(|| {
            modules.push(ModuleReg {
                path: route.module_path.clone(),
                package: route.package,
                functions: Vec::new(),
            });
            modules.len() - 1
        });
        modules[at].functions.push(FnReg {
            name: route.handler.clone(),
            alias: route.id.clone(),
            annotation_expr: annotation_expr(&route.annotation),
            params_expr: params_expr(&route.params),
        });
    }

    let template = ManifestTemplate {
        imports,
        rows,
        modules,
    };
    template.render().context("render manifest artifact")
}

/// Write the artifact to `out`, creating parent directories as needed.
pub fn write_artifact(routes: &[RouteMetadata], out: &Path) -> Result<()> {
    let rendered = render_artifact(routes)?;
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create artifact directory {}", parent.display()))?;
    }
    std::fs::write(out, rendered)
        .with_context(|| format!("write artifact {}", out.display()))?;
    info!(artifact = %out.display(), route_count = routes.len(), "Artifact written");
    Ok(())
}

/// Whether the artifact at `out` is byte-identical to a fresh render.
pub fn check_artifact(routes: &[RouteMetadata], out: &Path) -> Result<bool> {
    let rendered = render_artifact(routes)?;
    let existing = std::fs::read_to_string(out)
        .with_context(|| format!("read artifact {}", out.display()))?;
    Ok(existing == rendered)
}
