//! Structural text recognition of annotated handler functions.
//!
//! One candidate file is scanned as text, not parsed: a `#[route(...)]`
//! annotation immediately preceding a `fn` item is a match, with blank lines,
//! comments, and other attributes tolerated in between. The nearest following
//! function definition always terminates the search for an annotation. The
//! same recognition rule backs both the manifest build and route validation.

use super::annotation::{parse_annotation_args, SymbolTable};
use super::types::{ParamSpec, RouteAnnotation};
use anyhow::{bail, Context, Result};
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::warn;

static ROUTE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ms)^[ \t]*#\[route\((.*?)\)\][ \t]*$(.*?)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?fn[ \t]+([A-Za-z_][A-Za-z0-9_]*)[ \t]*\(([^)]*)\)",
    )
    .expect("route recognition pattern")
});

/// Fixed vocabulary of method tokens a handler name may start with.
pub const METHOD_VOCABULARY: [&str; 7] =
    ["get", "post", "put", "delete", "patch", "option", "connect"];

fn method_for(token: &str) -> Option<Method> {
    match token {
        "get" => Some(Method::GET),
        "post" => Some(Method::POST),
        "put" => Some(Method::PUT),
        "delete" => Some(Method::DELETE),
        "patch" => Some(Method::PATCH),
        "option" => Some(Method::OPTIONS),
        "connect" => Some(Method::CONNECT),
        _ => None,
    }
}

/// Split a handler function name into HTTP method and optional discriminator
/// on the first underscore. Names outside the vocabulary yield `None`.
pub fn split_method(fn_name: &str) -> Option<(Method, Option<String>)> {
    let (head, rest) = match fn_name.split_once('_') {
        Some((head, rest)) => (head, Some(rest)),
        None => (fn_name, None),
    };
    let method = method_for(head)?;
    let discriminator = rest.filter(|r| !r.is_empty()).map(str::to_string);
    Some((method, discriminator))
}

/// One annotated handler function recognized in a source file.
#[derive(Debug, Clone)]
pub struct HandlerMatch {
    pub function: String,
    pub method: Method,
    pub discriminator: Option<String>,
    pub annotation: RouteAnnotation,
    pub params: Vec<ParamSpec>,
}

/// Scan one file's source text for annotated handlers.
///
/// Functions whose names fall outside the method vocabulary are skipped; a
/// file without any match contributes no routes. A malformed or unresolvable
/// annotation on a recognized handler aborts the scan.
pub fn scan_source(source: &str, symbols: &SymbolTable) -> Result<Vec<HandlerMatch>> {
    let mut matches = Vec::new();
    for caps in ROUTE_PATTERN.captures_iter(source) {
        let raw_args = caps.get(1).map_or("", |m| m.as_str());
        let function = caps.get(3).map_or("", |m| m.as_str()).to_string();
        let raw_params = caps.get(4).map_or("", |m| m.as_str());

        let Some((method, discriminator)) = split_method(&function) else {
            warn!(
                function = %function,
                "Annotated function name is outside the method vocabulary, skipping"
            );
            continue;
        };

        let annotation = parse_annotation_args(raw_args, symbols)
            .with_context(|| format!("resolve route annotation on fn `{function}`"))?;

        matches.push(HandlerMatch {
            method,
            discriminator,
            annotation,
            params: parse_params(raw_params),
            function,
        });
    }
    Ok(matches)
}

/// The recognition rule on its own: does `function` in this source carry the
/// route annotation?
pub fn is_route_fn(source: &str, function: &str) -> bool {
    ROUTE_PATTERN
        .captures_iter(source)
        .any(|caps| caps.get(3).map_or("", |m| m.as_str()) == function)
}

/// Capture parameter names and type hints from a textual `fn` parameter list.
fn parse_params(raw: &str) -> Vec<ParamSpec> {
    let mut params = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    let mut pieces = Vec::new();
    for c in raw.chars() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                pieces.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        pieces.push(current);
    }
    for piece in pieces {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let (name, hint) = match piece.split_once(':') {
            Some((name, hint)) => (name.trim(), Some(hint.trim())),
            None => (piece, None),
        };
        let name = name.trim_start_matches("mut ").trim();
        let mut spec = ParamSpec::new(name);
        if let Some(hint) = hint {
            spec = spec.hint(hint);
        }
        params.push(spec);
    }
    params
}

/// Where a source file sits in both namespaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitLocation {
    /// Package-prefixed module path (`server.api.user`).
    pub module_path: String,
    /// Canonical request path before any discriminator (`admin.user`).
    pub http_path: String,
    /// Whether the file is a package initializer (`mod.rs`).
    pub is_package: bool,
}

fn join_dotted(prefix: &str, rest: &str) -> String {
    let joined = match (prefix.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{prefix}.{rest}"),
    };
    joined.trim_matches('.').to_string()
}

/// Derive the canonical module and request paths for a file under its route
/// root. Path separators become `.` and the `.rs` suffix is stripped; a
/// package initializer (`mod.rs`) addresses the package path itself, with any
/// trailing or empty separator trimmed.
pub fn locate_unit(
    route_root: &Path,
    file: &Path,
    http_prefix: &str,
    package_prefix: &str,
) -> Result<UnitLocation> {
    let rel = file
        .strip_prefix(route_root)
        .with_context(|| format!("file {} is outside route root {}", file.display(), route_root.display()))?;

    let mut parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    let Some(last) = parts.pop() else {
        bail!("route file path is empty");
    };
    let Some(stem) = last.strip_suffix(".rs") else {
        bail!("route file {} is not a source unit", file.display());
    };
    let is_package = stem == "mod";
    if !is_package {
        parts.push(stem.to_string());
    }
    let rel_dotted = parts.join(".");

    Ok(UnitLocation {
        module_path: join_dotted(package_prefix, &rel_dotted),
        http_path: join_dotted(http_prefix, &rel_dotted),
        is_package,
    })
}
