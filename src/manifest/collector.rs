use crate::config::RouterConfig;
use crate::extract::{locate_unit, scan_source, RouteMetadata};
use crate::ids::route_id;
use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Walk every configured route root and aggregate discovered routes.
///
/// Mappings are visited in registration order and each subtree in sorted
/// order, so an unchanged source tree always yields the same manifest in the
/// same order. Any extraction error aborts the whole run.
pub fn collect(config: &RouterConfig) -> Result<Vec<RouteMetadata>> {
    let mut routes = Vec::new();
    for mapping in &config.routes {
        let root = config.route_root_dir(mapping);
        if !root.is_dir() {
            bail!(
                "route root `{}` has no backing directory at {}",
                mapping.http_prefix,
                root.display()
            );
        }
        collect_root(config, mapping, &root, &mut routes)?;
    }
    info!(route_count = routes.len(), "Route manifest collected");
    Ok(routes)
}

fn collect_root(
    config: &RouterConfig,
    mapping: &crate::config::RouteRootMapping,
    root: &Path,
    routes: &mut Vec<RouteMetadata>,
) -> Result<()> {
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk route root {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("rs") {
            continue;
        }

        let source = std::fs::read_to_string(path)
            .with_context(|| format!("read route file {}", path.display()))?;
        let matches = scan_source(&source, &config.symbols)
            .with_context(|| format!("resolve routes in {}", path.display()))?;
        if matches.is_empty() {
            continue;
        }

        let location = locate_unit(root, path, &mapping.http_prefix, &mapping.package_prefix)?;
        debug!(
            file = %path.display(),
            module_path = %location.module_path,
            matches = matches.len(),
            "Routes discovered"
        );

        for m in matches {
            let http_path = match &m.discriminator {
                Some(disc) => format!("{}/{disc}", location.http_path),
                None => location.http_path.clone(),
            };
            routes.push(RouteMetadata {
                id: route_id(&location.module_path, &m.function),
                annotation: m.annotation,
                method: m.method,
                discriminator: m.discriminator,
                handler: m.function,
                module_path: location.module_path.clone(),
                http_path,
                file: path.to_path_buf(),
                package: location.is_package,
                root: mapping.http_prefix.clone(),
                params: m.params,
            });
        }
    }
    Ok(())
}
