//! # Restmount
//!
//! **Restmount** is a declarative REST routing layer mounted on a host web
//! framework. It turns a conventional package/module layout into addressable
//! HTTP endpoints without a hand-written central route table.
//!
//! ## Overview
//!
//! Two tightly coupled subsystems carry the load:
//!
//! - a static **route compiler** that textually scans a source tree for
//!   handler functions annotated with `#[route(...)]`, resolves their
//!   declarative metadata in a bounded evaluation environment, and
//!   synthesizes a route manifest - held in memory or persisted as a
//!   generated registration artifact;
//! - a runtime **dispatcher** that resolves `(entry, name, method)` to a
//!   registered handler by naming convention, binds declared parameters from
//!   the query string or body, runs a middleware chain, and adapts the
//!   handler's return value into a wire response.
//!
//! ## Architecture
//!
//! - **[`extract`]** - annotation recognition and restricted metadata
//!   resolution
//! - **[`manifest`]** - route-root tree walking and artifact generation
//! - **[`registry`]** - explicit module/handler registry populated at
//!   process start
//! - **[`dispatcher`]** - request resolution, resolved-entry cache,
//!   invocation
//! - **[`binder`]** - signature-aware parameter binding
//! - **[`middleware`]** - ordered before/after hooks around invocation
//! - **[`request`]** / **[`response`]** - the host boundary types and the
//!   response adapter
//! - **[`config`]** - route-root mappings and policies, fixed at startup
//! - **[`cli`]** - the `restmount-gen` manifest generator
//!
//! ## Naming convention
//!
//! A request for `/{entry}` or `/{entry}/{name}` maps onto a module resolved
//! through the route-root table and a function named after the HTTP method:
//! `GET /admin.user` calls `get` on the module backing `admin.user`, and
//! `GET /admin.user/detail` calls `get_detail`. Only functions carrying the
//! `#[route(...)]` annotation are reachable.
//!
//! ## Quick start
//!
//! ```no_run
//! use restmount::config::{RouteRootMapping, RouterConfig};
//! use restmount::dispatcher::Dispatcher;
//! use restmount::registry::ModuleRegistry;
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = RouterConfig::new(vec![RouteRootMapping {
//!     http_prefix: "admin".to_string(),
//!     package_prefix: "server.api.admin".to_string(),
//! }])?;
//!
//! let registry = Arc::new(ModuleRegistry::new());
//! // ... populate the registry from the generated artifact or by hand ...
//! let dispatcher = Dispatcher::new(&config, registry);
//! // hand `dispatcher` to the host framework's request loop
//! # Ok(())
//! # }
//! ```

pub mod binder;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod extract;
pub mod ids;
pub mod manifest;
pub mod middleware;
pub mod registry;
pub mod request;
pub mod response;
pub mod telemetry;

pub use config::{MissingParamPolicy, RouteRootMapping, RouterConfig};
pub use dispatcher::Dispatcher;
pub use extract::{ParamSpec, RouteAnnotation, RouteMetadata, SymbolTable};
pub use registry::{ModuleHandle, ModuleRegistry};
pub use request::Request;
pub use response::{HandlerValue, Response};
