//! Tests for the request dispatcher and the resolved-entry cache
//!
//! # Test Coverage
//!
//! - Longest-prefix route-root matching
//! - Cache idempotence: the registry is consulted at most once per name
//! - Negative caching for missing and unannotated functions
//! - Package-initializer binding
//! - Parameter binding through a full dispatch
//! - Pre-dispatch rewrite hook
//! - Middleware short-circuits (reject and pre-built response)
//! - Handler errors and panics converting to 500 responses

use http::Method;
use restmount::config::{MissingParamPolicy, RouteRootMapping, RouterConfig};
use restmount::dispatcher::Dispatcher;
use restmount::extract::{ParamSpec, RouteAnnotation};
use restmount::middleware::{BeforeOutcome, Middleware, MiddlewareContext};
use restmount::registry::{ModuleHandle, ModuleRegistry};
use restmount::request::Request;
use restmount::response::{HandlerValue, Response};
use restmount_macros::route;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn mapping(http: &str, pkg: &str) -> RouteRootMapping {
    RouteRootMapping {
        http_prefix: http.to_string(),
        package_prefix: pkg.to_string(),
    }
}

fn config(mappings: Vec<RouteRootMapping>) -> RouterConfig {
    RouterConfig::new(mappings).expect("config")
}

/// A handler exactly as the extractor would discover it in a route module.
#[route(module = "Pets", name = "Pet detail")]
fn get_pet(_req: &Request, _args: &[Value]) -> anyhow::Result<HandlerValue> {
    Ok(HandlerValue::Text("pet".to_string()))
}

fn user_module(calls: Arc<AtomicUsize>) -> anyhow::Result<ModuleHandle> {
    let mut m = ModuleHandle::new("server.api.user");
    m.route_fn(
        "get_detail",
        RouteAnnotation::new().with_module("Accounts").with_name("User detail"),
        vec![
            ParamSpec::new("req").hint("&Request"),
            ParamSpec::new("id").hint("&str"),
            ParamSpec::new("page").default_value(json!(1)),
        ],
        move |_req, args| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(HandlerValue::Json(json!({ "args": args })))
        },
    )?;
    Ok(m)
}

#[test]
fn test_longest_prefix_wins() {
    let registry = Arc::new(ModuleRegistry::new());

    let mut shallow = ModuleHandle::new("pkg.a.b.c");
    shallow
        .route_fn(
            "get",
            RouteAnnotation::new(),
            vec![ParamSpec::new("req")],
            |_req, _args| Ok(HandlerValue::Text("via-a".to_string())),
        )
        .unwrap();
    registry.register(shallow);

    let mut deep = ModuleHandle::new("pkg.ab.c");
    deep.route_fn(
        "get",
        RouteAnnotation::new(),
        vec![ParamSpec::new("req")],
        |_req, _args| Ok(HandlerValue::Text("via-a.b".to_string())),
    )
    .unwrap();
    registry.register(deep);

    // Registration order deliberately puts the short prefix first.
    let dispatcher = Dispatcher::new(
        &config(vec![mapping("a", "pkg.a"), mapping("a.b", "pkg.ab")]),
        registry,
    );

    let req = Request::builder(Method::GET, "/a.b.c").build();
    let resp = dispatcher.dispatch(&req, "a.b.c", None);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, b"via-a.b");
}

#[test]
fn test_unmapped_entry_not_found_without_module_load() {
    let registry = Arc::new(ModuleRegistry::new());
    let dispatcher = Dispatcher::new(
        &config(vec![mapping("admin", "server.api.admin")]),
        Arc::clone(&registry),
    );

    let req = Request::builder(Method::GET, "/zzz").build();
    let resp = dispatcher.dispatch(&req, "zzz", None);
    assert_eq!(resp.status, 404);
    assert_eq!(registry.load_count(), 0);
}

#[test]
fn test_cache_idempotence_loads_module_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(ModuleRegistry::new());
    registry.register(user_module(Arc::clone(&calls)).unwrap());

    let dispatcher = Dispatcher::new(&config(vec![mapping("admin", "server.api")]), Arc::clone(&registry));

    let req = Request::builder(Method::GET, "/admin.user/detail").query("id=5").build();
    for _ in 0..2 {
        let resp = dispatcher.dispatch(&req, "admin.user", Some("detail"));
        assert_eq!(resp.status, 200);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(registry.load_count(), 1);
    let (hits, misses) = dispatcher.cache_stats();
    assert_eq!((hits, misses), (1, 1));
}

#[test]
fn test_unannotated_function_is_never_reachable() {
    let registry = Arc::new(ModuleRegistry::new());
    let mut m = ModuleHandle::new("server.api.vault");
    // Matches the naming convention but carries no annotation.
    m.plain_fn("get_secret", |_req, _args| {
        Ok(HandlerValue::Text("leaked".to_string()))
    });
    registry.register(m);

    let dispatcher = Dispatcher::new(&config(vec![mapping("admin", "server.api")]), Arc::clone(&registry));
    let req = Request::builder(Method::GET, "/admin.vault/secret").build();

    for _ in 0..2 {
        let resp = dispatcher.dispatch(&req, "admin.vault", Some("secret"));
        assert_eq!(resp.status, 404);
    }
    // The negative outcome is cached after the first lookup.
    assert_eq!(registry.load_count(), 1);
}

#[test]
fn test_missing_function_is_cached_negative() {
    let registry = Arc::new(ModuleRegistry::new());
    registry.register(ModuleHandle::new("server.api.user"));

    let dispatcher = Dispatcher::new(&config(vec![mapping("admin", "server.api")]), Arc::clone(&registry));
    let req = Request::builder(Method::GET, "/admin.user/nope").build();

    for _ in 0..2 {
        let resp = dispatcher.dispatch(&req, "admin.user", Some("nope"));
        assert_eq!(resp.status, 404);
    }
    assert_eq!(registry.load_count(), 1);
}

#[test]
fn test_package_initializer_binds_at_package_path() {
    let registry = Arc::new(ModuleRegistry::new());
    let mut m = ModuleHandle::package("server.api.admin");
    m.route_fn(
        "get",
        RouteAnnotation::new(),
        vec![ParamSpec::new("req")],
        |_req, _args| Ok(HandlerValue::Text("admin-home".to_string())),
    )
    .unwrap();
    registry.register(m);

    let dispatcher = Dispatcher::new(&config(vec![mapping("admin", "server.api.admin")]), registry);
    let req = Request::builder(Method::GET, "/admin").build();
    let resp = dispatcher.dispatch(&req, "admin", None);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, b"admin-home");
}

#[test]
fn test_dispatch_binds_query_and_default() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(ModuleRegistry::new());
    registry.register(user_module(calls).unwrap());

    let dispatcher = Dispatcher::new(&config(vec![mapping("admin", "server.api")]), registry);
    let req = Request::builder(Method::GET, "/admin.user/detail").query("id=5").build();
    let resp = dispatcher.dispatch(&req, "admin.user", Some("detail"));

    assert_eq!(resp.status, 200);
    let body: Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(body, json!({ "args": ["5", 1] }));
}

#[test]
fn test_discriminator_is_lowercased() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(ModuleRegistry::new());
    registry.register(user_module(Arc::clone(&calls)).unwrap());

    let dispatcher = Dispatcher::new(&config(vec![mapping("admin", "server.api")]), registry);
    let req = Request::builder(Method::GET, "/admin.user/Detail").query("id=5").build();
    let resp = dispatcher.dispatch(&req, "admin.user", Some("Detail"));
    assert_eq!(resp.status, 200);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_dispatch_path_splits_entry_and_name() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(ModuleRegistry::new());
    registry.register(user_module(calls).unwrap());

    let dispatcher = Dispatcher::new(&config(vec![mapping("admin", "server.api")]), registry);
    let req = Request::builder(Method::GET, "/admin.user/detail").query("id=5").build();
    let resp = dispatcher.dispatch_path(&req, "/admin.user/detail");
    assert_eq!(resp.status, 200);
}

#[test]
fn test_before_dispatch_hook_rewrites_entry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(ModuleRegistry::new());
    registry.register(user_module(calls).unwrap());

    let mut dispatcher =
        Dispatcher::new(&config(vec![mapping("admin", "server.api")]), registry);
    dispatcher.set_before_dispatch(Arc::new(|_req, entry, name| {
        if entry == "users" {
            ("admin.user".to_string(), name.map(str::to_string))
        } else {
            (entry.to_string(), name.map(str::to_string))
        }
    }));

    let req = Request::builder(Method::GET, "/users/detail").query("id=5").build();
    let resp = dispatcher.dispatch(&req, "users", Some("detail"));
    assert_eq!(resp.status, 200);
}

#[test]
fn test_handler_error_becomes_internal_error() {
    let registry = Arc::new(ModuleRegistry::new());
    let mut m = ModuleHandle::new("server.api.broken");
    m.route_fn(
        "get",
        RouteAnnotation::new(),
        vec![ParamSpec::new("req")],
        |_req, _args| anyhow::bail!("storage offline"),
    )
    .unwrap();
    registry.register(m);

    let dispatcher = Dispatcher::new(&config(vec![mapping("admin", "server.api")]), registry);
    let req = Request::builder(Method::GET, "/admin.broken").build();
    let resp = dispatcher.dispatch(&req, "admin.broken", None);
    assert_eq!(resp.status, 500);
    let body: Value = serde_json::from_slice(&resp.body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("storage offline"));
}

#[test]
fn test_handler_panic_becomes_internal_error() {
    let registry = Arc::new(ModuleRegistry::new());
    let mut m = ModuleHandle::new("server.api.panicky");
    m.route_fn(
        "get",
        RouteAnnotation::new(),
        vec![ParamSpec::new("req")],
        |_req, _args| panic!("boom"),
    )
    .unwrap();
    registry.register(m);

    let dispatcher = Dispatcher::new(&config(vec![mapping("admin", "server.api")]), registry);
    let req = Request::builder(Method::GET, "/admin.panicky").build();
    let resp = dispatcher.dispatch(&req, "admin.panicky", None);
    assert_eq!(resp.status, 500);
}

struct DenyAll;

impl Middleware for DenyAll {
    fn before(&self, _ctx: &MiddlewareContext, _req: &Request) -> BeforeOutcome {
        BeforeOutcome::Reject
    }
}

#[test]
fn test_middleware_reject_yields_unauthorized_without_invoking_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(ModuleRegistry::new());
    registry.register(user_module(Arc::clone(&calls)).unwrap());

    let mut dispatcher =
        Dispatcher::new(&config(vec![mapping("admin", "server.api")]), registry);
    dispatcher.add_middleware(Arc::new(DenyAll));

    let req = Request::builder(Method::GET, "/admin.user/detail").query("id=5").build();
    let resp = dispatcher.dispatch(&req, "admin.user", Some("detail"));
    assert_eq!(resp.status, 401);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

struct Teapot;

impl Middleware for Teapot {
    fn before(&self, _ctx: &MiddlewareContext, _req: &Request) -> BeforeOutcome {
        BeforeOutcome::Respond(Response::text(418, "teapot"))
    }
}

#[test]
fn test_middleware_prebuilt_response_short_circuits() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(ModuleRegistry::new());
    registry.register(user_module(Arc::clone(&calls)).unwrap());

    let mut dispatcher =
        Dispatcher::new(&config(vec![mapping("admin", "server.api")]), registry);
    dispatcher.add_middleware(Arc::new(Teapot));

    let req = Request::builder(Method::GET, "/admin.user/detail").query("id=5").build();
    let resp = dispatcher.dispatch(&req, "admin.user", Some("detail"));
    assert_eq!(resp.status, 418);
    assert_eq!(resp.body, b"teapot");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_strict_policy_rejects_missing_parameter() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(ModuleRegistry::new());
    registry.register(user_module(Arc::clone(&calls)).unwrap());

    let strict = config(vec![mapping("admin", "server.api")])
        .with_missing_param_policy(MissingParamPolicy::Strict);
    let dispatcher = Dispatcher::new(&strict, registry);

    let req = Request::builder(Method::GET, "/admin.user/detail").build();
    let resp = dispatcher.dispatch(&req, "admin.user", Some("detail"));
    assert_eq!(resp.status, 400);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_lenient_policy_binds_null_and_invokes() {
    let registry = Arc::new(ModuleRegistry::new());
    let mut m = ModuleHandle::new("server.api.pets");
    m.route_fn(
        "get_pet",
        RouteAnnotation::new().with_module("Pets"),
        vec![ParamSpec::new("req"), ParamSpec::new("id")],
        get_pet_echo,
    )
    .unwrap();
    registry.register(m);

    let dispatcher = Dispatcher::new(&config(vec![mapping("admin", "server.api")]), registry);
    let req = Request::builder(Method::GET, "/admin.pets/pet").build();
    let resp = dispatcher.dispatch(&req, "admin.pets", Some("pet"));
    assert_eq!(resp.status, 200);
    let body: Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(body, json!([null]));
}

fn get_pet_echo(_req: &Request, args: &[Value]) -> anyhow::Result<HandlerValue> {
    Ok(HandlerValue::Json(Value::Array(args.to_vec())))
}

#[test]
fn test_annotated_fn_item_registers_and_dispatches() {
    let registry = Arc::new(ModuleRegistry::new());
    let mut m = ModuleHandle::new("server.api.pets");
    m.route_fn(
        "get_pet",
        RouteAnnotation::new().with_module("Pets").with_name("Pet detail"),
        vec![ParamSpec::new("req").hint("&Request")],
        get_pet,
    )
    .unwrap();
    registry.register(m);

    let dispatcher = Dispatcher::new(&config(vec![mapping("admin", "server.api")]), registry);
    let req = Request::builder(Method::GET, "/admin.pets/pet").build();
    let resp = dispatcher.dispatch(&req, "admin.pets", Some("pet"));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, b"pet");
}
