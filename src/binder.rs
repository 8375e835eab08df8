//! Signature-aware parameter binding.
//!
//! Builds the positional argument list for a handler from its declared
//! parameters. The reserved leading request-context parameter is never bound
//! here; the dispatcher passes the request alongside the bound list.

use crate::config::MissingParamPolicy;
use crate::extract::ParamSpec;
use crate::request::Request;
use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use tracing::warn;

/// Maximum inline bound arguments before heap allocation.
pub const MAX_INLINE_ARGS: usize = 8;

pub type ArgVec = SmallVec<[Value; MAX_INLINE_ARGS]>;

/// A required parameter was absent under the strict policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingParam {
    pub name: String,
}

fn is_read_only(method: &Method) -> bool {
    *method == Method::GET || *method == Method::DELETE
}

fn lookup(req: &Request, name: &str) -> Option<Value> {
    if is_read_only(req.method()) {
        return req
            .query_value(name)
            .map(|v| Value::String(v.to_string()));
    }
    // JSON body wins over form fields when both could apply.
    if let Some(v) = req.json().get(name) {
        return Some(v.clone());
    }
    req.form_value(name).map(|v| Value::String(v.to_string()))
}

/// Bind every declared parameter after the reserved first one, in
/// declaration order.
///
/// Read-only methods (GET, DELETE) bind from the query string; other methods
/// bind from the parsed JSON body first, then the form collection. An absent
/// parameter takes its declared default when present; otherwise the policy
/// decides between binding `null` with a warning and failing the request.
/// Type hints are informational only - values pass through uncoerced.
pub fn bind_args(
    req: &Request,
    params: &[ParamSpec],
    policy: MissingParamPolicy,
) -> Result<ArgVec, MissingParam> {
    let mut args = ArgVec::new();
    for spec in params.iter().skip(1) {
        match lookup(req, &spec.name) {
            Some(value) => args.push(value),
            None => match (&spec.default, policy) {
                (Some(default), _) => args.push(default.clone()),
                (None, MissingParamPolicy::Lenient) => {
                    warn!(parameter = %spec.name, "Missing parameter, binding null");
                    args.push(Value::Null);
                }
                (None, MissingParamPolicy::Strict) => {
                    return Err(MissingParam {
                        name: spec.name.clone(),
                    });
                }
            },
        }
    }
    Ok(args)
}
