use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Derive the escape-safe identifier for a handler.
///
/// Underscores already present in the module path are doubled before dots are
/// replaced with underscores, then the function name is appended. Two distinct
/// module paths can therefore never collapse onto the same id (`a_b.c` becomes
/// `a__b_c`, while `a.b.c` becomes `a_b_c`).
pub fn route_id(module_path: &str, function: &str) -> String {
    let escaped = module_path.replace('_', "__").replace('.', "_");
    format!("{escaped}_{function}")
}

/// Strongly typed request identifier backed by ULID, used to correlate log
/// lines for one in-flight dispatch.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(pub ulid::Ulid);

impl RequestId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Attempt to parse from a header string; if absent or invalid, generate
    /// a fresh one.
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|s| s.parse::<RequestId>().ok())
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = ulid::Ulid::from_string(s)?;
        Ok(RequestId(id))
    }
}
