//! # Metadata Extractor
//!
//! Static recognition of annotated handler functions in source text and
//! restricted resolution of their declarative arguments.
//!
//! The extractor never compiles or executes the files it reads. Recognition
//! is structural: a `#[route(...)]` annotation immediately preceding a `fn`
//! item, with the HTTP method and optional discriminator derived from the
//! function name. Annotation arguments are resolved by a bounded evaluator
//! over literals and explicitly registered symbols only.

mod annotation;
mod scanner;
mod types;

pub use annotation::{parse_annotation_args, SymbolTable};
pub use scanner::{
    is_route_fn, locate_unit, scan_source, split_method, HandlerMatch, UnitLocation,
    METHOD_VOCABULARY,
};
pub use types::{ParamSpec, RouteAnnotation, RouteMetadata};
