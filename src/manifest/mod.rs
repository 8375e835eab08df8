//! # Route Manifest Builder
//!
//! Walks configured route roots, runs the extractor per file, and aggregates
//! the results. The manifest is consumed in one of two ways: held in memory
//! for dynamic resolution, or persisted as a generated registration artifact
//! committed alongside the host application. Both are deterministic over an
//! unchanged tree.

mod artifact;
mod collector;

pub use artifact::{check_artifact, render_artifact, write_artifact};
pub use collector::collect;
