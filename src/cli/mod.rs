//! # CLI Module
//!
//! Command-line interface for the manifest generator.
//!
//! ## Commands
//!
//! ### `generate`
//!
//! Scan the configured route roots and write the registration artifact:
//!
//! ```bash
//! restmount-gen generate --config routes.yaml --output src/routes_gen.rs
//! ```
//!
//! With `--check`, verify the committed artifact matches a fresh render
//! instead of writing; a stale artifact fails the command, which makes the
//! determinism guarantee enforceable in CI.
//!
//! ### `inspect`
//!
//! Print the discovered `(METHOD, path, handler)` table:
//!
//! ```bash
//! restmount-gen inspect --config routes.yaml
//! ```

mod commands;

pub use commands::{run_cli, Cli, Commands};
