//! Tidings Core: shared error type and utilities.
//!
//! This crate provides the foundational types used across all Tidings crates.
//! It has no internal Tidings dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`util`]: JSON file helpers and text cleanup

pub mod error;
pub mod util;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};

// Convenience re-exports from util
pub use util::files::{read_json, write_json};
pub use util::text::strip_markup;
