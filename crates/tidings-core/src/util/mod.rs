//! Utility modules for file operations and text handling.
//!
//! # Modules
//!
//! - [`files`]: Async JSON reading and writing
//! - [`text`]: Markup stripping and whitespace normalization

pub mod files;
pub mod text;
