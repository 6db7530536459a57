//! Error types for Tidings operations.
//!
//! This module provides the common `Error` type and `Result<T>` alias used
//! across all Tidings crates. Uses `thiserror` for derive macros.
//!
//! # Taxonomy
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | `ProviderInit` | the embedding model cannot be loaded |
//! | `Embedding` | a single text fails to embed |
//! | `StoreUnavailable` | the vector database cannot be reached |
//! | `Store` | the vector database answered with an error |
//! | `SchemaMismatch` | collection dimensions disagree with the model |
//! | `CollectionExists` | a create raced with another creator |
//! | `Timeout` | a provider or store call exceeded its deadline |
//!
//! Empty field text is deliberately *not* an error: it yields no vector.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in Tidings operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error tied to a specific file.
    #[error("I/O error at {path}: {source}")]
    IoWithPath {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Caller supplied an unusable argument.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The embedding provider could not be initialized.
    #[error("Embedding provider initialization failed: {0}")]
    ProviderInit(String),

    /// A text could not be embedded.
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// The vector store could not be reached.
    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// The vector store rejected a request.
    #[error("Vector store error: {0}")]
    Store(String),

    /// The collection already exists.
    #[error("Collection already exists: {0}")]
    CollectionExists(String),

    /// Collection schema disagrees with the configured embedding model.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A provider or store call did not finish in time.
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        /// What was being waited on.
        operation: String,
        /// The deadline that expired.
        elapsed: Duration,
    },
}

impl Error {
    /// Create an I/O error that remembers the offending path.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::IoWithPath {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider initialization error.
    pub fn provider_init(msg: impl Into<String>) -> Self {
        Self::ProviderInit(msg.into())
    }

    /// Create an embedding error.
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create a store-unavailable error.
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a collection-exists error.
    pub fn collection_exists(name: impl Into<String>) -> Self {
        Self::CollectionExists(name.into())
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(msg: impl Into<String>) -> Self {
        Self::SchemaMismatch(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed,
        }
    }

    /// Whether this error reports an already-existing collection.
    pub fn is_collection_exists(&self) -> bool {
        matches!(self, Self::CollectionExists(_))
    }

    /// Whether this error reports a schema mismatch.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, Self::SchemaMismatch(_))
    }

    /// Whether this error came from an expired deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether the vector store was unreachable.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type alias using Tidings' Error type.
pub type Result<T> = std::result::Result<T, Error>;
