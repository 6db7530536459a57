//! Collection schema management.
//!
//! Guarantees that the article collection exists with one named vector
//! space per field before anything is written to it.

use std::sync::Arc;
use std::time::Duration;

use tidings_core::Result;

use crate::deadline::within;
use crate::store::VectorStore;
use crate::types::CollectionSchema;

/// Result of [`CollectionSchemaManager::ensure_collection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// This call created the collection.
    Created,
    /// The collection was already there (possibly created concurrently).
    Existing,
}

/// Creates and validates the named-vector collection.
pub struct CollectionSchemaManager {
    store: Arc<dyn VectorStore>,
    collection: String,
    schema: CollectionSchema,
    timeout: Option<Duration>,
}

impl CollectionSchemaManager {
    /// Create a manager for `collection` with the expected `schema`.
    pub fn new(
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        schema: CollectionSchema,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            schema,
            timeout: None,
        }
    }

    /// Bound every store call by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Expected schema.
    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    /// Make sure the collection exists and matches the expected schema.
    ///
    /// A present collection causes no create call. If another process
    /// creates it between the check and the create, the store's
    /// "already exists" answer is treated as success. An existing
    /// collection with different named spaces fails with `SchemaMismatch`.
    pub async fn ensure_collection(&self) -> Result<EnsureOutcome> {
        let name = self.collection.as_str();
        let existing = within(
            self.timeout,
            || "list collections".to_string(),
            self.store.list_collections(),
        )
        .await?;

        if existing.iter().any(|c| c == name) {
            self.validate().await?;
            log::debug!("collection '{name}' already exists");
            return Ok(EnsureOutcome::Existing);
        }

        let created = within(
            self.timeout,
            || format!("create collection '{name}'"),
            self.store.create_collection(name, &self.schema),
        )
        .await;

        match created {
            Ok(()) => {
                log::info!(
                    "created collection '{name}' with vectors [{}]",
                    self.schema.vectors.keys().cloned().collect::<Vec<_>>().join(", ")
                );
                Ok(EnsureOutcome::Created)
            }
            Err(e) if e.is_collection_exists() => {
                log::debug!("collection '{name}' was created concurrently");
                self.validate().await?;
                Ok(EnsureOutcome::Existing)
            }
            Err(e) => Err(e),
        }
    }

    async fn validate(&self) -> Result<()> {
        let name = self.collection.as_str();
        let found = within(
            self.timeout,
            || format!("get collection '{name}'"),
            self.store.collection_schema(name),
        )
        .await?;

        match found {
            Some(schema) => schema.check_compatible(&self.schema),
            // Listed but gone by now; nothing left to disagree with.
            None => Ok(()),
        }
    }

    /// Drop the collection. Returns `false` if it did not exist.
    pub async fn delete_collection(&self) -> Result<bool> {
        let name = self.collection.as_str();
        let deleted = within(
            self.timeout,
            || format!("delete collection '{name}'"),
            self.store.delete_collection(name),
        )
        .await?;
        if deleted {
            log::info!("deleted collection '{name}'");
        }
        Ok(deleted)
    }
}

impl std::fmt::Debug for CollectionSchemaManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionSchemaManager")
            .field("store", &self.store.name())
            .field("collection", &self.collection)
            .field("schema", &self.schema)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
