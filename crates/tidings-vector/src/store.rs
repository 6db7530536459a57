//! VectorStore trait and in-memory implementation.
//!
//! A vector store holds named-vector collections: every point carries up to
//! one vector per named space plus a JSON-serializable payload, and searches
//! target a single named space at a time.
//!
//! [`MemoryVectorStore`] does brute-force cosine search over everything it
//! holds. It exists for tests and offline demos; it is not an index engine.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use tidings_core::{Error, Result};

use crate::embedding::cosine_similarity;
use crate::types::{CollectionSchema, Distance, IndexedPoint, ScoredPoint, UpsertAck, VectorQuery};

/// Named-vector collection store.
///
/// Implementations are shared handles (`Arc<dyn VectorStore>`) used
/// concurrently without external locking.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Names of all collections.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Create a collection.
    ///
    /// Fails with `Error::CollectionExists` if the name is already taken.
    async fn create_collection(&self, name: &str, schema: &CollectionSchema) -> Result<()>;

    /// Named vector spaces of a collection, or `None` if it does not exist.
    async fn collection_schema(&self, name: &str) -> Result<Option<CollectionSchema>>;

    /// Insert or overwrite points by id.
    ///
    /// With `wait`, the call returns only once the write is durable.
    async fn upsert(&self, name: &str, points: Vec<IndexedPoint>, wait: bool) -> Result<UpsertAck>;

    /// Nearest neighbours in one named space, best first.
    async fn search(&self, name: &str, query: VectorQuery) -> Result<Vec<ScoredPoint>>;

    /// Drop a collection. Returns `false` if it did not exist.
    async fn delete_collection(&self, name: &str) -> Result<bool>;

    /// Backend name for logging/debugging.
    fn name(&self) -> &str;
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
struct MemoryCollection {
    schema: CollectionSchema,
    points: Vec<IndexedPoint>,
}

/// Brute-force in-memory store.
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, MemoryCollection>>,
    create_calls: AtomicUsize,
    operations: AtomicUsize,
}

impl MemoryVectorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `create_collection` calls received, successful or not.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of points held in a collection.
    pub async fn point_count(&self, name: &str) -> usize {
        self.collections
            .read()
            .await
            .get(name)
            .map(|c| c.points.len())
            .unwrap_or(0)
    }

    /// Copy of every point in a collection, in insertion order.
    pub async fn points(&self, name: &str) -> Vec<IndexedPoint> {
        self.collections
            .read()
            .await
            .get(name)
            .map(|c| c.points.clone())
            .unwrap_or_default()
    }
}

fn not_found(name: &str) -> Error {
    Error::store(format!("collection '{name}' not found"))
}

fn validate_point(schema: &CollectionSchema, point: &IndexedPoint) -> Result<()> {
    for (field, vector) in &point.vectors {
        let Some(space) = schema.space(field.as_str()) else {
            return Err(Error::schema_mismatch(format!(
                "point {} has vector '{field}' not defined by the collection",
                point.id
            )));
        };
        if vector.len() != space.size {
            return Err(Error::schema_mismatch(format!(
                "point {} vector '{field}' has dimension {}, collection expects {}",
                point.id,
                vector.len(),
                space.size
            )));
        }
    }
    Ok(())
}

fn similarity(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
    match distance {
        Distance::Cosine => cosine_similarity(a, b),
        Distance::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        Distance::Euclid => -a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
        Distance::Manhattan => -a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum::<f32>(),
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_collection(&self, name: &str, schema: &CollectionSchema) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Err(Error::collection_exists(name));
        }
        collections.insert(
            name.to_string(),
            MemoryCollection {
                schema: schema.clone(),
                points: Vec::new(),
            },
        );
        log::debug!("memory store: created collection '{name}'");
        Ok(())
    }

    async fn collection_schema(&self, name: &str) -> Result<Option<CollectionSchema>> {
        Ok(self
            .collections
            .read()
            .await
            .get(name)
            .map(|c| c.schema.clone()))
    }

    async fn upsert(&self, name: &str, points: Vec<IndexedPoint>, _wait: bool) -> Result<UpsertAck> {
        let mut collections = self.collections.write().await;
        let collection = collections.get_mut(name).ok_or_else(|| not_found(name))?;

        // Validate the whole batch before touching storage.
        for point in &points {
            validate_point(&collection.schema, point)?;
        }

        let mut positions: BTreeMap<String, usize> = collection
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        for point in points {
            match positions.get(&point.id) {
                Some(&i) => collection.points[i] = point,
                None => {
                    positions.insert(point.id.clone(), collection.points.len());
                    collection.points.push(point);
                }
            }
        }

        let operation_id = self.operations.fetch_add(1, Ordering::SeqCst) as u64;
        Ok(UpsertAck {
            operation_id: Some(operation_id),
            completed: true,
        })
    }

    async fn search(&self, name: &str, query: VectorQuery) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read().await;
        let collection = collections.get(name).ok_or_else(|| not_found(name))?;

        let space_name = query.vector_name.as_str();
        let space = collection.schema.space(space_name).ok_or_else(|| {
            Error::store(format!("collection '{name}' has no vector named '{space_name}'"))
        })?;
        if query.vector.len() != space.size {
            return Err(Error::schema_mismatch(format!(
                "query vector has dimension {}, '{space_name}' expects {}",
                query.vector.len(),
                space.size
            )));
        }

        let mut hits: Vec<ScoredPoint> = collection
            .points
            .iter()
            .filter_map(|point| {
                let vector = point.vector(query.vector_name)?;
                Some(ScoredPoint {
                    id: point.id.clone(),
                    score: similarity(space.distance, &query.vector, vector),
                    payload: query.with_payload.then(|| point.payload.clone()),
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(query.limit);
        Ok(hits)
    }

    async fn delete_collection(&self, name: &str) -> Result<bool> {
        Ok(self.collections.write().await.remove(name).is_some())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// Tests
// ============================================================================
