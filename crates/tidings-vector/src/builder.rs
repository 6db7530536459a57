//! IndexBuilder: turns articles into points and writes them in one batch.
//!
//! Orchestrates the write path:
//!
//! 1. Derive field texts via `FieldExtractor`
//! 2. Embed the three fields concurrently via `FieldEmbedder`
//! 3. Assign a fresh point identity and attach the payload
//! 4. Upsert every point in a single, durable batch
//!
//! Articles are processed in input order and points keep that order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tidings_core::{Error, Result};
use uuid::Uuid;

use crate::deadline::within;
use crate::extractor::{DefaultFieldExtractor, FieldExtractor};
use crate::field::FieldEmbedder;
use crate::store::VectorStore;
use crate::types::{
    Article, ArticlePayload, FailurePolicy, IndexFailure, IndexStats, IndexedPoint,
};

/// Builds and writes article points.
pub struct IndexBuilder {
    embedder: Arc<FieldEmbedder>,
    store: Arc<dyn VectorStore>,
    extractor: Arc<dyn FieldExtractor>,
    collection: String,
    dimension: usize,
    policy: FailurePolicy,
    timeout: Option<Duration>,
}

impl IndexBuilder {
    /// Create a builder writing to `collection`, expecting `dimension`-long vectors.
    pub fn new(
        embedder: Arc<FieldEmbedder>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            extractor: Arc::new(DefaultFieldExtractor),
            collection: collection.into(),
            dimension,
            policy: FailurePolicy::default(),
            timeout: None,
        }
    }

    /// Replace the field extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn FieldExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Set the per-article failure policy.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound the upsert by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build one point: field texts, vectors, fresh id and payload.
    pub async fn build_point(&self, article: &Article) -> Result<IndexedPoint> {
        let texts = self.extractor.extract(article);
        let vectors = self.embedder.embed_fields(&texts).await?.into_map();

        for (field, vector) in &vectors {
            if vector.len() != self.dimension {
                return Err(Error::schema_mismatch(format!(
                    "'{field}' vector for {} has dimension {}, collection expects {}",
                    article.original_link,
                    vector.len(),
                    self.dimension
                )));
            }
        }

        let payload = ArticlePayload {
            title: texts.title,
            summary: texts.summary,
            tags: article.tags.clone(),
            link: article.original_link.clone(),
            published_time: article.published_time.clone(),
        };

        Ok(IndexedPoint::new(Uuid::new_v4().to_string(), vectors, payload))
    }

    /// Index `articles` and report statistics.
    ///
    /// Under [`FailurePolicy::FailFast`] the first failure aborts the batch
    /// and nothing is written. Under [`FailurePolicy::Isolate`] articles whose
    /// embedding fails or times out are skipped and listed in the stats;
    /// every other error still aborts.
    pub async fn index(&self, articles: &[Article]) -> Result<IndexStats> {
        let start = Instant::now();
        let mut points = Vec::with_capacity(articles.len());
        let mut failures = Vec::new();

        for article in articles {
            match self.build_point(article).await {
                Ok(point) => points.push(point),
                Err(e) if self.policy == FailurePolicy::Isolate && is_isolatable(&e) => {
                    log::warn!("skipping article {}: {e}", article.original_link);
                    failures.push(IndexFailure {
                        link: article.original_link.clone(),
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let points_indexed = points.len();
        if points.is_empty() {
            log::debug!("no points to write to '{}'", self.collection);
        } else {
            let ack = within(
                self.timeout,
                || format!("upsert into '{}'", self.collection),
                self.store.upsert(&self.collection, points, true),
            )
            .await?;
            log::debug!(
                "upsert into '{}' acknowledged (operation {:?}, completed: {})",
                self.collection,
                ack.operation_id,
                ack.completed
            );
        }

        let stats = IndexStats {
            points_indexed,
            articles_failed: failures.len(),
            failures,
            embedding_dimension: self.dimension,
            build_duration_ms: start.elapsed().as_millis() as u64,
        };
        log::info!(
            "indexed {} articles into '{}' ({} skipped) in {}ms",
            stats.points_indexed,
            self.collection,
            stats.articles_failed,
            stats.build_duration_ms
        );
        Ok(stats)
    }

    /// Index `articles`, returning the number of points written.
    pub async fn index_articles(&self, articles: &[Article]) -> Result<usize> {
        Ok(self.index(articles).await?.points_indexed)
    }
}

fn is_isolatable(err: &Error) -> bool {
    matches!(err, Error::Embedding(_) | Error::Timeout { .. })
}

impl std::fmt::Debug for IndexBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexBuilder")
            .field("store", &self.store.name())
            .field("extractor", &self.extractor.name())
            .field("collection", &self.collection)
            .field("dimension", &self.dimension)
            .field("policy", &self.policy)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
