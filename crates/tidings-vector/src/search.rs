//! SearchOrchestrator: one query embedding, three field searches, one fusion.

use std::sync::Arc;
use std::time::Duration;

use tidings_core::{Error, Result};

use crate::deadline::within;
use crate::field::FieldEmbedder;
use crate::fusion::{fuse, rank_by_overall};
use crate::store::VectorStore;
use crate::types::{FieldKind, FusedResult, ScoredPoint, SearchQuery, VectorQuery};

/// Runs fused similarity searches against the article collection.
pub struct SearchOrchestrator {
    embedder: Arc<FieldEmbedder>,
    store: Arc<dyn VectorStore>,
    collection: String,
    rank: bool,
    timeout: Option<Duration>,
}

impl SearchOrchestrator {
    /// Create an orchestrator for `collection`.
    pub fn new(
        embedder: Arc<FieldEmbedder>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            collection: collection.into(),
            rank: false,
            timeout: None,
        }
    }

    /// Sort fused results by overall score instead of first-encounter order.
    pub fn with_ranking(mut self, rank: bool) -> Self {
        self.rank = rank;
        self
    }

    /// Bound every store call by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Search all three fields for `text` and fuse the results.
    ///
    /// The query is embedded once and reused for every field. The three
    /// searches run concurrently; the first failure is returned and the
    /// other searches are dropped.
    pub async fn search(&self, text: &str, top_k: usize) -> Result<Vec<FusedResult>> {
        self.search_query(&SearchQuery::new(text).with_top_k(top_k))
            .await
    }

    /// Like [`search`](Self::search), taking a prepared query.
    pub async fn search_query(&self, query: &SearchQuery) -> Result<Vec<FusedResult>> {
        query.validate()?;

        let vector = self
            .embedder
            .embed(&query.text)
            .await?
            .ok_or_else(|| Error::invalid_input("query text is empty"))?;

        let (title, summary, tags) = tokio::try_join!(
            self.search_field(FieldKind::Title, &vector, query.top_k),
            self.search_field(FieldKind::Summary, &vector, query.top_k),
            self.search_field(FieldKind::Tags, &vector, query.top_k),
        )?;
        log::debug!(
            "'{}': {} title, {} summary, {} tags hits",
            query.text,
            title.len(),
            summary.len(),
            tags.len()
        );

        let mut results = fuse(&title, &summary, &tags);
        if self.rank {
            rank_by_overall(&mut results);
        }
        Ok(results)
    }

    async fn search_field(
        &self,
        field: FieldKind,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let query = VectorQuery::new(field, vector.to_vec(), top_k);
        within(
            self.timeout,
            || format!("search '{field}' in '{}'", self.collection),
            self.store.search(&self.collection, query),
        )
        .await
    }
}

impl std::fmt::Debug for SearchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchOrchestrator")
            .field("store", &self.store.name())
            .field("collection", &self.collection)
            .field("rank", &self.rank)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
