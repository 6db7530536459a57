//! `ArticleSearch`: the configured index-and-search facade.
//!
//! Wires a single `FieldEmbedder` into the schema manager, index builder
//! and search orchestrator so that the provider is loaded once per process
//! and every component agrees on the collection, dimension and deadlines.

use std::sync::Arc;

use tidings_core::{Error, Result};

use crate::builder::IndexBuilder;
use crate::embedding::{EmbeddingOptions, ProviderLoader};
use crate::extractor::FieldExtractor;
use crate::field::FieldEmbedder;
use crate::schema::{CollectionSchemaManager, EnsureOutcome};
use crate::search::SearchOrchestrator;
use crate::store::VectorStore;
use crate::types::{
    Article, FusedResult, IndexStats, PortfolioQuery, PortfolioResult, SearchQuery, VectorConfig,
};

/// Multi-field article indexing and fused search.
pub struct ArticleSearch {
    config: VectorConfig,
    embedder: Arc<FieldEmbedder>,
    schema: CollectionSchemaManager,
    builder: IndexBuilder,
    search: SearchOrchestrator,
}

impl ArticleSearch {
    /// Create a facade whose provider is loaded by `loader` on first use.
    pub fn new(
        config: VectorConfig,
        store: Arc<dyn VectorStore>,
        loader: Arc<dyn ProviderLoader>,
    ) -> Self {
        let embedder = FieldEmbedder::new(loader, EmbeddingOptions::from_config(&config))
            .with_timeout(config.request_timeout());
        Self::with_embedder(config, store, Arc::new(embedder))
    }

    /// Create a facade around an existing embedder.
    pub fn with_embedder(
        config: VectorConfig,
        store: Arc<dyn VectorStore>,
        embedder: Arc<FieldEmbedder>,
    ) -> Self {
        let timeout = config.request_timeout();

        let schema = CollectionSchemaManager::new(store.clone(), &config.collection, config.schema())
            .with_timeout(timeout);
        let builder = IndexBuilder::new(
            embedder.clone(),
            store.clone(),
            &config.collection,
            config.dimension,
        )
        .with_policy(config.failure_policy)
        .with_timeout(timeout);
        let search = SearchOrchestrator::new(embedder.clone(), store, &config.collection)
            .with_ranking(config.rank_by_overall)
            .with_timeout(timeout);

        Self {
            config,
            embedder,
            schema,
            builder,
            search,
        }
    }

    /// Replace the field extractor used when indexing.
    pub fn with_extractor(mut self, extractor: Arc<dyn FieldExtractor>) -> Self {
        self.builder = self.builder.with_extractor(extractor);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &VectorConfig {
        &self.config
    }

    /// The shared field embedder.
    pub fn embedder(&self) -> &Arc<FieldEmbedder> {
        &self.embedder
    }

    /// Load the provider, check its dimension, and ensure the collection.
    ///
    /// A provider whose dimension differs from the configured one is a
    /// `SchemaMismatch`: its vectors could never be stored.
    pub async fn ensure_collection(&self) -> Result<EnsureOutcome> {
        let dimension = self.embedder.dimension().await?;
        if dimension != self.config.dimension {
            return Err(Error::schema_mismatch(format!(
                "model '{}' produces {dimension}-dimensional vectors, collection '{}' is configured for {}",
                self.config.model, self.config.collection, self.config.dimension
            )));
        }
        self.schema.ensure_collection().await
    }

    /// Ensure the collection, then index `articles`.
    pub async fn index(&self, articles: &[Article]) -> Result<IndexStats> {
        self.ensure_collection().await?;
        self.builder.index(articles).await
    }

    /// Ensure the collection, then index `articles`; returns points written.
    pub async fn index_articles(&self, articles: &[Article]) -> Result<usize> {
        Ok(self.index(articles).await?.points_indexed)
    }

    /// Fused search for `text`, `top_k` neighbours per field.
    pub async fn search(&self, text: &str, top_k: usize) -> Result<Vec<FusedResult>> {
        self.search.search(text, top_k).await
    }

    /// Fused search using the configured default top-K.
    pub async fn search_default(&self, text: &str) -> Result<Vec<FusedResult>> {
        self.search.search(text, self.config.default_top_k).await
    }

    /// Search every portfolio query in order.
    pub async fn search_portfolio(
        &self,
        queries: &[PortfolioQuery],
        top_k: usize,
    ) -> Result<Vec<PortfolioResult>> {
        let mut out = Vec::with_capacity(queries.len());
        for query in queries {
            let prepared = SearchQuery::new(&query.text).with_top_k(top_k);
            let results = self.search.search_query(&prepared).await?;
            log::info!(
                "{}: {} results for '{}'",
                query.portfolio_tag,
                results.len(),
                query.text
            );
            out.push(PortfolioResult {
                portfolio_tag: query.portfolio_tag.clone(),
                query: query.text.clone(),
                results,
            });
        }
        Ok(out)
    }

    /// Drop the collection. Returns `false` if it did not exist.
    pub async fn delete_collection(&self) -> Result<bool> {
        self.schema.delete_collection().await
    }
}

impl std::fmt::Debug for ArticleSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArticleSearch")
            .field("collection", &self.config.collection)
            .field("model", &self.config.model)
            .field("dimension", &self.config.dimension)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
