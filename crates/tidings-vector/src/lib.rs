//! Multi-field article vector search for Tidings.
//!
//! Articles are embedded into three independent named vector spaces
//! (title, summary, tags) and queried with a weighted fusion of the three
//! per-field nearest-neighbour result sets.
//!
//! # Features
//!
//! - `vector-qdrant`: Enable the Qdrant REST store
//! - `vector-fastembed`: Enable local embedding generation via fastembed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     tidings-vector                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider / ProviderLoader traits                  │
//! │  ├── MockEmbeddingProvider (always available)               │
//! │  └── FastEmbedProvider (feature: vector-fastembed)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  VectorStore trait                                          │
//! │  ├── MemoryVectorStore (in-memory brute force)              │
//! │  └── QdrantStore (feature: vector-qdrant)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FieldExtractor (article → title/summary/tags text)         │
//! │  FieldEmbedder (lazy provider, empty-text short-circuit)    │
//! │  CollectionSchemaManager (named spaces, idempotent create)  │
//! │  IndexBuilder (points, fresh ids, one batch upsert)         │
//! │  SearchOrchestrator + fuse (weighted score fusion)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ArticleSearch (configured facade)                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use tidings_vector::{ArticleSearch, MemoryVectorStore, MockProviderLoader, VectorConfig};
//! use std::sync::Arc;
//!
//! let config = VectorConfig { dimension: 32, ..Default::default() };
//! let search = ArticleSearch::new(
//!     config,
//!     Arc::new(MemoryVectorStore::new()),
//!     Arc::new(MockProviderLoader::new(32)),
//! );
//!
//! search.index_articles(&articles).await?;
//! for hit in search.search("tax policy", 5).await? {
//!     println!("{} {}", hit.relevance.overall, hit.article_title);
//! }
//! ```

// Core modules (always available)
pub mod embedding;
pub mod store;
pub mod types;

// Pipeline modules (always available)
pub mod builder;
pub mod engine;
pub mod extractor;
pub mod field;
pub mod fusion;
pub mod schema;
pub mod search;

mod deadline;

// Feature-gated modules
#[cfg(feature = "vector-fastembed")]
pub mod fastembed;

#[cfg(feature = "vector-qdrant")]
pub mod qdrant;

// Re-exports: core types
pub use types::{
    Article, ArticleBatch, ArticlePayload, CollectionSchema, Distance, FailurePolicy, FieldKind,
    FieldTexts, FieldVectors, FormattedData, FusedResult, IndexFailure, IndexStats, IndexedPoint,
    PerFieldScore, PortfolioQuery, PortfolioResult, Relevance, ScoredPoint, SearchQuery,
    UpsertAck, VectorConfig, VectorQuery, VectorSpace,
};

// Re-exports: traits
pub use embedding::{
    EmbeddingOptions, EmbeddingProvider, MockEmbeddingProvider, MockProviderLoader, Pooling,
    PreloadedProvider, ProviderLoader,
};
pub use extractor::{DefaultFieldExtractor, FieldExtractor};
pub use store::{MemoryVectorStore, VectorStore};

// Re-exports: pipeline
pub use builder::IndexBuilder;
pub use engine::ArticleSearch;
pub use field::FieldEmbedder;
pub use fusion::{format_percentage, fuse, rank_by_overall};
pub use schema::{CollectionSchemaManager, EnsureOutcome};
pub use search::SearchOrchestrator;

// Feature-gated re-exports
#[cfg(feature = "vector-fastembed")]
pub use fastembed::{FastEmbedLoader, FastEmbedProvider};

#[cfg(feature = "vector-qdrant")]
pub use qdrant::{DEFAULT_QDRANT_URL, QdrantStore};
