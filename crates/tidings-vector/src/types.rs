//! Common types for article indexing and fused search.
//!
//! These types are shared by every embedding provider and vector store,
//! and are always available regardless of feature flags.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tidings_core::{Error, Result};

// ============================================================================
// Configuration
// ============================================================================

/// Vector search configuration.
///
/// Controls collection naming, embedding model, store backend and the
/// indexing/search behaviour switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Name of the collection holding article points.
    pub collection: String,

    /// Store backend: "qdrant" or "memory".
    pub backend: String,

    /// Embedding provider: "fastembed" or "mock".
    pub provider: String,

    /// Embedding model name (e.g., "bge-large-en-v1.5").
    pub model: String,

    /// Embedding dimension; every named vector space uses it.
    pub dimension: usize,

    /// Directory used to cache downloaded model files.
    pub cache_path: Option<String>,

    /// Whether models already present in the cache may be used.
    pub allow_local_models: bool,

    /// Whether vectors are L2-normalized after embedding.
    pub normalize: bool,

    /// Result count used when the caller does not pass one.
    pub default_top_k: usize,

    /// Per-call deadline for embedding and store calls, in seconds (0 disables).
    pub request_timeout_secs: u64,

    /// Sort fused results by overall score instead of first-encounter order.
    pub rank_by_overall: bool,

    /// What to do when a single article fails to embed.
    pub failure_policy: FailurePolicy,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            collection: "articles".to_string(),
            backend: "qdrant".to_string(),
            provider: "fastembed".to_string(),
            model: "bge-large-en-v1.5".to_string(),
            dimension: 1024,
            cache_path: None,
            allow_local_models: true,
            normalize: true,
            default_top_k: 5,
            request_timeout_secs: 60,
            rank_by_overall: false,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl VectorConfig {
    /// The per-call deadline, if one is configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// The collection schema implied by this configuration.
    pub fn schema(&self) -> CollectionSchema {
        CollectionSchema::for_fields(self.dimension, Distance::Cosine)
    }
}

/// Error policy for per-article embedding failures during indexing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the whole batch on the first failure; nothing is written.
    #[default]
    FailFast,
    /// Skip failing articles, report them, and write the rest.
    Isolate,
}

// ============================================================================
// Fields
// ============================================================================

/// One of the three independently embedded article fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Article headline.
    Title,
    /// Introduction plus cleaned description.
    Summary,
    /// Joined tag list.
    Tags,
}

impl FieldKind {
    /// All fields, in fusion merge order.
    pub const ALL: [FieldKind; 3] = [FieldKind::Title, FieldKind::Summary, FieldKind::Tags];

    /// Named vector space identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Title => "title",
            FieldKind::Summary => "summary",
            FieldKind::Tags => "tags",
        }
    }

    /// Fusion weight. Weights sum to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            FieldKind::Title => 0.3,
            FieldKind::Summary => 0.5,
            FieldKind::Tags => 0.2,
        }
    }

}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three texts derived from an article, one per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTexts {
    /// Title text.
    pub title: String,
    /// Introduction followed by the markup-free description.
    pub summary: String,
    /// Tags joined by `", "`.
    pub tags: String,
}

impl FieldTexts {
    /// Text for one field.
    pub fn get(&self, field: FieldKind) -> &str {
        match field {
            FieldKind::Title => &self.title,
            FieldKind::Summary => &self.summary,
            FieldKind::Tags => &self.tags,
        }
    }
}

/// The vectors produced for one article. `None` marks an empty field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldVectors {
    /// Title vector.
    pub title: Option<Vec<f32>>,
    /// Summary vector.
    pub summary: Option<Vec<f32>>,
    /// Tags vector.
    pub tags: Option<Vec<f32>>,
}

impl FieldVectors {
    /// Vector for one field.
    pub fn get(&self, field: FieldKind) -> Option<&[f32]> {
        match field {
            FieldKind::Title => self.title.as_deref(),
            FieldKind::Summary => self.summary.as_deref(),
            FieldKind::Tags => self.tags.as_deref(),
        }
    }

    /// Number of fields that produced a vector.
    pub fn present(&self) -> usize {
        FieldKind::ALL
            .iter()
            .filter(|f| self.get(**f).is_some())
            .count()
    }

    /// Convert into a named-vector map, dropping absent fields.
    pub fn into_map(self) -> BTreeMap<FieldKind, Vec<f32>> {
        [
            (FieldKind::Title, self.title),
            (FieldKind::Summary, self.summary),
            (FieldKind::Tags, self.tags),
        ]
        .into_iter()
        .filter_map(|(field, vector)| vector.map(|v| (field, v)))
        .collect()
    }
}

// ============================================================================
// Articles
// ============================================================================

/// A source article as delivered by the ingestion feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// External link; unique per source.
    pub original_link: String,

    /// Publication timestamp exactly as delivered by the feed.
    ///
    /// Kept opaque: feeds mix RFC 3339 and RFC 2822 stamps, and the value is
    /// only copied into the payload.
    #[serde(default)]
    pub published_time: Option<String>,

    /// Ordered tag list.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Editorial text fields.
    #[serde(default)]
    pub formatted_data: FormattedData,
}

/// Editorial text of an article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormattedData {
    /// Headline.
    pub title: String,
    /// Lead paragraph (plain text).
    pub introductory_paragraph: String,
    /// Body paragraph; may contain markup.
    pub descriptive_paragraph: String,
}

impl Article {
    /// Create an article with a link and title.
    pub fn new(link: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            original_link: link.into(),
            published_time: None,
            tags: Vec::new(),
            formatted_data: FormattedData {
                title: title.into(),
                ..Default::default()
            },
        }
    }

    /// Set the publication time, formatted as the feed does
    /// (`2026-01-06T17:41:00.000Z`).
    pub fn published_at(mut self, time: DateTime<Utc>) -> Self {
        self.published_time = Some(time.to_rfc3339_opts(SecondsFormat::Millis, true));
        self
    }

    /// Set the raw publication timestamp.
    pub fn with_published_time(mut self, raw: impl Into<String>) -> Self {
        self.published_time = Some(raw.into());
        self
    }

    /// Set the tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the introductory paragraph.
    pub fn with_introduction(mut self, text: impl Into<String>) -> Self {
        self.formatted_data.introductory_paragraph = text.into();
        self
    }

    /// Set the descriptive paragraph.
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.formatted_data.descriptive_paragraph = text.into();
        self
    }
}

/// The `{ "articles": [...] }` envelope read by the harness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleBatch {
    /// Articles in ingestion order.
    #[serde(default)]
    pub articles: Vec<Article>,
}

// ============================================================================
// Points
// ============================================================================

/// Payload stored alongside every point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticlePayload {
    /// Title text.
    pub title: String,
    /// Summary text.
    pub summary: String,
    /// Original tag list.
    pub tags: Vec<String>,
    /// Article link.
    pub link: String,
    /// Publication timestamp, copied verbatim from the article.
    pub published_time: Option<String>,
}

/// A store-ready point: identity, named vectors and payload.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPoint {
    /// Freshly generated identity; never derived from content.
    pub id: String,

    /// Named vectors; fields with empty text are absent.
    pub vectors: BTreeMap<FieldKind, Vec<f32>>,

    /// Payload, present even when every vector is absent.
    pub payload: ArticlePayload,
}

impl IndexedPoint {
    /// Create a point.
    pub fn new(
        id: impl Into<String>,
        vectors: BTreeMap<FieldKind, Vec<f32>>,
        payload: ArticlePayload,
    ) -> Self {
        Self {
            id: id.into(),
            vectors,
            payload,
        }
    }

    /// Vector for one field.
    pub fn vector(&self, field: FieldKind) -> Option<&[f32]> {
        self.vectors.get(&field).map(Vec::as_slice)
    }
}

// ============================================================================
// Collection schema
// ============================================================================

/// Similarity metric of a named vector space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    /// Cosine similarity.
    Cosine,
    /// Dot product.
    Dot,
    /// Euclidean distance.
    Euclid,
    /// Manhattan distance.
    Manhattan,
}

/// Size and metric of one named vector space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorSpace {
    /// Vector dimension.
    pub size: usize,
    /// Similarity metric.
    pub distance: Distance,
}

/// Named vector spaces of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    /// Space name to definition.
    pub vectors: BTreeMap<String, VectorSpace>,
}

impl CollectionSchema {
    /// One space per article field, all with the same size and metric.
    pub fn for_fields(size: usize, distance: Distance) -> Self {
        let vectors = FieldKind::ALL
            .iter()
            .map(|f| (f.as_str().to_string(), VectorSpace { size, distance }))
            .collect();
        Self { vectors }
    }

    /// Definition of one named space.
    pub fn space(&self, name: &str) -> Option<&VectorSpace> {
        self.vectors.get(name)
    }

    /// Verify that every space in `expected` exists here with the same shape.
    pub fn check_compatible(&self, expected: &CollectionSchema) -> Result<()> {
        for (name, want) in &expected.vectors {
            let Some(have) = self.vectors.get(name) else {
                return Err(Error::schema_mismatch(format!(
                    "named vector '{name}' is missing from the collection"
                )));
            };
            if have.size != want.size {
                return Err(Error::schema_mismatch(format!(
                    "named vector '{name}' has dimension {}, model produces {}",
                    have.size, want.size
                )));
            }
            if have.distance != want.distance {
                return Err(Error::schema_mismatch(format!(
                    "named vector '{name}' uses {:?}, expected {:?}",
                    have.distance, want.distance
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Store requests and responses
// ============================================================================

/// A nearest-neighbour request against one named vector space.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    /// Which named space to search.
    pub vector_name: FieldKind,
    /// Query embedding.
    pub vector: Vec<f32>,
    /// Maximum neighbours to return.
    pub limit: usize,
    /// Whether payloads should be attached.
    pub with_payload: bool,
}

impl VectorQuery {
    /// Create a query that attaches payloads.
    pub fn new(vector_name: FieldKind, vector: Vec<f32>, limit: usize) -> Self {
        Self {
            vector_name,
            vector,
            limit,
            with_payload: true,
        }
    }
}

/// A single neighbour returned by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    /// Point identity.
    pub id: String,
    /// Similarity score (higher is more similar).
    pub score: f32,
    /// Payload, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ArticlePayload>,
}

/// Store acknowledgement for an upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertAck {
    /// Store-assigned operation number, if any.
    pub operation_id: Option<u64>,
    /// Whether the write is durable (as opposed to only acknowledged).
    pub completed: bool,
}

// ============================================================================
// Search types
// ============================================================================

/// A similarity query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query text; embedded once and reused for every field.
    pub text: String,
    /// Neighbours requested per field.
    pub top_k: usize,
}

impl SearchQuery {
    /// Default neighbours per field.
    pub const DEFAULT_TOP_K: usize = 5;

    /// Create a query with the default top-K.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            top_k: Self::DEFAULT_TOP_K,
        }
    }

    /// Set the top-K.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Reject unusable queries.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::invalid_input("top_k must be at least 1"));
        }
        if self.text.trim().is_empty() {
            return Err(Error::invalid_input("query text is empty"));
        }
        Ok(())
    }
}

/// Per-field similarity of one document; absent fields score 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerFieldScore {
    /// Title similarity.
    pub title: f32,
    /// Summary similarity.
    pub summary: f32,
    /// Tags similarity.
    pub tags: f32,
}

impl PerFieldScore {
    /// Score for one field.
    pub fn get(&self, field: FieldKind) -> f32 {
        match field {
            FieldKind::Title => self.title,
            FieldKind::Summary => self.summary,
            FieldKind::Tags => self.tags,
        }
    }

    /// Set the score for one field.
    pub fn set(&mut self, field: FieldKind, score: f32) {
        match field {
            FieldKind::Title => self.title = score,
            FieldKind::Summary => self.summary = score,
            FieldKind::Tags => self.tags = score,
        }
    }

    /// Weighted overall score: `0.5·summary + 0.3·title + 0.2·tags`.
    pub fn overall(&self) -> f32 {
        FieldKind::ALL
            .iter()
            .map(|f| f.weight() * self.get(*f))
            .sum()
    }
}

/// Percentages rendered for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relevance {
    /// Title relevance, e.g. `"81.27%"`.
    pub title: String,
    /// Summary relevance.
    pub summary: String,
    /// Tags relevance.
    pub tags: String,
    /// Weighted overall relevance.
    pub overall: String,
}

/// One fused search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    /// Point identity.
    pub id: String,
    /// Payload title snapshot.
    pub article_title: String,
    /// Payload link snapshot.
    pub article_link: String,
    /// Raw per-field similarities.
    pub scores: PerFieldScore,
    /// Raw weighted overall score.
    pub overall: f32,
    /// Display percentages.
    pub relevance: Relevance,
}

/// A named query from an investment portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioQuery {
    /// Portfolio label, e.g. `FD_INVESTOR`.
    pub portfolio_tag: String,
    /// Query text.
    pub text: String,
}

impl PortfolioQuery {
    /// Create a portfolio query.
    pub fn new(portfolio_tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            portfolio_tag: portfolio_tag.into(),
            text: text.into(),
        }
    }
}

/// Fused results for one portfolio query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioResult {
    /// Portfolio label.
    pub portfolio_tag: String,
    /// Query text that was searched.
    pub query: String,
    /// Fused hits.
    pub results: Vec<FusedResult>,
}

// ============================================================================
// Index statistics
// ============================================================================

/// Statistics from an indexing run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of points written.
    pub points_indexed: usize,

    /// Number of articles skipped under the isolate policy.
    pub articles_failed: usize,

    /// Per-article failures (isolate policy only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<IndexFailure>,

    /// Embedding dimension used.
    pub embedding_dimension: usize,

    /// Build duration in milliseconds.
    pub build_duration_ms: u64,
}

/// An article that could not be indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFailure {
    /// Article link.
    pub link: String,
    /// Error message.
    pub message: String,
}

// ============================================================================
// Tests
// ============================================================================
