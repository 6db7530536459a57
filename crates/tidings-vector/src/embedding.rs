//! Embedding provider trait, provider loaders and the mock implementation.
//!
//! This module defines the `EmbeddingProvider` trait that abstracts over
//! different embedding generation backends, and the `ProviderLoader` trait
//! that knows how to bring a provider up. Loading is separated from use so
//! that `FieldEmbedder` can defer the (expensive) model load until the first
//! non-empty text arrives.
//!
//! # Providers
//!
//! - `MockEmbeddingProvider`: Deterministic fixed-dimension vectors for testing
//! - `FastEmbedProvider`: Local embedding via fastembed (requires `vector-fastembed` feature)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tidings_core::{Error, Result};

use crate::types::VectorConfig;

/// Trait for generating text embeddings.
///
/// Implementations wrap specific embedding libraries and provide a uniform
/// async interface. The trait requires `Send + Sync` to allow safe sharing
/// across async tasks.
///
/// # Thread Safety
///
/// Implementations should handle internal synchronization (e.g., `Arc<Mutex<>>`)
/// for thread-unsafe underlying libraries.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for a batch of texts.
    ///
    /// Default implementation calls `embed` for each text sequentially.
    /// Backends that support native batching should override this.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// The embedding dimension.
    fn dimension(&self) -> usize;

    /// The provider name for diagnostics.
    fn name(&self) -> &str;
}

// ============================================================================
// Loading
// ============================================================================

/// Token pooling strategy requested from the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    /// Average over all token embeddings.
    #[default]
    Mean,
    /// Use the `[CLS]` token embedding.
    Cls,
}

/// Options handed to a `ProviderLoader`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingOptions {
    /// Model identifier.
    pub model: String,
    /// Pooling strategy.
    pub pooling: Pooling,
    /// Whether output vectors are L2-normalized.
    pub normalize: bool,
    /// Model cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Whether cached model files may be used instead of downloading.
    pub allow_local_models: bool,
}

impl EmbeddingOptions {
    /// Options for a model with mean pooling and normalization.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            pooling: Pooling::Mean,
            normalize: true,
            cache_dir: None,
            allow_local_models: true,
        }
    }

    /// Options derived from the vector configuration.
    pub fn from_config(config: &VectorConfig) -> Self {
        Self {
            model: config.model.clone(),
            pooling: Pooling::Mean,
            normalize: config.normalize,
            cache_dir: config.cache_path.as_ref().map(PathBuf::from),
            allow_local_models: config.allow_local_models,
        }
    }

    /// Set the pooling strategy.
    pub fn with_pooling(mut self, pooling: Pooling) -> Self {
        self.pooling = pooling;
        self
    }

    /// Enable or disable normalization.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Set the model cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }
}

/// Brings an embedding provider up.
///
/// Called at most once per `FieldEmbedder`; failures surface as
/// `Error::ProviderInit`.
#[async_trait]
pub trait ProviderLoader: Send + Sync {
    /// Load the provider described by `options`.
    async fn load(&self, options: &EmbeddingOptions) -> Result<Arc<dyn EmbeddingProvider>>;
}

/// Loader that hands out an already constructed provider.
pub struct PreloadedProvider {
    provider: Arc<dyn EmbeddingProvider>,
}

impl PreloadedProvider {
    /// Wrap a provider.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ProviderLoader for PreloadedProvider {
    async fn load(&self, _options: &EmbeddingOptions) -> Result<Arc<dyn EmbeddingProvider>> {
        Ok(self.provider.clone())
    }
}

// ============================================================================
// Vector math
// ============================================================================

/// Euclidean norm of a vector.
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale a vector to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = l2_norm(vector);
    if norm > 0.0 {
        for val in vector.iter_mut() {
            *val /= norm;
        }
    }
}

/// Cosine similarity of two equal-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norms = l2_norm(a) * l2_norm(b);
    if norms > 0.0 { dot / norms } else { 0.0 }
}

// ============================================================================
// Mock provider
// ============================================================================

/// A mock embedding provider for testing.
///
/// Generates deterministic vectors based on the input text bytes.
/// Each component is derived from the text bytes, producing consistent
/// embeddings for the same input.
pub struct MockEmbeddingProvider {
    dimension: usize,
    fail_on: Option<String>,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    /// Create a new mock provider with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail_on: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every text that contains `needle`.
    pub fn failing_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on = Some(needle.into());
        self
    }

    /// Number of `embed` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Generate a deterministic embedding from text.
    fn deterministic_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];
        let bytes = text.as_bytes();

        for (i, val) in embedding.iter_mut().enumerate() {
            let byte_idx = i % bytes.len().max(1);
            let byte_val = if bytes.is_empty() {
                0u8
            } else {
                bytes[byte_idx]
            };
            *val = ((byte_val as f32 + i as f32) % 256.0) / 256.0;
        }

        l2_normalize(&mut embedding);
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(needle) = &self.fail_on {
            if text.contains(needle.as_str()) {
                return Err(Error::embedding(format!("mock refused text containing '{needle}'")));
            }
        }
        Ok(self.deterministic_embedding(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Loader producing `MockEmbeddingProvider`s; counts how often it ran.
pub struct MockProviderLoader {
    dimension: usize,
    fail: bool,
    loads: AtomicUsize,
}

impl MockProviderLoader {
    /// Loader for mock providers of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: false,
            loads: AtomicUsize::new(0),
        }
    }

    /// Loader whose every load fails.
    pub fn failing() -> Self {
        Self {
            dimension: 0,
            fail: true,
            loads: AtomicUsize::new(0),
        }
    }

    /// Number of loads performed.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderLoader for MockProviderLoader {
    async fn load(&self, options: &EmbeddingOptions) -> Result<Arc<dyn EmbeddingProvider>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        // Give concurrent first callers a chance to pile up on the cell.
        tokio::task::yield_now().await;
        if self.fail {
            return Err(Error::provider_init(format!(
                "mock loader refused model '{}'",
                options.model
            )));
        }
        Ok(Arc::new(MockEmbeddingProvider::new(self.dimension)))
    }
}

// ============================================================================
// Tests
// ============================================================================
