//! FastEmbed embedding provider.
//!
//! Wraps the `fastembed` crate to provide local embedding generation
//! via pre-trained ONNX models (e.g., BGE-large, multilingual E5).
//!
//! # Thread Safety
//!
//! `fastembed::TextEmbedding` is not `Send + Sync`, so we wrap it in
//! `Arc<Mutex<>>` and use `tokio::task::spawn_blocking` for embedding calls.
//! Model loading also happens on the blocking pool.
//!
//! # Feature Gate
//!
//! This module requires the `vector-fastembed` feature.

use crate::embedding::{EmbeddingOptions, EmbeddingProvider, Pooling, ProviderLoader, l2_normalize};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tidings_core::{Error, Result};

/// Map a model name string to a fastembed `EmbeddingModel` enum variant.
fn resolve_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "bge-small-en-v1.5" | "BGESmallENV15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "all-minilm-l6-v2" | "AllMiniLML6V2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-base-en-v1.5" | "BGEBaseENV15" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" | "BGELargeENV15" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "multilingual-e5-large" | "MultilingualE5Large" => {
            Ok(fastembed::EmbeddingModel::MultilingualE5Large)
        }
        other => Err(Error::config(format!(
            "Unknown embedding model: '{other}'. Supported: bge-small-en-v1.5, all-minilm-l6-v2, bge-base-en-v1.5, bge-large-en-v1.5, multilingual-e5-large"
        ))),
    }
}

/// FastEmbed-based embedding provider.
///
/// The model is loaded once and reused for all subsequent calls.
///
/// # Supported Models
///
/// | Name | Dimension | Size |
/// |------|-----------|------|
/// | `bge-small-en-v1.5` | 384 | ~50MB |
/// | `all-minilm-l6-v2` | 384 | ~80MB |
/// | `bge-base-en-v1.5` | 768 | ~130MB |
/// | `bge-large-en-v1.5` | 1024 | ~335MB |
/// | `multilingual-e5-large` | 1024 | ~2.2GB |
pub struct FastEmbedProvider {
    model: Arc<Mutex<fastembed::TextEmbedding>>,
    dimension: usize,
    model_name: String,
    normalize: bool,
}

impl FastEmbedProvider {
    /// Load a model synchronously.
    ///
    /// Downloads the model if it is not cached locally and local models are
    /// allowed. Prefer [`FastEmbedLoader`], which runs this off the runtime.
    pub fn new(options: &EmbeddingOptions) -> Result<Self> {
        let model_enum = resolve_model(&options.model)?;

        let mut init = fastembed::InitOptions::new(model_enum);
        if let Some(path) = &options.cache_dir {
            init = init.with_cache_dir(path.clone());
        }
        if !options.allow_local_models {
            log::debug!("allow_local_models=false has no fastembed equivalent; cache is still used");
        }
        if options.pooling != Pooling::Mean {
            log::debug!(
                "pooling {:?} requested; fastembed applies the model's native pooling",
                options.pooling
            );
        }

        let mut text_embedding = fastembed::TextEmbedding::try_new(init).map_err(|e| {
            Error::provider_init(format!("Failed to initialize fastembed model: {e}"))
        })?;

        // The model does not report its width; embed one sample to learn it.
        let sample = text_embedding
            .embed(vec!["dimension check"], None)
            .map_err(|e| Error::provider_init(format!("Failed to measure embedding dimension: {e}")))?;

        let dimension = sample
            .first()
            .map(|v| v.len())
            .ok_or_else(|| Error::provider_init("Model returned no embedding for the sample text"))?;

        log::info!("loaded embedding model {} ({dimension} dims)", options.model);

        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
            dimension,
            model_name: options.model.clone(),
            normalize: options.normalize,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.model.clone();
        let text = text.to_string();
        let normalize = self.normalize;

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| Error::embedding(format!("Mutex poisoned: {e}")))?;
            let results = model
                .embed(vec![text], None)
                .map_err(|e| Error::embedding(format!("Embedding failed: {e}")))?;
            let mut vector = results
                .into_iter()
                .next()
                .ok_or_else(|| Error::embedding("No embedding returned"))?;
            if normalize {
                l2_normalize(&mut vector);
            }
            Ok(vector)
        })
        .await
        .map_err(|e| Error::embedding(format!("spawn_blocking failed: {e}")))?
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let model = self.model.clone();
        let texts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let normalize = self.normalize;

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| Error::embedding(format!("Mutex poisoned: {e}")))?;
            let mut vectors = model
                .embed(texts, None)
                .map_err(|e| Error::embedding(format!("Batch embedding failed: {e}")))?;
            if normalize {
                vectors.iter_mut().for_each(|v| l2_normalize(v));
            }
            Ok(vectors)
        })
        .await
        .map_err(|e| Error::embedding(format!("spawn_blocking failed: {e}")))?
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

/// Loads a [`FastEmbedProvider`] on the blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastEmbedLoader;

#[async_trait]
impl ProviderLoader for FastEmbedLoader {
    async fn load(&self, options: &EmbeddingOptions) -> Result<Arc<dyn EmbeddingProvider>> {
        let options = options.clone();
        let provider = tokio::task::spawn_blocking(move || FastEmbedProvider::new(&options))
            .await
            .map_err(|e| Error::provider_init(format!("spawn_blocking failed: {e}")))??;
        Ok(Arc::new(provider))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::l2_norm;

    #[test]
    fn test_resolve_model_known() {
        assert!(resolve_model("bge-small-en-v1.5").is_ok());
        assert!(resolve_model("all-minilm-l6-v2").is_ok());
        assert!(resolve_model("bge-base-en-v1.5").is_ok());
        assert!(resolve_model("bge-large-en-v1.5").is_ok());
        assert!(resolve_model("multilingual-e5-large").is_ok());
    }

    #[test]
    fn test_resolve_model_aliases() {
        assert!(resolve_model("BGELargeENV15").is_ok());
        assert!(resolve_model("AllMiniLML6V2").is_ok());
    }

    #[test]
    fn test_resolve_model_unknown() {
        let err = resolve_model("nonexistent-model").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding model"));
    }

    #[tokio::test]
    async fn test_loader_rejects_unknown_model() {
        let err = FastEmbedLoader
            .load(&EmbeddingOptions::new("nonexistent-model"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    // Integration tests requiring model download are gated with #[ignore]
    #[tokio::test]
    #[ignore = "requires model download (~50MB)"]
    async fn test_fastembed_embed_single() {
        let provider = FastEmbedLoader
            .load(&EmbeddingOptions::new("bge-small-en-v1.5"))
            .await
            .unwrap();
        assert_eq!(provider.dimension(), 384);

        let embedding = provider.embed("Hello world").await.unwrap();
        assert_eq!(embedding.len(), 384);
        assert!((l2_norm(&embedding) - 1.0).abs() < 1e-3);
    }

    #[tokio::test]
    #[ignore = "requires model download (~50MB)"]
    async fn test_fastembed_deterministic() {
        let provider = FastEmbedProvider::new(&EmbeddingOptions::new("bge-small-en-v1.5")).unwrap();
        let e1 = provider.embed("same text").await.unwrap();
        let e2 = provider.embed("same text").await.unwrap();
        assert_eq!(e1, e2);
    }
}
