//! Field embedding with lazy, once-only provider initialization.
//!
//! `FieldEmbedder` owns the embedding provider for the whole process. The
//! provider is loaded on the first non-empty text; concurrent first callers
//! wait on the same initialization instead of loading the model twice.
//! Empty and whitespace-only texts never reach the provider.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;

use tidings_core::{Error, Result};

use crate::deadline::within;
use crate::embedding::{
    EmbeddingOptions, EmbeddingProvider, PreloadedProvider, ProviderLoader, l2_normalize,
};
use crate::types::{FieldKind, FieldTexts, FieldVectors};

/// Produces field vectors, short-circuiting empty text.
pub struct FieldEmbedder {
    loader: Arc<dyn ProviderLoader>,
    options: EmbeddingOptions,
    provider: OnceCell<Arc<dyn EmbeddingProvider>>,
    timeout: Option<Duration>,
}

impl FieldEmbedder {
    /// Create an embedder that loads its provider on first use.
    pub fn new(loader: Arc<dyn ProviderLoader>, options: EmbeddingOptions) -> Self {
        Self {
            loader,
            options,
            provider: OnceCell::new(),
            timeout: None,
        }
    }

    /// Create an embedder around an already constructed provider.
    pub fn with_provider(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let options = EmbeddingOptions::new(provider.name());
        Self::new(Arc::new(PreloadedProvider::new(provider)), options)
    }

    /// Bound model loading and every embedding call by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Options passed to the loader.
    pub fn options(&self) -> &EmbeddingOptions {
        &self.options
    }

    /// Whether the provider has been loaded.
    pub fn is_initialized(&self) -> bool {
        self.provider.initialized()
    }

    /// The provider, loading it if this is the first call.
    ///
    /// A load that outlives the timeout fails with [`Error::Timeout`] and
    /// leaves the embedder uninitialized, so the next call loads again.
    pub async fn provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let provider = self
            .provider
            .get_or_try_init(|| {
                log::debug!("initializing embedding provider for '{}'", self.options.model);
                let load = async {
                    self.loader.load(&self.options).await.map_err(|e| match e {
                        Error::ProviderInit(_) | Error::Config(_) => e,
                        other => Error::provider_init(other.to_string()),
                    })
                };
                within(
                    self.timeout,
                    || format!("loading embedding model '{}'", self.options.model),
                    load,
                )
            })
            .await?;
        Ok(provider.clone())
    }

    /// Dimension of the loaded provider.
    pub async fn dimension(&self) -> Result<usize> {
        Ok(self.provider().await?.dimension())
    }

    /// Embed one text; `None` when the text is empty or whitespace-only.
    pub async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let provider = self.provider().await?;
        let mut vector = within(
            self.timeout,
            || format!("embedding with '{}'", provider.name()),
            provider.embed(text),
        )
        .await?;
        if self.options.normalize {
            l2_normalize(&mut vector);
        }
        Ok(Some(vector))
    }

    /// Embed the three field texts concurrently.
    ///
    /// The first failure wins; the remaining field embeddings are dropped.
    pub async fn embed_fields(&self, texts: &FieldTexts) -> Result<FieldVectors> {
        let (title, summary, tags) = tokio::try_join!(
            self.embed(texts.get(FieldKind::Title)),
            self.embed(texts.get(FieldKind::Summary)),
            self.embed(texts.get(FieldKind::Tags)),
        )?;
        Ok(FieldVectors {
            title,
            summary,
            tags,
        })
    }
}

impl std::fmt::Debug for FieldEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldEmbedder")
            .field("model", &self.options.model)
            .field("initialized", &self.is_initialized())
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{MockEmbeddingProvider, MockProviderLoader, l2_norm};
    use async_trait::async_trait;

    fn lazy_embedder(dimension: usize) -> (Arc<MockProviderLoader>, FieldEmbedder) {
        let loader = Arc::new(MockProviderLoader::new(dimension));
        let embedder = FieldEmbedder::new(loader.clone(), EmbeddingOptions::new("mock"));
        (loader, embedder)
    }

    #[tokio::test]
    async fn test_empty_text_skips_provider() {
        let (loader, embedder) = lazy_embedder(8);

        assert!(embedder.embed("").await.unwrap().is_none());
        assert!(embedder.embed("   \n\t").await.unwrap().is_none());

        assert_eq!(loader.loads(), 0);
        assert!(!embedder.is_initialized());
    }

    #[tokio::test]
    async fn test_first_call_initializes_once() {
        let (loader, embedder) = lazy_embedder(8);

        let v1 = embedder.embed("first").await.unwrap().unwrap();
        let v2 = embedder.embed("second").await.unwrap().unwrap();

        assert_eq!(v1.len(), 8);
        assert_eq!(v2.len(), 8);
        assert_eq!(loader.loads(), 1);
        assert!(embedder.is_initialized());
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_share_initialization() {
        let (loader, embedder) = lazy_embedder(8);
        let embedder = Arc::new(embedder);

        let calls = (0..16).map(|i| {
            let embedder = embedder.clone();
            async move { embedder.embed(&format!("text {i}")).await }
        });
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(|r| matches!(r, Ok(Some(_)))));
        assert_eq!(loader.loads(), 1);
    }

    #[tokio::test]
    async fn test_embedding_is_unit_normalized() {
        let (_, embedder) = lazy_embedder(32);
        let vector = embedder.embed("normalize me").await.unwrap().unwrap();
        assert!((l2_norm(&vector) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_load_failure_is_provider_init() {
        let embedder = FieldEmbedder::new(
            Arc::new(MockProviderLoader::failing()),
            EmbeddingOptions::new("bge-m3"),
        );
        let err = embedder.embed("anything").await.unwrap_err();
        assert!(matches!(err, Error::ProviderInit(_)));
        assert!(!embedder.is_initialized());
    }

    #[tokio::test]
    async fn test_embed_fields_all_present() {
        let (_, embedder) = lazy_embedder(16);
        let texts = FieldTexts {
            title: "IRS Direct File".into(),
            summary: "Free filing ends".into(),
            tags: "Tax, IRS".into(),
        };

        let vectors = embedder.embed_fields(&texts).await.unwrap();
        assert_eq!(vectors.present(), 3);
        for field in FieldKind::ALL {
            let v = vectors.get(field).unwrap();
            assert_eq!(v.len(), 16);
            assert!((l2_norm(v) - 1.0).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_embed_fields_empty_tags() {
        let (_, embedder) = lazy_embedder(16);
        let texts = FieldTexts {
            title: "Title".into(),
            summary: "Summary".into(),
            tags: String::new(),
        };

        let vectors = embedder.embed_fields(&texts).await.unwrap();
        assert!(vectors.tags.is_none());
        assert_eq!(vectors.present(), 2);
    }

    #[tokio::test]
    async fn test_embed_fields_propagates_failure() {
        let provider = Arc::new(MockEmbeddingProvider::new(8).failing_on("poison"));
        let embedder = FieldEmbedder::with_provider(provider);
        let texts = FieldTexts {
            title: "fine".into(),
            summary: "poison pill".into(),
            tags: "fine".into(),
        };

        let err = embedder.embed_fields(&texts).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    struct StalledProvider;

    #[async_trait]
    impl EmbeddingProvider for StalledProvider {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![1.0])
        }

        fn dimension(&self) -> usize {
            1
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_embed_times_out() {
        let embedder = FieldEmbedder::with_provider(Arc::new(StalledProvider))
            .with_timeout(Some(Duration::from_secs(5)));
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(err.is_timeout());
    }

    struct StalledLoader;

    #[async_trait]
    impl ProviderLoader for StalledLoader {
        async fn load(&self, _options: &EmbeddingOptions) -> Result<Arc<dyn EmbeddingProvider>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Arc::new(MockEmbeddingProvider::new(4)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_model_load_times_out() {
        let embedder = FieldEmbedder::new(Arc::new(StalledLoader), EmbeddingOptions::new("bge-m3"))
            .with_timeout(Some(Duration::from_secs(5)));

        let err = embedder.embed("hello").await.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("bge-m3"));
        assert!(!embedder.is_initialized());
    }

    #[tokio::test]
    async fn test_dimension_reports_provider() {
        let (_, embedder) = lazy_embedder(24);
        assert_eq!(embedder.dimension().await.unwrap(), 24);
    }
}
