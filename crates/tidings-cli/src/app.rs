//! TidingsCli application.
//!
//! Owns the resolved [`TidingsConfig`], builds the store and embedding
//! loader it names, and dispatches parsed commands to the handlers.

use crate::cli::{CliArgs, Command};
use crate::config::TidingsConfig;
use crate::{config_handlers, handlers};
use std::path::Path;
use std::sync::Arc;
use tidings_core::{Error, Result};
use tidings_vector::{
    ArticleSearch, MemoryVectorStore, MockProviderLoader, ProviderLoader, QdrantStore,
    VectorStore,
};
use tracing_subscriber::EnvFilter;

// ============================================================================
// TidingsCli
// ============================================================================

/// The `tidings` command-line application.
pub struct TidingsCli {
    name: String,
    config: TidingsConfig,
    version: String,
}

impl TidingsCli {
    /// Create from CLI args, loading config from file/env and applying
    /// the `--backend`, `--provider` and `--collection` overrides.
    pub fn from_args(name: impl Into<String>, args: &CliArgs) -> Result<Self> {
        let mut config = TidingsConfig::load(args.config.as_deref())?;
        if let Some(backend) = &args.backend {
            config.vector.backend = backend.clone();
        }
        if let Some(provider) = &args.provider {
            config.vector.provider = provider.clone();
        }
        if let Some(collection) = &args.collection {
            config.vector.collection = collection.clone();
        }
        Ok(Self::new(name, config))
    }

    /// Create a new CLI application.
    pub fn new(name: impl Into<String>, config: TidingsConfig) -> Self {
        Self {
            name: name.into(),
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Override the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// The resolved configuration.
    pub fn config(&self) -> &TidingsConfig {
        &self.config
    }

    /// Initialise tracing-based logging.
    ///
    /// Uses `RUST_LOG` env var if set, otherwise defaults based on verbosity flags.
    pub fn init_logging(&self, verbose: bool, quiet: bool) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if quiet {
            EnvFilter::new("warn")
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        };

        // Ignore error if a subscriber is already set (e.g. in tests).
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Build the vector store named by `vector.backend`.
    pub fn build_store(&self) -> Result<Arc<dyn VectorStore>> {
        match self.config.vector.backend.as_str() {
            "memory" => Ok(Arc::new(MemoryVectorStore::new())),
            "qdrant" => {
                let qdrant = &self.config.qdrant;
                let store =
                    QdrantStore::new(&qdrant.url, qdrant.api_key.as_deref(), qdrant.timeout())?;
                Ok(Arc::new(store))
            }
            other => Err(Error::config(format!(
                "unknown store backend '{other}' (expected 'qdrant' or 'memory')"
            ))),
        }
    }

    /// Build the embedding loader named by `vector.provider`.
    pub fn build_loader(&self) -> Result<Arc<dyn ProviderLoader>> {
        match self.config.vector.provider.as_str() {
            "mock" => Ok(Arc::new(MockProviderLoader::new(
                self.config.vector.dimension,
            ))),
            #[cfg(feature = "vector-fastembed")]
            "fastembed" => Ok(Arc::new(tidings_vector::FastEmbedLoader)),
            #[cfg(not(feature = "vector-fastembed"))]
            "fastembed" => Err(Error::config(
                "the fastembed provider requires building with the 'vector-fastembed' feature",
            )),
            other => Err(Error::config(format!(
                "unknown embedding provider '{other}' (expected 'fastembed' or 'mock')"
            ))),
        }
    }

    /// Build the search facade from the configured store and provider.
    pub fn engine(&self) -> Result<ArticleSearch> {
        let store = self.build_store()?;
        let loader = self.build_loader()?;
        tracing::debug!(
            store = store.name(),
            provider = %self.config.vector.provider,
            model = %self.config.vector.model,
            "search engine configured"
        );
        Ok(ArticleSearch::new(self.config.vector.clone(), store, loader))
    }

    /// Run the CLI with the given arguments.
    pub async fn run(&self, args: CliArgs) -> Result<()> {
        self.init_logging(args.verbose, args.quiet);

        match args.command {
            Some(Command::Version) => {
                println!("{} {}", self.name, self.version);
                Ok(())
            }
            Some(Command::Config(config_cmd)) => {
                config_handlers::handle_config_command(args.config.as_deref(), config_cmd.command)
            }
            Some(Command::Index { file }) => {
                handlers::handle_index(&self.engine()?, Path::new(&file)).await?;
                Ok(())
            }
            Some(Command::Search {
                query,
                top_k,
                output,
            }) => {
                let output = output.as_deref().map(Path::new);
                handlers::handle_search(&self.engine()?, &query, top_k, output).await?;
                Ok(())
            }
            Some(Command::Portfolio {
                queries,
                top_k,
                output,
            }) => {
                let queries = queries.as_deref().map(Path::new);
                let output = output.as_deref().map(Path::new);
                handlers::handle_portfolio(&self.engine()?, queries, top_k, output).await?;
                Ok(())
            }
            Some(Command::Run {
                file,
                output,
                queries,
                top_k,
            }) => {
                let queries = queries.as_deref().map(Path::new);
                handlers::handle_run(
                    &self.engine()?,
                    Path::new(&file),
                    Path::new(&output),
                    queries,
                    top_k,
                )
                .await?;
                Ok(())
            }
            Some(Command::Demo { top_k }) => {
                handlers::handle_demo(&self.engine()?, top_k).await?;
                Ok(())
            }
            Some(Command::DeleteCollection) => {
                handlers::handle_delete(&self.engine()?).await?;
                Ok(())
            }
            None => {
                println!("{} {}: use --help for usage", self.name, self.version);
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for TidingsCli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TidingsCli")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("backend", &self.config.vector.backend)
            .field("provider", &self.config.vector.provider)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn offline_config() -> TidingsConfig {
        let mut config = TidingsConfig::default();
        config.vector.backend = "memory".into();
        config.vector.provider = "mock".into();
        config.vector.dimension = 32;
        config
    }

    #[test]
    fn test_tidings_cli_new() {
        let cli = TidingsCli::new("tidings", offline_config());
        assert_eq!(cli.name, "tidings");
        assert_eq!(cli.config().vector.dimension, 32);
    }

    #[test]
    fn test_tidings_cli_with_version() {
        let cli = TidingsCli::new("tidings", offline_config()).with_version("1.2.3");
        assert_eq!(cli.version, "1.2.3");
    }

    #[test]
    fn test_from_args_applies_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[vector]\ncollection = \"from-file\"\n").unwrap();

        let args = CliArgs::parse_from([
            "tidings",
            "--config",
            path.to_str().unwrap(),
            "--backend",
            "memory",
            "--provider",
            "mock",
        ]);
        let cli = TidingsCli::from_args("tidings", &args).unwrap();
        assert_eq!(cli.config().vector.collection, "from-file");
        assert_eq!(cli.config().vector.backend, "memory");
        assert_eq!(cli.config().vector.provider, "mock");
    }

    #[test]
    fn test_build_store_unknown_backend() {
        let mut config = offline_config();
        config.vector.backend = "lance".into();
        let err = TidingsCli::new("tidings", config).build_store().err().unwrap();
        assert!(err.to_string().contains("unknown store backend"));
    }

    #[test]
    fn test_build_store_qdrant() {
        let mut config = offline_config();
        config.vector.backend = "qdrant".into();
        let store = TidingsCli::new("tidings", config).build_store().unwrap();
        assert_eq!(store.name(), "qdrant");
    }

    #[test]
    fn test_build_store_qdrant_bad_url() {
        let mut config = offline_config();
        config.vector.backend = "qdrant".into();
        config.qdrant.url = "localhost:6333".into();
        assert!(TidingsCli::new("tidings", config).build_store().is_err());
    }

    #[test]
    fn test_build_loader_unknown_provider() {
        let mut config = offline_config();
        config.vector.provider = "openai".into();
        let err = TidingsCli::new("tidings", config).build_loader().err().unwrap();
        assert!(err.to_string().contains("unknown embedding provider"));
    }

    #[cfg(not(feature = "vector-fastembed"))]
    #[test]
    fn test_build_loader_fastembed_requires_feature() {
        let mut config = offline_config();
        config.vector.provider = "fastembed".into();
        let err = TidingsCli::new("tidings", config).build_loader().err().unwrap();
        assert!(err.to_string().contains("vector-fastembed"));
    }

    #[tokio::test]
    async fn test_run_version_command() {
        let cli = TidingsCli::new("tidings", offline_config()).with_version("0.1.0");
        let args = CliArgs::parse_from(["tidings", "version"]);
        assert!(cli.run(args).await.is_ok());
    }

    #[tokio::test]
    async fn test_run_no_command() {
        let cli = TidingsCli::new("tidings", offline_config());
        let args = CliArgs::parse_from(["tidings"]);
        assert!(cli.run(args).await.is_ok());
    }

    #[tokio::test]
    async fn test_run_demo_offline() {
        let cli = TidingsCli::new("tidings", offline_config());
        let args = CliArgs::parse_from(["tidings", "demo"]);
        assert!(cli.run(args).await.is_ok());
    }

    #[tokio::test]
    async fn test_run_index_missing_file_fails() {
        let cli = TidingsCli::new("tidings", offline_config());
        let args = CliArgs::parse_from(["tidings", "index", "/nonexistent/articles.json"]);
        assert!(cli.run(args).await.is_err());
    }

    #[tokio::test]
    async fn test_run_command_writes_results() {
        let dir = tempfile::TempDir::new().unwrap();
        let articles = dir.path().join("articles.json");
        let batch = tidings_vector::ArticleBatch {
            articles: vec![handlers::demo_article()],
        };
        std::fs::write(&articles, serde_json::to_string(&batch).unwrap()).unwrap();
        let output = dir.path().join("search_results.json");

        let cli = TidingsCli::new("tidings", offline_config());
        let args = CliArgs::parse_from([
            "tidings",
            "run",
            articles.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ]);
        cli.run(args).await.unwrap();
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_config_command_dispatch() {
        let cli = TidingsCli::new("tidings", offline_config());
        let args = CliArgs::parse_from(["tidings", "config", "path"]);
        assert!(cli.run(args).await.is_ok());
    }

    #[test]
    fn test_init_logging_does_not_panic() {
        let cli = TidingsCli::new("tidings", offline_config());
        cli.init_logging(false, false);
        cli.init_logging(true, false);
        cli.init_logging(false, true);
    }
}
