//! Handler functions for the indexing and search commands.
//!
//! Each handler takes a ready [`ArticleSearch`], prints its result as
//! pretty JSON on stdout, and returns it. Status lines go through `log`.
//! Output files are written only after every step succeeded.

use std::path::Path;
use tidings_core::{Error, Result, read_json, write_json};
use tidings_vector::{
    Article, ArticleBatch, ArticleSearch, FusedResult, IndexStats, PortfolioQuery,
    PortfolioResult,
};

/// Query used by the `demo` command.
pub const DEMO_QUERY: &str = "Tax policy changes impacting fixed income investors";

// ============================================================================
// Built-in data
// ============================================================================

/// Portfolio queries used when no queries file is given.
pub fn default_portfolio() -> Vec<PortfolioQuery> {
    vec![
        PortfolioQuery::new(
            "FD_INVESTOR",
            "Government fiscal policies and tax regulations affecting fixed income investments",
        ),
        PortfolioQuery::new(
            "TECH_GROWTH",
            "Technology sector innovations and digital transformation trends",
        ),
    ]
}

/// The sample article indexed by the `demo` command.
pub fn demo_article() -> Article {
    Article::new(
        "https://economictimes.indiatimes.com/news/international/us/taxpayers-lose-free-irs-tax-filing-service",
        "IRS Direct File Program Eliminated, Taxpayers Seek Alternatives for 2026",
    )
    .with_published_time("2026-01-06T17:41:00.000Z")
    .with_tags(["Tax", "IRS", "Fiscal Policy"])
    .with_introduction("The IRS Direct File program allowed free filing for millions.")
    .with_description("<p>The program was terminated after political criticism.</p>")
}

// ============================================================================
// Input loading
// ============================================================================

/// Read an `{"articles": [...]}` file.
pub async fn load_articles(path: &Path) -> Result<Vec<Article>> {
    let batch: ArticleBatch = read_json(path).await?;
    log::debug!("read {} articles from {}", batch.articles.len(), path.display());
    Ok(batch.articles)
}

/// Read a portfolio queries file, or fall back to [`default_portfolio`].
pub async fn load_queries(path: Option<&Path>) -> Result<Vec<PortfolioQuery>> {
    let queries = match path {
        Some(path) => read_json::<Vec<PortfolioQuery>>(path).await?,
        None => default_portfolio(),
    };
    if queries.is_empty() {
        return Err(Error::invalid_input("portfolio query list is empty"));
    }
    Ok(queries)
}

// ============================================================================
// Command handlers
// ============================================================================

/// Index the articles in `file`.
pub async fn handle_index(search: &ArticleSearch, file: &Path) -> Result<IndexStats> {
    let articles = load_articles(file).await?;
    let stats = search.index(&articles).await?;
    log::info!(
        "indexed {} of {} articles into '{}' in {} ms",
        stats.points_indexed,
        articles.len(),
        search.config().collection,
        stats.build_duration_ms
    );
    print_json(&stats)?;
    Ok(stats)
}

/// Run one fused search.
pub async fn handle_search(
    search: &ArticleSearch,
    query: &str,
    top_k: Option<usize>,
    output: Option<&Path>,
) -> Result<Vec<FusedResult>> {
    let top_k = top_k.unwrap_or(search.config().default_top_k);
    let results = search.search(query, top_k).await?;
    print_json(&results)?;
    if let Some(path) = output {
        write_json(path, &results).await?;
        log::info!("wrote {} results to {}", results.len(), path.display());
    }
    Ok(results)
}

/// Search every portfolio query.
pub async fn handle_portfolio(
    search: &ArticleSearch,
    queries: Option<&Path>,
    top_k: Option<usize>,
    output: Option<&Path>,
) -> Result<Vec<PortfolioResult>> {
    let queries = load_queries(queries).await?;
    let top_k = top_k.unwrap_or(search.config().default_top_k);
    let results = search.search_portfolio(&queries, top_k).await?;
    print_json(&results)?;
    if let Some(path) = output {
        write_json(path, &results).await?;
        log::info!("wrote results for {} queries to {}", results.len(), path.display());
    }
    Ok(results)
}

/// Index `file`, search the portfolio, then write `output`.
pub async fn handle_run(
    search: &ArticleSearch,
    file: &Path,
    output: &Path,
    queries: Option<&Path>,
    top_k: Option<usize>,
) -> Result<Vec<PortfolioResult>> {
    let articles = load_articles(file).await?;
    let queries = load_queries(queries).await?;

    let stats = search.index(&articles).await?;
    log::info!(
        "indexed {} articles ({} failed)",
        stats.points_indexed,
        stats.articles_failed
    );

    let top_k = top_k.unwrap_or(search.config().default_top_k);
    let results = search.search_portfolio(&queries, top_k).await?;
    print_json(&results)?;

    write_json(output, &results).await?;
    log::info!("results saved to {}", output.display());
    Ok(results)
}

/// Index the sample article and search it with [`DEMO_QUERY`].
pub async fn handle_demo(search: &ArticleSearch, top_k: Option<usize>) -> Result<Vec<FusedResult>> {
    let indexed = search.index_articles(&[demo_article()]).await?;
    log::info!("indexed {indexed} sample article");
    handle_search(search, DEMO_QUERY, top_k, None).await
}

/// Drop the collection.
pub async fn handle_delete(search: &ArticleSearch) -> Result<bool> {
    let collection = &search.config().collection;
    let deleted = search.delete_collection().await?;
    if deleted {
        println!("Deleted collection '{collection}'");
    } else {
        println!("Collection '{collection}' does not exist");
    }
    Ok(deleted)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tidings_vector::{MemoryVectorStore, MockProviderLoader, VectorConfig};

    const DIM: usize = 32;

    fn engine() -> (Arc<MemoryVectorStore>, ArticleSearch) {
        let store = Arc::new(MemoryVectorStore::new());
        let config = VectorConfig {
            backend: "memory".into(),
            provider: "mock".into(),
            dimension: DIM,
            ..Default::default()
        };
        let search = ArticleSearch::new(config, store.clone(), Arc::new(MockProviderLoader::new(DIM)));
        (store, search)
    }

    fn write_articles(dir: &Path, articles: &[Article]) -> std::path::PathBuf {
        let path = dir.join("articles.json");
        let batch = ArticleBatch {
            articles: articles.to_vec(),
        };
        std::fs::write(&path, serde_json::to_string(&batch).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_default_portfolio() {
        let queries = default_portfolio();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].portfolio_tag, "FD_INVESTOR");
        assert_eq!(queries[1].portfolio_tag, "TECH_GROWTH");
    }

    #[test]
    fn test_demo_article() {
        let article = demo_article();
        assert_eq!(article.tags, vec!["Tax", "IRS", "Fiscal Policy"]);
        assert_eq!(
            article.published_time.as_deref(),
            Some("2026-01-06T17:41:00.000Z")
        );
        assert!(article.formatted_data.descriptive_paragraph.contains("<p>"));
    }

    #[tokio::test]
    async fn test_load_articles_reads_batch() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("articles.json");
        std::fs::write(
            &path,
            r#"{"articles": [{
                "original_link": "https://example.com/a",
                "published_time": "2026-01-06T17:41:00Z",
                "tags": ["Markets"],
                "formatted_data": {"title": "Bond yields rise"}
            }]}"#,
        )
        .unwrap();

        let articles = load_articles(&path).await.unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].formatted_data.title, "Bond yields rise");
        assert_eq!(articles[0].formatted_data.introductory_paragraph, "");
    }

    #[tokio::test]
    async fn test_load_articles_mixed_timestamp_formats() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("articles.json");
        std::fs::write(
            &path,
            r#"{"articles": [
                {"original_link": "https://example.com/a", "published_time": "2026-01-06T17:41:00.000Z",
                 "formatted_data": {"title": "First"}},
                {"original_link": "https://example.com/b", "published_time": "Tue, 06 Jan 2026 17:41:00 GMT",
                 "formatted_data": {"title": "Second"}}
            ]}"#,
        )
        .unwrap();

        let articles = load_articles(&path).await.unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].formatted_data.title, "First");
        assert_eq!(
            articles[1].published_time.as_deref(),
            Some("Tue, 06 Jan 2026 17:41:00 GMT")
        );
    }

    #[tokio::test]
    async fn test_load_articles_missing_file() {
        let err = load_articles(Path::new("/nonexistent/articles.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("articles.json"));
    }

    #[tokio::test]
    async fn test_load_queries_default_and_file() {
        assert_eq!(load_queries(None).await.unwrap(), default_portfolio());

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("queries.json");
        std::fs::write(&path, r#"[{"portfolio_tag": "CRYPTO", "text": "Digital assets"}]"#)
            .unwrap();
        let queries = load_queries(Some(&path)).await.unwrap();
        assert_eq!(queries, vec![PortfolioQuery::new("CRYPTO", "Digital assets")]);
    }

    #[tokio::test]
    async fn test_load_queries_rejects_empty_list() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("queries.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(load_queries(Some(&path)).await.is_err());
    }

    #[tokio::test]
    async fn test_handle_index() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_articles(dir.path(), &[demo_article()]);
        let (store, search) = engine();

        let stats = handle_index(&search, &path).await.unwrap();
        assert_eq!(stats.points_indexed, 1);
        assert_eq!(stats.embedding_dimension, DIM);
        assert_eq!(store.point_count("articles").await, 1);
    }

    #[tokio::test]
    async fn test_handle_search_writes_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let (_, search) = engine();
        search.index_articles(&[demo_article()]).await.unwrap();

        let output = dir.path().join("results.json");
        let results = handle_search(&search, "tax", Some(3), Some(&output))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);

        let written: Vec<FusedResult> =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written, results);
    }

    #[tokio::test]
    async fn test_handle_run_writes_results() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_articles(dir.path(), &[demo_article()]);
        let output = dir.path().join("search_results.json");
        let (_, search) = engine();

        let results = handle_run(&search, &path, &output, None, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].portfolio_tag, "FD_INVESTOR");
        assert_eq!(results[0].results.len(), 1);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written[1]["portfolio_tag"], "TECH_GROWTH");
    }

    #[tokio::test]
    async fn test_handle_run_missing_input_writes_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("search_results.json");
        let (store, search) = engine();

        let result = handle_run(
            &search,
            &dir.path().join("missing.json"),
            &output,
            None,
            None,
        )
        .await;
        assert!(result.is_err());
        assert!(!output.exists());
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_handle_demo() {
        let (_, search) = engine();
        let results = handle_demo(&search, None).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].article_link, demo_article().original_link);
        assert!(results[0].relevance.overall.ends_with('%'));
    }

    #[tokio::test]
    async fn test_handle_delete() {
        let (_, search) = engine();
        assert!(!handle_delete(&search).await.unwrap());

        search.ensure_collection().await.unwrap();
        assert!(handle_delete(&search).await.unwrap());
    }
}
