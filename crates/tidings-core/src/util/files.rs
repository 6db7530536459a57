//! Async file utilities for the Tidings harness.
//!
//! Article batches, portfolio queries and search results all travel as
//! pretty-printed JSON files; these helpers keep the path in every error.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;

use crate::{Error, Result};

/// Read a file's contents as a string.
pub async fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .await
        .map_err(|e| Error::io_with_path(e, path))
}

/// Read and deserialize a JSON file.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = read_file(path).await?;
    serde_json::from_str(&json)
        .map_err(|e| Error::serialization(format!("{}: {e}", path.display())))
}

/// Serialize a value as pretty JSON and write it, replacing any existing file.
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)
        .await
        .map_err(|e| Error::io_with_path(e, path))?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        tags: Vec<String>,
    }

    #[tokio::test]
    async fn test_write_then_read_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sample.json");
        let sample = Sample {
            name: "irs".into(),
            tags: vec!["Tax".into(), "IRS".into()],
        };

        write_json(&path, &sample).await.unwrap();
        assert!(path.exists());

        let text = read_file(&path).await.unwrap();
        assert!(text.contains('\n'), "output should be pretty-printed");

        let loaded: Sample = read_json(&path).await.unwrap();
        assert_eq!(loaded, sample);
    }

    #[tokio::test]
    async fn test_read_json_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.json");

        let err = read_json::<Sample>(&path).await.unwrap_err();
        assert!(matches!(err, Error::IoWithPath { .. }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_read_json_invalid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        fs::write(&path, "{ not json").await.unwrap();

        let err = read_json::<Sample>(&path).await.unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.to_string().contains("bad.json"));
    }
}
