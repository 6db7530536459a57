//! Qdrant vector store over the REST API.
//!
//! Talks to a Qdrant server (default `http://localhost:6333`) using
//! collections with named vectors. Every response is wrapped in Qdrant's
//! `{ "result": ..., "status": ..., "time": ... }` envelope.
//!
//! # Error Mapping
//!
//! | Condition | Error |
//! |-----------|-------|
//! | connection refused / DNS failure | `StoreUnavailable` |
//! | client deadline exceeded | `Timeout` |
//! | create on an existing name | `CollectionExists` |
//! | any other non-2xx status | `Store` (status and body) |
//!
//! # Feature Gate
//!
//! This module requires the `vector-qdrant` feature.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use tidings_core::{Error, Result};

use crate::store::VectorStore;
use crate::types::{
    ArticlePayload, CollectionSchema, IndexedPoint, ScoredPoint, UpsertAck, VectorQuery,
    VectorSpace,
};

/// Default Qdrant endpoint.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";

/// Qdrant REST client implementing [`VectorStore`].
#[derive(Clone)]
pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl QdrantStore {
    /// Build a client for the server at `url`.
    ///
    /// # Arguments
    ///
    /// * `url` - Base URL, e.g. `http://localhost:6333`
    /// * `api_key` - Value for the `api-key` header, if the server requires one
    /// * `timeout` - Per-request deadline
    pub fn new(url: &str, api_key: Option<&str>, timeout: Option<Duration>) -> Result<Self> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::config(format!(
                "Qdrant URL must be an http(s) URL, got '{url}'"
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(key)
                .map_err(|e| Error::config(format!("invalid Qdrant API key: {e}")))?;
            headers.insert("api-key", value);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::config(format!("failed to build Qdrant HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn transport_error(&self, operation: &str, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            return Error::timeout(
                format!("Qdrant {operation}"),
                self.timeout.unwrap_or_default(),
            );
        }
        if err.is_connect() || err.is_request() {
            return Error::store_unavailable(format!(
                "Qdrant {operation} at {}: {err}",
                self.base_url
            ));
        }
        Error::store(format!("Qdrant {operation}: {err}"))
    }

    async fn send(&self, operation: &str, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        log::debug!("qdrant: {operation}");
        request
            .send()
            .await
            .map_err(|e| self.transport_error(operation, e))
    }

    async fn status_error(operation: &str, response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        Error::store(format!("Qdrant {operation} failed ({status}): {body}"))
    }

    async fn parse<T: DeserializeOwned>(&self, operation: &str, response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(Self::status_error(operation, response).await);
        }
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| Error::store(format!("Qdrant {operation}: malformed response: {e}")))?;
        Ok(envelope.result)
    }
}

impl std::fmt::Debug for QdrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantStore")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionList {
    #[serde(default)]
    collections: Vec<CollectionName>,
}

#[derive(Debug, Deserialize)]
struct CollectionName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    config: CollectionConfig,
}

#[derive(Debug, Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Debug, Deserialize)]
struct CollectionParams {
    vectors: VectorsConfig,
}

/// Qdrant reports either one unnamed space or a map of named spaces.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VectorsConfig {
    Single(VectorSpace),
    Named(BTreeMap<String, VectorSpace>),
}

impl From<VectorsConfig> for CollectionSchema {
    fn from(config: VectorsConfig) -> Self {
        let vectors = match config {
            // An unnamed space matches none of the article fields.
            VectorsConfig::Single(space) => BTreeMap::from([(String::new(), space)]),
            VectorsConfig::Named(spaces) => spaces,
        };
        CollectionSchema { vectors }
    }
}

#[derive(Debug, Serialize)]
struct CreateCollection<'a> {
    vectors: &'a BTreeMap<String, VectorSpace>,
}

#[derive(Debug, Serialize)]
struct UpsertPoints<'a> {
    points: Vec<PointStruct<'a>>,
}

#[derive(Debug, Serialize)]
struct PointStruct<'a> {
    id: &'a str,
    vector: BTreeMap<&'static str, &'a [f32]>,
    payload: &'a ArticlePayload,
}

impl<'a> From<&'a IndexedPoint> for PointStruct<'a> {
    fn from(point: &'a IndexedPoint) -> Self {
        Self {
            id: &point.id,
            vector: point
                .vectors
                .iter()
                .map(|(field, v)| (field.as_str(), v.as_slice()))
                .collect(),
            payload: &point.payload,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpdateResult {
    #[serde(default)]
    operation_id: Option<u64>,
    status: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: NamedVector<'a>,
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Serialize)]
struct NamedVector<'a> {
    name: &'static str,
    vector: &'a [f32],
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PointId {
    Uuid(String),
    Num(u64),
}

impl From<PointId> for String {
    fn from(id: PointId) -> Self {
        match id {
            PointId::Uuid(s) => s,
            PointId::Num(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: PointId,
    score: f32,
    #[serde(default)]
    payload: Option<ArticlePayload>,
}

fn is_already_exists(status: StatusCode, body: &str) -> bool {
    status == StatusCode::CONFLICT || body.to_ascii_lowercase().contains("already exists")
}

// ============================================================================
// VectorStore implementation
// ============================================================================

#[async_trait]
impl VectorStore for QdrantStore {
    async fn list_collections(&self) -> Result<Vec<String>> {
        let response = self
            .send("list collections", self.client.get(self.url("/collections")))
            .await?;
        let list: CollectionList = self.parse("list collections", response).await?;
        Ok(list.collections.into_iter().map(|c| c.name).collect())
    }

    async fn create_collection(&self, name: &str, schema: &CollectionSchema) -> Result<()> {
        let operation = format!("create collection '{name}'");
        let request = self
            .client
            .put(self.url(&format!("/collections/{name}")))
            .json(&CreateCollection {
                vectors: &schema.vectors,
            });
        let response = self.send(&operation, request).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        if is_already_exists(status, &body) {
            return Err(Error::collection_exists(name));
        }
        Err(Error::store(format!(
            "Qdrant {operation} failed ({status}): {body}"
        )))
    }

    async fn collection_schema(&self, name: &str) -> Result<Option<CollectionSchema>> {
        let operation = format!("get collection '{name}'");
        let response = self
            .send(&operation, self.client.get(self.url(&format!("/collections/{name}"))))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let info: CollectionInfo = self.parse(&operation, response).await?;
        Ok(Some(info.config.params.vectors.into()))
    }

    async fn upsert(&self, name: &str, points: Vec<IndexedPoint>, wait: bool) -> Result<UpsertAck> {
        let operation = format!("upsert {} points into '{name}'", points.len());
        let body = UpsertPoints {
            points: points.iter().map(PointStruct::from).collect(),
        };
        let request = self
            .client
            .put(self.url(&format!("/collections/{name}/points?wait={wait}")))
            .json(&body);
        let response = self.send(&operation, request).await?;
        let result: UpdateResult = self.parse(&operation, response).await?;

        Ok(UpsertAck {
            operation_id: result.operation_id,
            completed: result.status == "completed",
        })
    }

    async fn search(&self, name: &str, query: VectorQuery) -> Result<Vec<ScoredPoint>> {
        let operation = format!("search '{}' in '{name}'", query.vector_name);
        let body = SearchRequest {
            vector: NamedVector {
                name: query.vector_name.as_str(),
                vector: &query.vector,
            },
            limit: query.limit,
            with_payload: query.with_payload,
        };
        let request = self
            .client
            .post(self.url(&format!("/collections/{name}/points/search")))
            .json(&body);
        let response = self.send(&operation, request).await?;
        let hits: Vec<SearchHit> = self.parse(&operation, response).await?;

        Ok(hits
            .into_iter()
            .map(|hit| ScoredPoint {
                id: hit.id.into(),
                score: hit.score,
                payload: hit.payload,
            })
            .collect())
    }

    async fn delete_collection(&self, name: &str) -> Result<bool> {
        let operation = format!("delete collection '{name}'");
        let response = self
            .send(&operation, self.client.delete(self.url(&format!("/collections/{name}"))))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        self.parse(&operation, response).await
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

// ============================================================================
// Tests
// ============================================================================
