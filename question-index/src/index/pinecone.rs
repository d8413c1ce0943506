//! Pinecone REST client
//!
//! Control plane (list/create/describe/delete indexes) goes to the API host,
//! data plane (upsert/query) goes to the per-index host returned by describe.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{IndexMatch, IndexedVector, VectorIndex};
use crate::error::{Result, SearchError};

const API_VERSION: &str = "2024-07";

/// Pinecone connection and index settings
#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    pub index_name: String,
    /// Control plane base URL
    pub controller_url: String,
    /// Distance metric (default: cosine)
    pub metric: String,
    /// Serverless cloud (default: aws)
    pub cloud: String,
    /// Serverless region (default: us-east-1)
    pub region: String,
    /// Delay between readiness polls
    pub poll_interval: Duration,
    /// Give up waiting for create/delete after this long
    pub ready_timeout: Duration,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            index_name: "question-answering-chatbot".to_string(),
            controller_url: "https://api.pinecone.io".to_string(),
            metric: "cosine".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            poll_interval: Duration::from_secs(1),
            ready_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    name: String,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    status: Option<IndexStatus>,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: IndexSpec<'a>,
}

#[derive(Debug, Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [IndexedVector],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_values: bool,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<IndexMatch>,
}

/// Pinecone-backed vector index
pub struct PineconeIndex {
    config: PineconeConfig,
    client: Client,
    host: RwLock<Option<String>>,
}

impl PineconeIndex {
    pub fn new(config: PineconeConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(SearchError::index("Pinecone API key is not set"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            config,
            client,
            host: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &PineconeConfig {
        &self.config
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    fn controller(&self, method: Method, path: &str) -> RequestBuilder {
        let base = self.config.controller_url.trim_end_matches('/');
        self.request(method, format!("{}{}", base, path))
    }

    async fn list_indexes(&self) -> Result<Vec<IndexDescription>> {
        let response = self.controller(Method::GET, "/indexes").send().await?;
        let list: IndexList = check(response).await?.json().await?;
        Ok(list.indexes)
    }

    async fn describe(&self) -> Result<Option<IndexDescription>> {
        let path = format!("/indexes/{}", self.config.index_name);
        let response = self.controller(Method::GET, &path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(response).await?.json().await?))
    }

    async fn delete(&self) -> Result<()> {
        let path = format!("/indexes/{}", self.config.index_name);
        let response = self.controller(Method::DELETE, &path).send().await?;
        if response.status() != StatusCode::NOT_FOUND {
            check(response).await?;
        }
        *self.host.write() = None;
        Ok(())
    }

    async fn create(&self, dimension: usize) -> Result<()> {
        let body = CreateIndexRequest {
            name: &self.config.index_name,
            dimension,
            metric: &self.config.metric,
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &self.config.cloud,
                    region: &self.config.region,
                },
            },
        };

        let response = self
            .controller(Method::POST, "/indexes")
            .json(&body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn wait_until_deleted(&self) -> Result<()> {
        let started = tokio::time::Instant::now();
        loop {
            let listed = self
                .list_indexes()
                .await?
                .iter()
                .any(|index| index.name == self.config.index_name);
            if !listed {
                return Ok(());
            }
            if started.elapsed() >= self.config.ready_timeout {
                return Err(SearchError::index(format!(
                    "Timed out waiting for index '{}' to be deleted",
                    self.config.index_name
                )));
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn wait_until_ready(&self) -> Result<String> {
        let started = tokio::time::Instant::now();
        loop {
            if let Some(description) = self.describe().await? {
                let state = description.status.as_ref();
                if state.is_some_and(|s| s.ready) {
                    if let Some(host) = description.host {
                        return Ok(host);
                    }
                }
                log::debug!(
                    "Index '{}' not ready yet (state: {})",
                    self.config.index_name,
                    state
                        .and_then(|s| s.state.as_deref())
                        .unwrap_or("unknown")
                );
            }
            if started.elapsed() >= self.config.ready_timeout {
                return Err(SearchError::index(format!(
                    "Timed out waiting for index '{}' to become ready",
                    self.config.index_name
                )));
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Data plane base URL, resolved once through describe
    async fn data_url(&self) -> Result<String> {
        if let Some(host) = self.host.read().clone() {
            return Ok(host);
        }

        let description = self.describe().await?.ok_or_else(|| {
            SearchError::index(format!("Index '{}' does not exist", self.config.index_name))
        })?;
        let host = description.host.ok_or_else(|| {
            SearchError::index(format!("Index '{}' has no host yet", self.config.index_name))
        })?;

        let url = normalize_host(&host);
        *self.host.write() = Some(url.clone());
        Ok(url)
    }
}

/// Hosts come back without a scheme
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Turn non-success responses into `SearchError::Api`
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or(body);

    Err(SearchError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        &self.config.index_name
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self
            .list_indexes()
            .await?
            .iter()
            .any(|index| index.name == self.config.index_name))
    }

    async fn reset(&self, dimension: usize) -> Result<()> {
        if self.exists().await? {
            log::info!("Deleting existing Pinecone index '{}'", self.config.index_name);
            self.delete().await?;
            self.wait_until_deleted().await?;
        }

        log::info!(
            "Creating Pinecone index '{}' ({}d, {}, {}/{})",
            self.config.index_name,
            dimension,
            self.config.metric,
            self.config.cloud,
            self.config.region
        );
        self.create(dimension).await?;

        let host = self.wait_until_ready().await?;
        *self.host.write() = Some(normalize_host(&host));

        log::info!("Pinecone index '{}' ready at {}", self.config.index_name, host);
        Ok(())
    }

    async fn upsert(&self, vectors: Vec<IndexedVector>) -> Result<usize> {
        if vectors.is_empty() {
            return Ok(0);
        }

        let url = format!("{}/vectors/upsert", self.data_url().await?);
        let response = self
            .request(Method::POST, url)
            .json(&UpsertRequest { vectors: &vectors })
            .send()
            .await?;
        let body: UpsertResponse = check(response).await?.json().await?;
        Ok(body.upserted_count)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        if top_k == 0 {
            return Ok(vec![]);
        }

        let url = format!("{}/query", self.data_url().await?);
        let response = self
            .request(Method::POST, url)
            .json(&QueryRequest {
                vector,
                top_k,
                include_values: false,
                include_metadata: false,
            })
            .send()
            .await?;
        let body: QueryResponse = check(response).await?.json().await?;
        Ok(body.matches)
    }
}
