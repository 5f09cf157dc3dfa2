use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;

use crate::config::AppConfig;
use crate::providers::traits::{VectorMatch, VectorRecord, VectorStore};

const API_VERSION: &str = "2024-07";
const UPSERT_BATCH_SIZE: usize = 32;
const READY_POLL_ATTEMPTS: u32 = 60;
const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
    #[serde(default)]
    dimension: Option<u64>,
    status: Option<IndexStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

/// Pinecone serverless index over its REST API.
#[derive(Clone)]
pub struct PineconeStore {
    api_key: String,
    client: Client,
    control_url: Url,
    cloud: String,
    region: String,
    hosts: Arc<RwLock<HashMap<String, Url>>>,
}

impl PineconeStore {
    pub fn new(api_key: &str, config: &AppConfig) -> Result<Self> {
        let control_url = Url::parse(&config.pinecone.api_url)
            .with_context(|| format!("Invalid Pinecone API url '{}'", config.pinecone.api_url))?;

        Ok(Self {
            api_key: api_key.to_string(),
            client: Client::new(),
            control_url,
            cloud: config.pinecone_cloud.clone(),
            region: config.pinecone_region.clone(),
            hosts: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .header("Content-Type", "application/json")
    }

    async fn describe_index(&self, index_name: &str) -> Result<Option<IndexDescription>> {
        let url = indexes_url(&self.control_url, Some(index_name))?;
        let response = self.request(reqwest::Method::GET, url.as_str()).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        Ok(Some(response.json().await?))
    }

    async fn create_index(&self, index_name: &str, dimension: u64) -> Result<()> {
        info!(
            "Creating Pinecone index '{}' ({} dims, {}/{})",
            index_name, dimension, self.cloud, self.region
        );

        let url = indexes_url(&self.control_url, None)?;
        let response = self
            .request(reqwest::Method::POST, url.as_str())
            .json(&json!({
                "name": index_name,
                "dimension": dimension,
                "metric": "cosine",
                "spec": {
                    "serverless": {
                        "cloud": self.cloud,
                        "region": self.region
                    }
                }
            }))
            .send()
            .await?;

        // Someone else created it in the meantime.
        if response.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }

    async fn wait_until_ready(&self, index_name: &str) -> Result<IndexDescription> {
        for _ in 0..READY_POLL_ATTEMPTS {
            if let Some(description) = self.describe_index(index_name).await? {
                if description.status.as_ref().map(|s| s.ready).unwrap_or(false) {
                    return Ok(description);
                }
            }
            debug!("Waiting for Pinecone index '{}' to become ready", index_name);
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
        Err(anyhow!("Pinecone index '{}' did not become ready", index_name))
    }

    async fn remember_host(&self, index_name: &str, host: &str) -> Result<Url> {
        let url = data_plane_url(host)?;
        self.hosts
            .write()
            .await
            .insert(index_name.to_string(), url.clone());
        Ok(url)
    }

    async fn host_for(&self, index_name: &str) -> Result<Url> {
        if let Some(url) = self.hosts.read().await.get(index_name) {
            return Ok(url.clone());
        }

        let description = self
            .describe_index(index_name)
            .await?
            .ok_or_else(|| anyhow!("Pinecone index '{}' not found", index_name))?;
        self.remember_host(index_name, &description.host).await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await?;
    Err(anyhow!(
        "API request failed: Status {}, Body: {}",
        status,
        error_text
    ))
}

/// `{base}/indexes[/{name}]`, with the name percent-encoded as one segment.
fn indexes_url(base: &Url, index_name: Option<&str>) -> Result<Url> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| anyhow!("Pinecone API url '{}' cannot have a path", base))?;
        segments.pop_if_empty().push("indexes");
        if let Some(name) = index_name {
            segments.push(name);
        }
    }
    Ok(url)
}

/// Index hosts come back without a scheme.
fn data_plane_url(host: &str) -> Result<Url> {
    let host = host.trim().trim_end_matches('/');
    let with_scheme = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };
    Url::parse(&with_scheme).with_context(|| format!("Invalid Pinecone index host '{}'", host))
}

fn record_to_json(record: VectorRecord) -> Value {
    json!({
        "id": record.id,
        "values": record.values,
        "metadata": record.metadata,
    })
}

fn parse_query_response(body: &str) -> Result<Vec<VectorMatch>> {
    let parsed: QueryResponse = serde_json::from_str(body)
        .map_err(|e| anyhow!("Invalid query response format: {}", e))?;

    Ok(parsed
        .matches
        .into_iter()
        .map(|m| VectorMatch {
            id: m.id,
            score: m.score,
            metadata: m.metadata.unwrap_or_default().into_iter().collect(),
        })
        .collect())
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn ensure_index(&self, index_name: &str, dimension: u64) -> Result<()> {
        let description = match self.describe_index(index_name).await? {
            Some(description) if description.status.as_ref().map(|s| s.ready).unwrap_or(false) => {
                description
            }
            Some(_) => self.wait_until_ready(index_name).await?,
            None => {
                self.create_index(index_name, dimension).await?;
                self.wait_until_ready(index_name).await?
            }
        };

        if let Some(existing) = description.dimension {
            if existing != dimension {
                return Err(anyhow!(
                    "Pinecone index '{}' has dimension {} but embeddings have {}",
                    index_name,
                    existing,
                    dimension
                ));
            }
        }

        self.remember_host(index_name, &description.host).await?;
        Ok(())
    }

    async fn upsert(&self, index_name: &str, records: Vec<VectorRecord>) -> Result<usize> {
        let host = self.host_for(index_name).await?;
        let url = host.join("vectors/upsert")?;

        let mut upserted = 0;
        let mut records = records.into_iter().peekable();
        while records.peek().is_some() {
            let batch: Vec<Value> = records
                .by_ref()
                .take(UPSERT_BATCH_SIZE)
                .map(record_to_json)
                .collect();

            let response = self
                .request(reqwest::Method::POST, url.as_str())
                .json(&json!({ "vectors": batch, "namespace": "" }))
                .send()
                .await?;
            let response = check_status(response).await?;
            let body: UpsertResponse = response.json().await?;
            upserted += body.upserted_count;
        }

        Ok(upserted)
    }

    async fn query(
        &self,
        index_name: &str,
        vector: Vec<f32>,
        top_k: u64,
    ) -> Result<Vec<VectorMatch>> {
        let host = self.host_for(index_name).await?;
        let url = host.join("query")?;

        let response = self
            .request(reqwest::Method::POST, url.as_str())
            .json(&json!({
                "vector": vector,
                "topK": top_k,
                "includeMetadata": true,
                "includeValues": false,
                "namespace": ""
            }))
            .send()
            .await?;
        let response = check_status(response).await?;
        let body = response.text().await?;
        parse_query_response(&body)
    }
}
