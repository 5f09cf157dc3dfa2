use anyhow::Result;
use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        point_id::PointIdOptions, value::Kind, vectors_config, with_payload_selector::SelectorOptions,
        CreateCollection, Distance, PointStruct, SearchPoints, UpsertPoints, Value, VectorParams,
        VectorsConfig, WithPayloadSelector,
    },
    Payload, Qdrant,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::database::qdrant_config::create_qdrant_client;
use crate::providers::traits::{VectorMatch, VectorRecord, VectorStore};

#[derive(Error, Debug)]
pub enum VectorDBError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Operation failed: {0}")]
    Operation(String),
}

/// Qdrant collection used as the document index; the index name is the
/// collection name.
#[derive(Clone)]
pub struct VectorDB {
    client: Arc<Qdrant>,
}

impl VectorDB {
    pub fn new(url: &str, api_key: &str) -> Result<Self, VectorDBError> {
        let client = create_qdrant_client(url, api_key)
            .map_err(|e| VectorDBError::Connection(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub async fn create_collection(&self, name: &str, vector_size: u64) -> Result<(), VectorDBError> {
        let exists = self
            .client
            .collection_exists(name)
            .await
            .map_err(|e| VectorDBError::Connection(e.to_string()))?;
        if exists {
            log::info!("Collection {} already exists, skipping creation", name);
            return Ok(());
        }

        let vectors_config = VectorParams {
            size: vector_size,
            distance: Distance::Cosine.into(),
            ..Default::default()
        };

        let create_collection = CreateCollection {
            collection_name: name.to_string(),
            vectors_config: Some(VectorsConfig {
                config: Some(vectors_config::Config::Params(vectors_config)),
            }),
            ..Default::default()
        };

        match self.client.create_collection(create_collection).await {
            Ok(_) => {
                log::info!("Created collection {} ({} dims)", name, vector_size);
                Ok(())
            }
            Err(e) if e.to_string().contains("already exists") => {
                log::info!("Collection {} already exists, skipping creation", name);
                Ok(())
            }
            Err(e) => Err(VectorDBError::Operation(e.to_string())),
        }
    }

    pub async fn store_vectors(
        &self,
        collection: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, VectorDBError> {
        let count = records.len();
        let points: Vec<PointStruct> = records
            .into_iter()
            .map(|record| {
                let payload: HashMap<String, Value> = record
                    .metadata
                    .into_iter()
                    .map(|(k, v)| (k, to_qdrant_value(v)))
                    .collect();
                PointStruct::new(record.id, record.values, Payload::from(payload))
            })
            .collect();

        let upsert_points = UpsertPoints {
            collection_name: collection.to_string(),
            wait: Some(true),
            points,
            ..Default::default()
        };

        self.client
            .upsert_points(upsert_points)
            .await
            .map_err(|e| VectorDBError::Operation(e.to_string()))?;

        Ok(count)
    }

    pub async fn search_vectors(
        &self,
        collection: &str,
        query_vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<VectorMatch>, VectorDBError> {
        let request = SearchPoints {
            collection_name: collection.to_string(),
            vector: query_vector,
            limit,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let results = self
            .client
            .search_points(request)
            .await
            .map_err(|e| VectorDBError::Operation(e.to_string()))?;

        let points = results
            .result
            .into_iter()
            .map(|point| {
                let id = match point.id.and_then(|id| id.point_id_options) {
                    Some(PointIdOptions::Uuid(uuid)) => uuid,
                    Some(PointIdOptions::Num(num)) => num.to_string(),
                    None => String::new(),
                };
                let metadata = point
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, from_qdrant_value(v)))
                    .collect();
                VectorMatch {
                    id,
                    score: point.score,
                    metadata,
                }
            })
            .collect();

        Ok(points)
    }
}

fn to_qdrant_value(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::String(s) => Value::from(s),
        serde_json::Value::Bool(b) => Value::from(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::from(i),
            None => Value::from(n.as_f64().unwrap_or_default()),
        },
        other => Value::from(other.to_string()),
    }
}

fn from_qdrant_value(value: Value) -> serde_json::Value {
    match value.kind {
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::IntegerValue(i)) => serde_json::Value::from(i),
        Some(Kind::DoubleValue(d)) => serde_json::Value::from(d),
        _ => serde_json::Value::Null,
    }
}

#[async_trait]
impl VectorStore for VectorDB {
    async fn ensure_index(&self, index_name: &str, dimension: u64) -> Result<()> {
        Ok(self.create_collection(index_name, dimension).await?)
    }

    async fn upsert(&self, index_name: &str, records: Vec<VectorRecord>) -> Result<usize> {
        Ok(self.store_vectors(index_name, records).await?)
    }

    async fn query(
        &self,
        index_name: &str,
        vector: Vec<f32>,
        top_k: u64,
    ) -> Result<Vec<VectorMatch>> {
        Ok(self.search_vectors(index_name, vector, top_k).await?)
    }
}
