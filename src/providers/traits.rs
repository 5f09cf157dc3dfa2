use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use crate::document::PageUnit;

/// Hosted chat model.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, system_message: &str, prompt: &str) -> Result<String>;
}

/// Turns text into fixed-dimension vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// One vector per input text, in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

/// A point to upsert into a named index.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: HashMap<String, Value>,
}

/// A nearest-neighbour hit, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: HashMap<String, Value>,
}

/// Remote vector index addressed by a user-supplied name.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates the index with the given dimension when it does not exist yet.
    async fn ensure_index(&self, index_name: &str, dimension: u64) -> Result<()>;

    /// Returns the number of records the service reports as upserted.
    async fn upsert(&self, index_name: &str, records: Vec<VectorRecord>) -> Result<usize>;

    async fn query(
        &self,
        index_name: &str,
        vector: Vec<f32>,
        top_k: u64,
    ) -> Result<Vec<VectorMatch>>;
}

/// Parses a document on local disk into page-level text units.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// `source` is the name recorded in each unit's metadata.
    async fn load_and_split(&self, path: &Path, source: &str) -> Result<Vec<PageUnit>>;
}
