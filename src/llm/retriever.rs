use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::document::PageUnit;
use crate::providers::traits::{EmbeddingProvider, VectorMatch, VectorStore};

/// Metadata key the page text is stored under in the vector index.
pub const TEXT_KEY: &str = "text";

/// Maps a query to the most relevant stored page units, best first.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<PageUnit>>;

    fn index_name(&self) -> &str;
}

/// Nearest-neighbour lookup over one remote index.
pub struct VectorStoreRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    index_name: String,
    top_k: u64,
}

impl VectorStoreRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        index_name: impl Into<String>,
        top_k: u64,
    ) -> Self {
        Self {
            embedder,
            store,
            index_name: index_name.into(),
            top_k,
        }
    }
}

#[async_trait]
impl Retriever for VectorStoreRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<PageUnit>> {
        let query_vector = self
            .embedder
            .embed_query(query)
            .await
            .context("Failed to embed query")?;

        let matches = self
            .store
            .query(&self.index_name, query_vector, self.top_k)
            .await
            .context("Failed to search vector index")?;

        log::debug!(
            "Retrieved {} matches from '{}' (top {})",
            matches.len(),
            self.index_name,
            self.top_k
        );

        Ok(matches.into_iter().filter_map(match_to_page).collect())
    }

    fn index_name(&self) -> &str {
        &self.index_name
    }
}

/// Builds the metadata stored next to a page unit's vector.
pub fn page_metadata(page: &PageUnit) -> HashMap<String, Value> {
    let mut metadata = HashMap::new();
    metadata.insert(TEXT_KEY.to_string(), Value::String(page.text.clone()));
    metadata.insert(
        "source".to_string(),
        Value::String(page.metadata.source.clone()),
    );
    metadata.insert("page".to_string(), Value::from(page.metadata.page));
    metadata
}

/// Matches without stored text are skipped.
fn match_to_page(m: VectorMatch) -> Option<PageUnit> {
    let text = m.metadata.get(TEXT_KEY)?.as_str()?.to_string();
    let source = m
        .metadata
        .get("source")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    // Pinecone hands numbers back as floats.
    let page = m
        .metadata
        .get("page")
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f as u64)))
        .unwrap_or_default() as u32;

    Some(PageUnit::new(text, source, page))
}
