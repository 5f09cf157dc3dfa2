use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use uuid::Uuid;

use super::retriever::{page_metadata, Retriever, VectorStoreRetriever};
use crate::document::PageUnit;
use crate::providers::traits::{EmbeddingProvider, VectorRecord, VectorStore};

/// Embeds the page units, upserts them into `index_name` (creating the
/// index when absent) and returns a retriever bound to that index.
pub async fn build_index(
    pages: Vec<PageUnit>,
    index_name: &str,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    top_k: u64,
) -> Result<Arc<dyn Retriever>> {
    if pages.is_empty() {
        return Err(anyhow!("Document contains no extractable text"));
    }

    let texts: Vec<String> = pages.iter().map(|p| p.text.clone()).collect();
    let vectors = embedder
        .embed_documents(&texts)
        .await
        .context("Failed to embed document pages")?;

    if vectors.len() != pages.len() {
        return Err(anyhow!(
            "Embedding service returned {} vectors for {} pages",
            vectors.len(),
            pages.len()
        ));
    }

    let dimension = vectors.first().map(|v| v.len()).unwrap_or_default() as u64;
    store
        .ensure_index(index_name, dimension)
        .await
        .with_context(|| format!("Failed to prepare index '{}'", index_name))?;

    let records: Vec<VectorRecord> = pages
        .iter()
        .zip(vectors)
        .map(|(page, values)| VectorRecord {
            id: Uuid::new_v4().to_string(),
            values,
            metadata: page_metadata(page),
        })
        .collect();

    let upserted = store
        .upsert(index_name, records)
        .await
        .with_context(|| format!("Failed to upsert into index '{}'", index_name))?;

    log::info!(
        "Indexed {} page units into '{}' ({} upserted, {} dims)",
        pages.len(),
        index_name,
        upserted,
        dimension
    );

    Ok(Arc::new(VectorStoreRetriever::new(
        embedder, store, index_name, top_k,
    )))
}
