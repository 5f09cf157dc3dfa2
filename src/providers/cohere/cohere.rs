use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::ProviderConfig;
use crate::providers::traits::EmbeddingProvider;

/// Cohere accepts at most this many texts per embed call.
const MAX_TEXTS_PER_CALL: usize = 96;

#[derive(Clone)]
pub struct CohereEmbeddings {
    api_key: String,
    client: Client,
    model: String,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl CohereEmbeddings {
    pub fn new(api_key: &str, config: &ProviderConfig) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: Client::new(),
            model: config.model.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
        }
    }

    async fn embed(&self, texts: &[String], input_type: &str) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(format!("{}/embed", self.api_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": self.model,
                "texts": texts,
                "input_type": input_type,
                "truncate": "END"
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!(
                "API request failed: Status {}, Body: {}",
                status,
                error_text
            ));
        }

        let body = response.text().await?;
        parse_embed_response(&body, texts.len())
    }
}

fn parse_embed_response(body: &str, expected: usize) -> Result<Vec<Vec<f32>>> {
    let parsed: EmbedResponse = serde_json::from_str(body)
        .map_err(|e| anyhow!("Invalid embed response format: {}", e))?;

    if parsed.embeddings.len() != expected {
        return Err(anyhow!(
            "Embedding service returned {} vectors for {} texts",
            parsed.embeddings.len(),
            expected
        ));
    }

    Ok(parsed.embeddings)
}

#[async_trait]
impl EmbeddingProvider for CohereEmbeddings {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_TEXTS_PER_CALL) {
            debug!("Embedding batch of {} texts with {}", batch.len(), self.model);
            embeddings.extend(self.embed(batch, "search_document").await?);
        }
        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()], "search_query")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No embedding returned from Cohere"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_embed_response() {
        let body = r#"{"id":"abc","texts":["a","b"],"embeddings":[[0.1,0.2],[0.3,0.4]],"meta":{}}"#;
        let vectors = parse_embed_response(body, 2).unwrap();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn test_parse_embed_response_count_mismatch() {
        let body = r#"{"embeddings":[[0.1,0.2]]}"#;
        let err = parse_embed_response(body, 2).unwrap_err();
        assert!(err.to_string().contains("1 vectors for 2 texts"));
    }

    #[test]
    fn test_parse_embed_response_rejects_garbage() {
        assert!(parse_embed_response(r#"{"message":"invalid api token"}"#, 1).is_err());
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let mut config = ProviderConfig::defaults("cohere");
        config.api_url = "https://api.cohere.com/v1/".to_string();
        let embeddings = CohereEmbeddings::new("key", &config);
        assert_eq!(embeddings.api_url, "https://api.cohere.com/v1");
    }
}
