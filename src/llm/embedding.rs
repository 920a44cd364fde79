use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::error::{error_for_status, LlmError};
use super::provider::Embedder;
use crate::core::config::settings::EmbeddingSettings;

const PROVIDER: &str = "embedding";

/// Embedder backed by an OpenAI-compatible `/v1/embeddings` endpoint
/// (text-embeddings-inference, Ollama, LM Studio, ...).
#[derive(Clone)]
pub struct HttpEmbedder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Self {
        Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            client: Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let res = req.send().await.map_err(|e| LlmError::http(PROVIDER, e))?;
        let res = error_for_status(PROVIDER, res).await?;

        let mut payload: EmbeddingResponse = res
            .json()
            .await
            .map_err(|e| LlmError::decode(PROVIDER, e.to_string()))?;

        if payload.data.len() != inputs.len() {
            return Err(LlmError::decode(
                PROVIDER,
                format!(
                    "expected {} embeddings, got {}",
                    inputs.len(),
                    payload.data.len()
                ),
            ));
        }

        // Servers may answer out of order; `index` restores input order.
        if payload.data.iter().all(|item| item.index.is_some()) {
            payload.data.sort_by_key(|item| item.index);
        }

        Ok(payload.data.into_iter().map(|item| item.embedding).collect())
    }
}
