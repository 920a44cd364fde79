use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::LlmError;
use super::types::ChatRequest;

/// A hosted chat-completion model bound to one configured model id.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// the configured model identifier
    fn model(&self) -> &str;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError>;

    /// chat completion (streaming); the receiver yields text deltas in order
    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, LlmError>>, LlmError>;
}

/// Text embedding model with a fixed output dimension.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model(&self) -> &str;

    /// Embeds every input, returning vectors in input order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| LlmError::decode("embedder", "no embedding returned for query"))
    }
}

/// Discovers the embedding dimension by embedding a short probe string.
pub async fn probe_dimension(embedder: &dyn Embedder) -> Result<usize, LlmError> {
    let vector = embedder.embed_query("dimension probe").await?;
    if vector.is_empty() {
        return Err(LlmError::decode(
            "embedder",
            format!("model '{}' returned an empty embedding", embedder.model()),
        ));
    }
    Ok(vector.len())
}
