use thiserror::Error;

use crate::llm::LlmError;
use crate::rag::StoreError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to determine embedding dimension: {0}")]
    Embedding(#[source] LlmError),

    #[error("Failed to initialize vector store collection: {0}")]
    VectorStore(#[source] StoreError),
}
