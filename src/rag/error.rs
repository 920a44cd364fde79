use thiserror::Error;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("vector store request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("vector store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected vector store response: {0}")]
    Decode(String),

    #[error("vector dimension mismatch: collection expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum RagError {
    #[error("embedding failed: {0}")]
    Embedding(#[source] LlmError),

    #[error("generation failed: {0}")]
    Generation(#[source] LlmError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
