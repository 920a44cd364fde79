//! VectorStore trait: the seam between the RAG pipeline and the vector database.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StoreError;

/// Payload stored alongside every vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub page_content: String,
}

/// One persisted point. Points are write-once; nothing updates or deletes them.
#[derive(Debug, Clone, Serialize)]
pub struct VectorPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// A nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: String,
    /// Similarity score (higher = better).
    pub score: f32,
    pub page_content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    Created,
    Existing,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    fn collection_name(&self) -> &str;

    /// Vector size every point in the collection must have.
    fn dimension(&self) -> usize;

    /// Creates the collection (cosine distance) if it does not exist yet.
    async fn ensure_collection(&self) -> Result<CollectionStatus, StoreError>;

    /// Writes points and returns once the store has acknowledged persistence.
    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<(), StoreError>;

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

/// Rejects vectors whose length differs from the collection's vector size.
pub fn check_dimension(expected: usize, vector: &[f32]) -> Result<(), StoreError> {
    if vector.len() != expected {
        return Err(StoreError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}
