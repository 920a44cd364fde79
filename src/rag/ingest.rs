//! Ingest pipeline: chunk, embed, assign ids, upsert.

use std::sync::Arc;

use uuid::Uuid;

use super::chunker::{split_words, ChunkConfig};
use super::error::RagError;
use super::store::{PointPayload, VectorPoint, VectorStore};
use crate::llm::{Embedder, LlmError};

/// Maximum number of chunks sent to the embedding model per request.
pub const EMBED_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Ids of the stored points, in chunk order.
    pub point_ids: Vec<Uuid>,
}

impl IngestReport {
    pub fn chunk_count(&self) -> usize {
        self.point_ids.len()
    }
}

pub struct IngestPipeline {
    chunking: ChunkConfig,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl IngestPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self::with_chunking(ChunkConfig::default(), embedder, store)
    }

    pub fn with_chunking(
        chunking: ChunkConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            chunking,
            embedder,
            store,
        }
    }

    /// Stores `text` as freshly identified points.
    ///
    /// Ingestion is append-only: identical text ingested twice is stored twice.
    pub async fn ingest(&self, text: &str) -> Result<IngestReport, RagError> {
        let chunks = split_words(text, &self.chunking);
        if chunks.is_empty() {
            tracing::info!("Ingest request contained no words; nothing to store");
            return Ok(IngestReport::default());
        }

        let texts: Vec<String> = chunks.into_iter().map(|c| c.text).collect();

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let embedded = self
                .embedder
                .embed(batch)
                .await
                .map_err(RagError::Embedding)?;
            vectors.extend(embedded);
        }
        if vectors.len() != texts.len() {
            return Err(RagError::Embedding(LlmError::decode(
                "embedder",
                format!("expected {} embeddings, got {}", texts.len(), vectors.len()),
            )));
        }

        let points: Vec<VectorPoint> = texts
            .into_iter()
            .zip(vectors)
            .map(|(page_content, vector)| VectorPoint {
                id: Uuid::new_v4(),
                vector,
                payload: PointPayload { page_content },
            })
            .collect();
        let point_ids = points.iter().map(|p| p.id).collect::<Vec<_>>();

        self.store.upsert(points).await?;
        tracing::info!(
            "Successfully upserted {} chunks of text into '{}'",
            point_ids.len(),
            self.store.collection_name()
        );

        Ok(IngestReport { point_ids })
    }
}
