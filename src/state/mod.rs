use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::Settings;
use crate::llm::{probe_dimension, AnthropicChatModel, ChatModel, Embedder, HttpEmbedder};
use crate::rag::{
    CollectionStatus, IngestPipeline, QdrantStore, RagChain, VectorStore, VectorStoreRetriever,
};

pub mod error;

use error::InitializationError;

/// Application state shared by every route.
///
/// Holds the process-wide collaborators, built once at startup:
/// - Settings
/// - Embedding model and vector store clients
/// - Ingest pipeline and RAG chain composed from them
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn VectorStore>,
    pub ingest: Arc<IngestPipeline>,
    pub chain: Arc<RagChain>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Connects the real collaborators.
    ///
    /// This process includes:
    /// 1. Resolving the embedding dimension (configured, or probed from the model)
    /// 2. Ensuring the Qdrant collection exists with that dimension
    /// 3. Building the ingest pipeline and RAG chain
    pub async fn initialize(settings: Settings) -> Result<Arc<Self>, InitializationError> {
        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(&settings.embedding));

        let dimension = match settings.embedding.dimension {
            Some(dimension) => dimension,
            None => probe_dimension(embedder.as_ref())
                .await
                .map_err(InitializationError::Embedding)?,
        };
        tracing::info!(
            "Embedding model '{}' produces {}-dimensional vectors",
            settings.embedding.model,
            dimension
        );

        let store: Arc<dyn VectorStore> = Arc::new(QdrantStore::new(&settings.qdrant, dimension));
        match store
            .ensure_collection()
            .await
            .map_err(InitializationError::VectorStore)?
        {
            CollectionStatus::Created => {
                tracing::info!("Created collection '{}'", store.collection_name())
            }
            CollectionStatus::Existing => {
                tracing::info!("Using existing collection '{}'", store.collection_name())
            }
        }

        let chat_model: Arc<dyn ChatModel> = Arc::new(AnthropicChatModel::new(&settings.anthropic));

        Ok(Arc::new(Self::from_parts(
            settings, embedder, store, chat_model,
        )))
    }

    /// Wires the pipeline and chain from already-built collaborators.
    pub fn from_parts(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        chat_model: Arc<dyn ChatModel>,
    ) -> Self {
        let ingest = Arc::new(IngestPipeline::new(embedder.clone(), store.clone()));
        let retriever = Arc::new(VectorStoreRetriever::new(embedder.clone(), store.clone()));
        let chain = Arc::new(RagChain::new(retriever, chat_model));

        AppState {
            settings: Arc::new(settings),
            embedder,
            store,
            ingest,
            chain,
            started_at: Utc::now(),
        }
    }
}
