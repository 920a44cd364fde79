//! The RAG chain: retrieve → prompt → generate → parse.
//!
//! Every stage has a concrete input and output type, and the chain is built once
//! at startup and shared behind an `Arc`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::error::RagError;
use super::prompt::PromptTemplate;
use super::store::VectorStore;
use crate::llm::{ChatModel, ChatRequest, Embedder};

/// Number of chunks handed to the prompt.
pub const DEFAULT_TOP_K: usize = 4;
/// Low temperature keeps answers close to the retrieved context.
pub const RAG_TEMPERATURE: f64 = 0.1;
/// What the client sees when the pipeline fails mid-stream; details stay in the server log.
pub const STREAM_ERROR_MESSAGE: &str =
    "Error: A critical error occurred on the backend. Please check the server logs.";

const EVENT_BUFFER: usize = 32;

/// A retrieved chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub page_content: String,
    pub score: f32,
}

/// One item of a chain stream. `Error` and `Done` are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainEvent {
    Content(String),
    Error(String),
    Done,
}

pub type ChainStream = ReceiverStream<ChainEvent>;

#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RagError>;
}

/// Embeds the query and returns the nearest stored chunks.
pub struct VectorStoreRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl VectorStoreRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[async_trait]
impl Retriever for VectorStoreRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RagError> {
        let vector = self
            .embedder
            .embed_query(query)
            .await
            .map_err(RagError::Embedding)?;
        let hits = self.store.search(&vector, self.top_k).await?;
        Ok(hits
            .into_iter()
            .map(|hit| Document {
                id: hit.id,
                page_content: hit.page_content,
                score: hit.score,
            })
            .collect())
    }
}

/// Turns raw model deltas into plain text fragments.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrOutputParser;

impl StrOutputParser {
    pub fn parse(&self, delta: String) -> Option<String> {
        if delta.is_empty() {
            None
        } else {
            Some(delta)
        }
    }
}

enum StreamOutcome {
    Completed(usize),
    Disconnected,
}

pub struct RagChain {
    retriever: Arc<dyn Retriever>,
    prompt: PromptTemplate,
    model: Arc<dyn ChatModel>,
    parser: StrOutputParser,
    temperature: f64,
}

impl RagChain {
    pub fn new(retriever: Arc<dyn Retriever>, model: Arc<dyn ChatModel>) -> Self {
        Self {
            retriever,
            prompt: PromptTemplate::default(),
            model,
            parser: StrOutputParser,
            temperature: RAG_TEMPERATURE,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.model()
    }

    async fn prepare(&self, question: &str) -> Result<ChatRequest, RagError> {
        let documents = self.retriever.retrieve(question).await?;
        tracing::debug!("Retrieved {} context chunks", documents.len());
        let messages = self.prompt.render(&documents, question);
        Ok(ChatRequest::new(messages).with_temperature(self.temperature))
    }

    /// Runs the chain in a background task and returns its events as they are produced.
    ///
    /// Failures never end the stream silently: the last event is either
    /// [`ChainEvent::Done`] or [`ChainEvent::Error`].
    pub fn stream(self: &Arc<Self>, question: String) -> ChainStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let chain = Arc::clone(self);

        tokio::spawn(async move {
            tracing::debug!("Starting RAG chain stream");
            match chain.forward(&question, &tx).await {
                Ok(StreamOutcome::Completed(fragments)) => {
                    tracing::info!("RAG chain stream finished ({} fragments)", fragments);
                    let _ = tx.send(ChainEvent::Done).await;
                }
                Ok(StreamOutcome::Disconnected) => {
                    tracing::info!("Client disconnected before the answer finished");
                }
                Err(err) => {
                    tracing::error!("RAG chain stream failed: {:?}", err);
                    let _ = tx
                        .send(ChainEvent::Error(STREAM_ERROR_MESSAGE.to_string()))
                        .await;
                }
            }
        });

        ReceiverStream::new(rx)
    }

    async fn forward(
        &self,
        question: &str,
        tx: &mpsc::Sender<ChainEvent>,
    ) -> Result<StreamOutcome, RagError> {
        let request = self.prepare(question).await?;
        let mut deltas = self
            .model
            .stream_chat(request)
            .await
            .map_err(RagError::Generation)?;

        let mut fragments = 0;
        while let Some(delta) = deltas.recv().await {
            let delta = delta.map_err(RagError::Generation)?;
            let Some(text) = self.parser.parse(delta) else {
                continue;
            };
            tracing::trace!("Received fragment: {:?}", text);
            if tx.send(ChainEvent::Content(text)).await.is_err() {
                return Ok(StreamOutcome::Disconnected);
            }
            fragments += 1;
        }
        Ok(StreamOutcome::Completed(fragments))
    }

    /// Answers in one piece, without streaming.
    pub async fn invoke(&self, question: &str) -> Result<String, RagError> {
        let request = self.prepare(question).await?;
        let answer = self
            .model
            .chat(request)
            .await
            .map_err(RagError::Generation)?;
        Ok(self.parser.parse(answer).unwrap_or_default())
    }
}
