//! Retrieval-augmented generation.
//!
//! This module provides:
//! - `chunker` / `IngestPipeline`: word-window chunking, embedding and upsert
//! - `VectorStore` with the `QdrantStore` implementation
//! - `RagChain`: retriever, prompt, chat model and output parser as one streamed pipeline

pub mod chain;
pub mod chunker;
pub mod error;
pub mod ingest;
pub mod prompt;
pub mod qdrant;
pub mod store;

pub use chain::{ChainEvent, ChainStream, RagChain, Retriever, VectorStoreRetriever};
pub use error::{RagError, StoreError};
pub use ingest::{IngestPipeline, IngestReport};
pub use qdrant::QdrantStore;
pub use store::{CollectionStatus, VectorStore};
