pub mod anthropic;
pub mod embedding;
pub mod error;
pub mod provider;
pub mod sse;
pub mod types;

pub use anthropic::AnthropicChatModel;
pub use embedding::HttpEmbedder;
pub use error::LlmError;
pub use provider::{probe_dimension, ChatModel, Embedder};
pub use types::{ChatMessage, ChatRequest};
