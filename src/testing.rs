//! In-process doubles for the embedder, vector store and chat model seams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::config::Settings;
use crate::llm::{ChatModel, ChatRequest, Embedder, LlmError};
use crate::rag::store::{check_dimension, CollectionStatus, ScoredPoint, VectorPoint, VectorStore};
use crate::rag::StoreError;

pub fn test_settings() -> Settings {
    let env: HashMap<&str, &str> = [
        ("ANTHROPIC_API_KEY", "sk-ant-test"),
        ("ANTHROPIC_MODEL", "claude-test"),
        ("QDRANT_URL", "http://localhost:6333"),
        ("QDRANT_COLLECTION_NAME", "test_documents"),
        ("EMBEDDING_MODEL", "fake-embedder"),
    ]
    .into_iter()
    .collect();
    Settings::from_lookup(|key| env.get(key).map(|v| v.to_string()))
        .expect("test settings are valid")
}

/// Deterministic bag-of-words embedder: each word bumps one bucket.
pub struct FakeEmbedder {
    dimension: usize,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(dimension: usize) -> Self {
        Self {
            fail: true,
            ..Self::new(dimension)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for word in text.split_whitespace() {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
            vector[bucket % self.dimension] += 1.0;
        }
        // Keep empty input off the zero vector so cosine stays defined.
        vector[0] += 0.01;
        vector
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model(&self) -> &str {
        "fake-embedder"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LlmError::stream("embedding", "fake embedder failure"));
        }
        Ok(inputs.iter().map(|text| self.vectorize(text)).collect())
    }
}

/// Vector store kept in memory, ranking by cosine similarity.
pub struct MemoryVectorStore {
    dimension: usize,
    available: bool,
    created: Mutex<bool>,
    points: Mutex<Vec<VectorPoint>>,
}

impl MemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            available: true,
            created: Mutex::new(false),
            points: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable(dimension: usize) -> Self {
        Self {
            available: false,
            ..Self::new(dimension)
        }
    }

    pub fn points(&self) -> Vec<VectorPoint> {
        self.points.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.points.lock().unwrap().len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available {
            Ok(())
        } else {
            Err(StoreError::Status {
                status: 503,
                body: "store unavailable".to_string(),
            })
        }
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn collection_name(&self) -> &str {
        "memory"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn ensure_collection(&self) -> Result<CollectionStatus, StoreError> {
        self.check_available()?;
        let mut created = self.created.lock().unwrap();
        if *created {
            return Ok(CollectionStatus::Existing);
        }
        *created = true;
        Ok(CollectionStatus::Created)
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<(), StoreError> {
        self.check_available()?;
        for point in &points {
            check_dimension(self.dimension, &point.vector)?;
        }
        self.points.lock().unwrap().extend(points);
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>, StoreError> {
        self.check_available()?;
        check_dimension(self.dimension, vector)?;
        let mut hits: Vec<ScoredPoint> = self
            .points
            .lock()
            .unwrap()
            .iter()
            .map(|p| ScoredPoint {
                id: p.id.to_string(),
                score: cosine(vector, &p.vector),
                page_content: p.payload.page_content.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.check_available()?;
        Ok(self.len() as u64)
    }
}

/// Chat model that replays a fixed script of deltas, optionally failing at the end.
pub struct ScriptedChatModel {
    fragments: Vec<String>,
    failure: Option<String>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChatModel {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_after(fragments: &[&str], message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(fragments)
        }
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn record(&self, request: ChatRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError> {
        self.record(request);
        if let Some(message) = &self.failure {
            return Err(LlmError::stream("scripted", message.clone()));
        }
        Ok(self.fragments.concat())
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, LlmError>>, LlmError> {
        self.record(request);
        let (tx, rx) = mpsc::channel(self.fragments.len() + 1);
        for fragment in &self.fragments {
            let _ = tx.send(Ok(fragment.clone())).await;
        }
        if let Some(message) = &self.failure {
            let _ = tx
                .send(Err(LlmError::stream("scripted", message.clone())))
                .await;
        }
        Ok(rx)
    }
}
