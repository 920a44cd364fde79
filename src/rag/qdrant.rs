//! Qdrant vector store over the REST API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::StoreError;
use super::store::{check_dimension, CollectionStatus, ScoredPoint, VectorPoint, VectorStore};
use crate::core::config::settings::QdrantSettings;

/// Qdrant-backed store for a single collection with a fixed vector size.
#[derive(Clone)]
pub struct QdrantStore {
    base_url: String,
    collection: String,
    api_key: Option<String>,
    dimension: usize,
    client: Client,
}

#[derive(Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct SearchHit {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Deserialize)]
struct CountResult {
    count: u64,
}

impl QdrantStore {
    pub fn new(settings: &QdrantSettings, dimension: usize) -> Self {
        Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            collection: settings.collection_name.clone(),
            api_key: settings.api_key.clone(),
            dimension,
            client: Client::new(),
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("api-key", key),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let res = self
            .authorize(req)
            .send()
            .await
            .map_err(StoreError::Http)?;
        if res.status().is_success() {
            return Ok(res);
        }
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        Err(StoreError::Status { status, body })
    }

    async fn create_collection(&self) -> Result<(), StoreError> {
        let body = json!({
            "vectors": {
                "size": self.dimension,
                "distance": "Cosine",
            }
        });
        self.send(self.client.put(self.collection_url()).json(&body))
            .await?;
        Ok(())
    }
}

/// Reads the single-vector size from a `GET /collections/{name}` result, if present.
fn configured_vector_size(info: &Value) -> Option<usize> {
    info.get("config")
        .and_then(|c| c.get("params"))
        .and_then(|p| p.get("vectors"))
        .and_then(|v| v.get("size"))
        .and_then(|s| s.as_u64())
        .map(|s| s as usize)
}

fn point_id_to_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn collection_name(&self) -> &str {
        &self.collection
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn ensure_collection(&self) -> Result<CollectionStatus, StoreError> {
        let req = self.authorize(self.client.get(self.collection_url()));
        let res = req.send().await.map_err(StoreError::Http)?;

        match res.status() {
            StatusCode::NOT_FOUND => {
                tracing::info!(
                    "Collection '{}' not found. Creating with size {}...",
                    self.collection,
                    self.dimension
                );
                self.create_collection().await?;
                tracing::info!("Collection '{}' created successfully", self.collection);
                Ok(CollectionStatus::Created)
            }
            status if status.is_success() => {
                let info: QdrantResponse<Value> = res
                    .json()
                    .await
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                if let Some(size) = configured_vector_size(&info.result) {
                    if size != self.dimension {
                        return Err(StoreError::DimensionMismatch {
                            expected: size,
                            actual: self.dimension,
                        });
                    }
                }
                tracing::info!("Collection '{}' already exists", self.collection);
                Ok(CollectionStatus::Existing)
            }
            status => {
                let body = res.text().await.unwrap_or_default();
                Err(StoreError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<(), StoreError> {
        if points.is_empty() {
            return Ok(());
        }
        for point in &points {
            check_dimension(self.dimension, &point.vector)?;
        }

        let url = format!("{}/points", self.collection_url());
        let body = json!({ "points": points });
        self.send(
            self.client
                .put(&url)
                .query(&[("wait", "true")])
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>, StoreError> {
        check_dimension(self.dimension, vector)?;

        let url = format!("{}/points/search", self.collection_url());
        let body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        let res = self.send(self.client.post(&url).json(&body)).await?;
        let hits: QdrantResponse<Vec<SearchHit>> = res
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(hits
            .result
            .into_iter()
            .map(|hit| ScoredPoint {
                id: point_id_to_string(&hit.id),
                score: hit.score,
                page_content: hit
                    .payload
                    .as_ref()
                    .and_then(|p| p.get("page_content"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let url = format!("{}/points/count", self.collection_url());
        let res = self
            .send(self.client.post(&url).json(&json!({ "exact": true })))
            .await?;
        let count: QdrantResponse<CountResult> = res
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(count.result.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::store::PointPayload;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer, dimension: usize) -> QdrantStore {
        QdrantStore::new(
            &QdrantSettings {
                url: server.uri(),
                collection_name: "documents".to_string(),
                api_key: Some("qdrant-key".to_string()),
            },
            dimension,
        )
    }

    fn existing_collection(size: usize) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "status": "green",
                "points_count": 0,
                "config": { "params": { "vectors": { "size": size, "distance": "Cosine" } } }
            },
            "status": "ok"
        }))
    }

    #[tokio::test]
    async fn ensure_collection_creates_missing_collection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/documents"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/collections/documents"))
            .and(header("api-key", "qdrant-key"))
            .and(body_partial_json(json!({
                "vectors": { "size": 384, "distance": "Cosine" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
            .expect(1)
            .mount(&server)
            .await;

        let status = store_for(&server, 384).ensure_collection().await.unwrap();
        assert_eq!(status, CollectionStatus::Created);
    }

    #[tokio::test]
    async fn ensure_collection_is_idempotent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/documents"))
            .respond_with(existing_collection(384))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/collections/documents"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let store = store_for(&server, 384);
        assert_eq!(
            store.ensure_collection().await.unwrap(),
            CollectionStatus::Existing
        );
        assert_eq!(
            store.ensure_collection().await.unwrap(),
            CollectionStatus::Existing
        );
    }

    #[tokio::test]
    async fn ensure_collection_rejects_mismatched_vector_size() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/documents"))
            .respond_with(existing_collection(768))
            .mount(&server)
            .await;

        let err = store_for(&server, 384).ensure_collection().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch {
                expected: 768,
                actual: 384
            }
        ));
    }

    #[tokio::test]
    async fn upsert_waits_for_persistence() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/collections/documents/points"))
            .and(query_param("wait", "true"))
            .and(body_partial_json(json!({
                "points": [{ "payload": { "page_content": "hello world" } }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": { "operation_id": 1, "status": "completed" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let point = VectorPoint {
            id: Uuid::new_v4(),
            vector: vec![0.1, 0.2],
            payload: PointPayload {
                page_content: "hello world".to_string(),
            },
        };
        store_for(&server, 2).upsert(vec![point]).await.unwrap();
    }

    #[tokio::test]
    async fn upsert_rejects_wrong_dimension_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let point = VectorPoint {
            id: Uuid::new_v4(),
            vector: vec![0.1, 0.2, 0.3],
            payload: PointPayload {
                page_content: "x".to_string(),
            },
        };
        let err = store_for(&server, 2).upsert(vec![point]).await.unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn upsert_surfaces_store_errors() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/collections/documents/points"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let point = VectorPoint {
            id: Uuid::new_v4(),
            vector: vec![0.1, 0.2],
            payload: PointPayload {
                page_content: "x".to_string(),
            },
        };
        let err = store_for(&server, 2).upsert(vec![point]).await.unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn search_maps_hits_to_page_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/documents/points/search"))
            .and(body_partial_json(json!({ "limit": 4, "with_payload": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    { "id": "6f1c6a4e-7c1f-4bb4-9d67-1b0b2c0e0f10", "score": 0.91, "payload": { "page_content": "Rust is fast." } },
                    { "id": 42, "score": 0.5, "payload": {} }
                ]
            })))
            .mount(&server)
            .await;

        let hits = store_for(&server, 2).search(&[0.3, 0.4], 4).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].page_content, "Rust is fast.");
        assert_eq!(hits[0].id, "6f1c6a4e-7c1f-4bb4-9d67-1b0b2c0e0f10");
        assert_eq!(hits[1].id, "42");
        assert_eq!(hits[1].page_content, "");
    }

    #[tokio::test]
    async fn count_reads_exact_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/documents/points/count"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": { "count": 17 }
            })))
            .mount(&server)
            .await;

        assert_eq!(store_for(&server, 2).count().await.unwrap(), 17);
    }
}
