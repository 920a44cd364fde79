use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Welcome to the RAG Chatbot API!" }))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let points = match state.store.count().await {
        Ok(count) => Some(count),
        Err(err) => {
            tracing::warn!("Failed to count points for status: {}", err);
            None
        }
    };

    Json(json!({
        "collection": state.store.collection_name(),
        "points_count": points,
        "degraded": points.is_none(),
        "embedding_model": state.embedder.model(),
        "embedding_dimension": state.store.dimension(),
        "chat_model": state.chain.model_name(),
        "started_at": state.started_at.to_rfc3339(),
    }))
}
