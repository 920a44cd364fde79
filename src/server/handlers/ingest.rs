use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::core::errors::ApiError;
use crate::server::protocol::{IngestRequest, IngestResponse};
use crate::state::AppState;

pub async fn ingest_data(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    match state.ingest.ingest(&request.text).await {
        Ok(report) => {
            tracing::debug!("Ingested {} chunks", report.chunk_count());
            Ok(Json(IngestResponse {
                success: true,
                message: "Text ingested successfully.".to_string(),
            }))
        }
        Err(err) => {
            tracing::error!("Ingest failed: {:?}", err);
            // The cause is returned to the client verbatim.
            Err(ApiError::Internal(format!("Failed to ingest text: {}", err)))
        }
    }
}
