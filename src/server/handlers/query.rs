use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub top_k: Option<i64>,
}

/// `POST /query`: answers a question from the indexed documents.
pub async fn query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let query = payload.query.as_deref().unwrap_or_default().trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query text is required".to_string()));
    }
    let top_k = resolve_top_k(payload.top_k, state.settings.rag.default_top_k)?;

    let result = state
        .pipeline
        .answer(query, payload.model.as_deref(), top_k)
        .await?;

    tracing::info!(
        chunks_found = result.chunks_found,
        model = %result.model_used,
        "Answered query"
    );

    Ok(Json(result))
}

/// Missing or zero falls back to the default; negative values are rejected.
fn resolve_top_k(requested: Option<i64>, default_top_k: usize) -> Result<usize, ApiError> {
    match requested {
        None | Some(0) => Ok(default_top_k),
        Some(k) if k < 0 => Err(ApiError::BadRequest(
            "top_k must be a positive integer".to_string(),
        )),
        Some(k) => usize::try_from(k).map_err(ApiError::bad_request),
    }
}
