use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

const FILE_FIELD: &str = "file";

/// `POST /upload`: multipart form with a single `file` field.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart?;
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(ApiError::bad_request)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(ApiError::bad_request)?;
        upload = Some((filename, data));
        break;
    }

    let (filename, data) =
        upload.ok_or_else(|| ApiError::BadRequest("Missing file field".to_string()))?;

    let report = state.ingestor.ingest(&filename, data.to_vec()).await?;

    Ok(Json(json!({
        "message": "Document indexed successfully",
        "chunks": report.chunks,
    })))
}
