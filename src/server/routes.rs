//! Route handlers
//!
//! POST /api/analyze-pitch   multipart upload, field `audio`
//! GET  /api/pitch-analyses  all analyses, optional `userId` filter
//! GET  /api/pitch-analyses/:id

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::pipeline::{AudioUpload, PipelineError, MAX_UPLOAD_BYTES};
use crate::storage::PitchAnalysis;

use super::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/analyze-pitch", post(analyze_pitch))
        .route("/api/pitch-analyses", get(list_analyses))
        .route("/api/pitch-analyses/:id", get(get_analysis))
        // Room for the multipart envelope around the 25 MB file.
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
        .with_state(state)
}

/// JSON error body: `{ "message": ... }`.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match err {
            PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

async fn analyze_pitch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PitchAnalysis>, ApiError> {
    let mut upload: Option<AudioUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some("audio") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("recording").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(|e| {
            ApiError::new(StatusCode::BAD_REQUEST, format!("Malformed upload: {}", e))
        })?;

        upload = Some(AudioUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let upload =
        upload.ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "No audio file provided"))?;

    log::info!(
        "Analyzing pitch upload '{}' ({} bytes)",
        upload.file_name,
        upload.bytes.len()
    );

    let record = state.pipeline.run(upload).await.map_err(|e| {
        log::error!("Pitch analysis failed: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    user_id: Option<i64>,
}

async fn list_analyses(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<PitchAnalysis>>, ApiError> {
    let analyses = state
        .storage
        .list_pitch_analyses(params.user_id)
        .await
        .map_err(|e| {
            log::error!("Failed to list analyses: {}", e);
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve analyses",
            )
        })?;
    Ok(Json(analyses))
}

async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PitchAnalysis>, ApiError> {
    let analysis = state.storage.get_pitch_analysis(id).await.map_err(|e| {
        log::error!("Failed to load analysis {}: {}", id, e);
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to retrieve analysis",
        )
    })?;

    analysis
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Analysis not found"))
}
