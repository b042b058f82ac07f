use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
struct CreateSnapshotRequest {
    data: Option<Value>,
}

#[derive(Serialize)]
struct CreateSnapshotResponse {
    code: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/snapshots", post(create_snapshot))
        .route("/snapshots/{code}", get(get_snapshot))
}

/// `POST /api/snapshots`: Store `{data}` under a new short code.
async fn create_snapshot(
    State(state): State<AppState>,
    body: Result<Json<CreateSnapshotRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateSnapshotResponse>), AppError> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let data = body
        .data
        .ok_or_else(|| AppError::BadRequest("Missing data.".to_string()))?;

    let code = state.snapshots.create(&data).await?;
    tracing::info!(%code, "Snapshot created");

    Ok((StatusCode::CREATED, Json(CreateSnapshotResponse { code })))
}

/// `GET /api/snapshots/{code}`: Stored data, or 404 once unknown or expired.
async fn get_snapshot(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.snapshots.fetch(&code).await?))
}
