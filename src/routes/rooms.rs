use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::relay;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomResponse {
    room: String,
    host: Option<String>,
    count: usize,
    members: Vec<MemberResponse>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MemberResponse {
    id: String,
    is_host: bool,
    joined_at: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/rooms/{room}", get(get_room))
}

/// `GET /api/rooms/{room}`: Current roster of a live room.
async fn get_room(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<RoomResponse>, AppError> {
    state
        .relay
        .registry()
        .with_room(&room, |r| RoomResponse {
            room: r.id().to_string(),
            host: relay::host(r).map(str::to_string),
            count: r.len(),
            members: r
                .members()
                .iter()
                .enumerate()
                .map(|(idx, m)| MemberResponse {
                    id: m.client_id().to_string(),
                    is_host: idx == 0,
                    joined_at: m.joined_at(),
                    last_seen: m.last_seen(),
                })
                .collect(),
        })
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Room not found.".to_string()))
}
