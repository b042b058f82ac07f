use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    rooms: usize,
    sessions: usize,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// `GET /health`
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        rooms: state.relay.room_count(),
        sessions: state.relay.session_count(),
    })
}
