mod health;
mod rooms;
mod snapshots;
mod ws;

use axum::Router;

use crate::state::AppState;

/// Build the complete application router.
///
/// Structure:
/// - `GET /ws?room=..&id=..`: relay `WebSocket`
/// - `GET /health`: liveness plus relay counters
/// - `GET /api/rooms/{room}`: live roster of a room
/// - `POST /api/snapshots`, `GET /api/snapshots/{code}`: short-code snapshot store
pub fn router() -> Router<AppState> {
    let api = Router::new()
        .merge(rooms::router())
        .merge(snapshots::router());

    Router::new()
        .merge(health::router())
        .merge(ws::router())
        .nest("/api", api)
}
