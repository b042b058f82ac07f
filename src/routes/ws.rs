use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::relay::{resolve_client_id, resolve_room};
use crate::state::AppState;

#[derive(Deserialize)]
struct WsQueryParams {
    room: Option<String>,
    id: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_upgrade))
}

/// `GET /ws?room=<code>&id=<client>`: Upgrade to `WebSocket` and join the room.
async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsQueryParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let room = resolve_room(params.room.as_deref());
    let client_id = resolve_client_id(params.id.as_deref());

    ws.on_upgrade(move |socket| handle_ws_connection(state, room, client_id, socket))
}

/// Run one relay connection from join to cleanup.
async fn handle_ws_connection(state: AppState, room: String, client_id: String, socket: WebSocket) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    // Joining queues the room's roster for this socket before anything else
    let (session, mut rx) = state.relay.connect(&room, &client_id);

    // Spawn task to forward outbound frames to the WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sink.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_sink.close().await;
    });

    // Process inbound frames until the client goes away or the writer fails
    loop {
        tokio::select! {
            inbound = ws_stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    state.relay.handle_inbound(&session, text.as_str());
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => session.touch(),
                Some(Err(err)) => {
                    tracing::debug!(%room, %client_id, "WebSocket receive error: {err}");
                    break;
                }
            },
            _ = &mut send_task => break,
        }
    }

    // Cleanup on disconnect
    send_task.abort();
    state.relay.disconnect(&session);
}
