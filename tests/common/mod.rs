#![allow(dead_code)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::StreamExt;
use http_body_util::BodyExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use cinelink_relay::config::Config;
use cinelink_relay::state::AppState;

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// App router over fresh in-memory state.
pub fn test_app() -> (Router, AppState) {
    let state = AppState::in_memory(Config::default());
    let app = cinelink_relay::routes::router().with_state(state.clone());
    (app, state)
}

/// Test helper: send a GET request to the app and return (status, body).
pub async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap_or_default();

    send(app, request).await
}

/// Test helper: POST a raw JSON body and return (status, body).
pub async fn post_json(app: &Router, uri: &str, body: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_default();

    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap_or_default();

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .unwrap_or_default();
    let body_str = String::from_utf8(body.to_vec()).unwrap_or_default();

    (status, body_str)
}

/// Serve a fresh relay on an ephemeral local port.
pub async fn spawn_relay() -> (SocketAddr, AppState) {
    let (app, state) = test_app();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, state)
}

/// Open a relay socket; `query` is appended verbatim after `/ws`.
pub async fn connect(addr: SocketAddr, query: &str) -> WsClient {
    let url = format!("ws://{addr}/ws{query}");
    let (ws, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("websocket connect");
    ws
}

/// Next text frame parsed as JSON, or `None` if nothing arrives within `wait`.
pub async fn next_json(ws: &mut WsClient, wait: Duration) -> Option<serde_json::Value> {
    loop {
        let frame = tokio::time::timeout(wait, ws.next()).await.ok()??.ok()?;
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).ok();
        }
    }
}

/// Read frames until one of `type == message_type` arrives.
pub async fn next_of_type(ws: &mut WsClient, message_type: &str) -> Option<serde_json::Value> {
    loop {
        let value = next_json(ws, Duration::from_secs(2)).await?;
        if value["type"] == message_type {
            return Some(value);
        }
    }
}

/// Consume frames until `count` members are reported by a presence frame.
pub async fn wait_for_count(ws: &mut WsClient, count: u64) {
    while let Some(value) = next_of_type(ws, "presence").await {
        if value["payload"]["count"] == count {
            return;
        }
    }
    panic!("presence count {count} never observed");
}
