mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use cinelink_relay::config::Config;
use cinelink_relay::snapshots::{DatabaseSnapshotStore, Snapshots};
use cinelink_relay::state::AppState;
use migration::MigratorTrait;

fn is_snapshot_code(code: &str) -> bool {
    // ^[A-HJ-NP-Z2-9]{4}$
    code.len() == 4
        && code
            .chars()
            .all(|c| matches!(c, 'A'..='H' | 'J'..='N' | 'P'..='Z' | '2'..='9'))
}

async fn create(app: &axum::Router, body: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = common::post_json(app, "/api/snapshots", body).await;
    (status, serde_json::from_str(&body).unwrap_or_default())
}

// ──────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_get_snapshot() {
    let (app, _state) = common::test_app();

    let (status, created) = create(&app, r#"{"data":{"foo":1}}"#).await;
    assert_eq!(status, StatusCode::CREATED);
    let code = created["code"].as_str().unwrap_or_default();
    assert!(is_snapshot_code(code), "unexpected code {code:?}");

    let (status, body) = common::get(&app, &format!("/api/snapshots/{code}")).await;
    assert_eq!(status, StatusCode::OK);
    let data: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(data, json!({ "foo": 1 }));
}

#[tokio::test]
async fn get_snapshot_is_case_insensitive() {
    let (app, _state) = common::test_app();
    let (_, created) = create(&app, r#"{"data":[1,2,3]}"#).await;
    let code = created["code"].as_str().unwrap_or_default().to_lowercase();

    let (status, _body) = common::get(&app, &format!("/api/snapshots/{code}")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_snapshot_returns_404() {
    let (app, _state) = common::test_app();
    let (status, body) = common::get(&app, "/api/snapshots/ZZZZ").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn create_without_data_returns_400() {
    let (app, _state) = common::test_app();

    let (status, _) = create(&app, r#"{"other":true}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = create(&app, "not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expired_snapshot_returns_404() {
    let state = AppState::in_memory(Config {
        snapshot_ttl: Duration::ZERO,
        ..Config::default()
    });
    let app = cinelink_relay::routes::router().with_state(state);

    let (_, created) = create(&app, r#"{"data":"short-lived"}"#).await;
    let code = created["code"].as_str().unwrap_or_default();
    tokio::time::sleep(Duration::from_millis(5)).await;

    let (status, _body) = common::get(&app, &format!("/api/snapshots/{code}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ──────────────────────────────────────────────────────────────────────────────
// Database backend
// ──────────────────────────────────────────────────────────────────────────────

async fn database_snapshots(ttl: Duration) -> Snapshots {
    let db = sea_orm::Database::connect("sqlite::memory:")
        .await
        .unwrap_or_default();
    migration::Migrator::up(&db, None).await.unwrap_or_default();
    Snapshots::new(Arc::new(DatabaseSnapshotStore::new(db)), ttl)
}

#[tokio::test]
async fn database_backend_round_trip() {
    let snapshots = database_snapshots(Duration::from_secs(60)).await;
    let data = json!({ "items": [{ "id": "a" }], "gameOptions": { "mode": "pvp" } });

    let code = snapshots.create(&data).await.unwrap_or_default();
    assert!(is_snapshot_code(&code));
    assert_eq!(snapshots.fetch(&code).await.ok(), Some(data));
    assert!(snapshots.fetch("ZZZZ").await.is_err());
}

#[tokio::test]
async fn database_backend_serves_http() {
    let mut state = AppState::in_memory(Config::default());
    state.snapshots = database_snapshots(Duration::from_secs(60)).await;
    let app = cinelink_relay::routes::router().with_state(state);

    let (status, created) = create(&app, r#"{"data":{"foo":1}}"#).await;
    assert_eq!(status, StatusCode::CREATED);
    let code = created["code"].as_str().unwrap_or_default();

    let (status, body) = common::get(&app, &format!("/api/snapshots/{code}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&body).unwrap_or_default(),
        json!({ "foo": 1 })
    );
}

#[tokio::test]
async fn database_backend_sweeps_expired() {
    let snapshots = database_snapshots(Duration::ZERO).await;
    let code = snapshots.create(&json!(1)).await.unwrap_or_default();
    tokio::time::sleep(Duration::from_millis(5)).await;

    assert!(snapshots.fetch(&code).await.is_err());
    assert!(matches!(snapshots.sweep().await, Ok(1)));
}
