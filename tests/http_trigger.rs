//! HTTP trigger surface, driven through the router without a socket.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use bakery_scheduler::backend::InMemoryBackend;
use bakery_scheduler::notify::RecordingDispatcher;
use bakery_scheduler::server::{router, AppState};
use bakery_scheduler::InventoryScheduler;

fn app_at(now: DateTime<Utc>) -> (Arc<InMemoryBackend>, axum::Router) {
    let backend = Arc::new(InMemoryBackend::new());
    let scheduler = Arc::new(InventoryScheduler::from_backend(
        backend.clone(),
        Arc::new(RecordingDispatcher::new()),
    ));
    let state = AppState::new(scheduler).with_clock(move || now);
    (backend, router(state))
}

async fn call(app: axum::Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn wednesday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (_, app) = app_at(wednesday());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wednesday_without_action_is_bad_request() {
    let (backend, app) = app_at(wednesday());
    let (status, body) = call(app, "POST", "/trigger", "").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Cannot infer action"));
    assert_eq!(backend.reads(), 0);
}

#[tokio::test]
async fn test_garbage_body_falls_back_to_inference() {
    let monday = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
    let (_, app) = app_at(monday);
    let (status, body) = call(app, "POST", "/trigger", "{not json").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "mark_overdue");
    assert_eq!(body["report"]["kind"], "overdue_sweep");
}

#[tokio::test]
async fn test_explicit_create() {
    let (backend, app) = app_at(wednesday());
    let store = backend.add_store("Central").await;
    let baker = backend.add_worker("Anna", "baker", None).await;
    backend.assign_worker(&baker.id, &store.id, wednesday()).await;

    let (status, body) = call(app, "POST", "/trigger", r#"{"action":"create"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "create");
    assert_eq!(body["message"], "Created 1 inventory acts for week 42/2026");
    assert_eq!(body["report"]["scheduled_date"], "2026-10-18");
}

#[tokio::test]
async fn test_upstream_failure_is_server_error() {
    let (backend, app) = app_at(wednesday());
    backend.fail(bakery_scheduler::backend::FailPoint::ListStores, true);

    let (status, body) = call(app, "POST", "/trigger", r#"{"action":"create"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("fetch stores"));
}

#[tokio::test]
async fn test_progress_reminder_route() {
    let (backend, app) = app_at(wednesday());
    let worker = backend.add_worker("Anna", "baker", Some("ExponentPushToken[a]")).await;
    backend.open_shift(&worker.id).await;

    let (status, body) = call(app, "POST", "/reminders/progress", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notifications"]["sent"], 1);
}
