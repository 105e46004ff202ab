//! The auth gate must short-circuit: a rejected request never runs the
//! handler behind it.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::http::StatusCode;
use axum::{Router, middleware, routing::get};
use chrono::Duration;
use common::{TestApp, get as get_request};
use photos_api::gate::{self, SESSION_COOKIE};
use photos_api::pages::UPLOAD_FORM_MARKER;
use tower::ServiceExt;
use uuid::Uuid;

/// Router whose only handler bumps a counter when it runs.
fn guarded_router(app: &TestApp, hits: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route(
            "/guarded",
            get(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    "handler ran"
                }
            }),
        )
        .route_layer(middleware::from_fn_with_state(
            app.state.clone(),
            gate::require_session,
        ))
        .with_state(app.state.clone())
}

async fn status_of(router: &Router, cookie: Option<&str>) -> StatusCode {
    router
        .clone()
        .oneshot(get_request("/guarded", cookie))
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn missing_cookie_never_reaches_handler() {
    let app = TestApp::new().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let router = guarded_router(&app, hits.clone());

    assert_eq!(status_of(&router, None).await, StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_session_never_reaches_handler() {
    let app = TestApp::new().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let router = guarded_router(&app, hits.clone());

    let unknown = format!("{SESSION_COOKIE}={}", Uuid::now_v7());
    assert_eq!(status_of(&router, Some(&unknown)).await, StatusCode::UNAUTHORIZED);
    let garbage = format!("{SESSION_COOKIE}=not-a-session");
    assert_eq!(status_of(&router, Some(&garbage)).await, StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn expired_session_never_reaches_handler() {
    let app = TestApp::with_settings(|s| s.session_ttl = Duration::seconds(-1)).await;
    let hits = Arc::new(AtomicUsize::new(0));
    let router = guarded_router(&app, hits.clone());

    let cookie = app.session_cookie().await;
    assert_eq!(status_of(&router, Some(&cookie)).await, StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn storage_fault_never_reaches_handler() {
    let app = TestApp::new().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let router = guarded_router(&app, hits.clone());
    let cookie = app.session_cookie().await;

    app.state.db.close();
    assert_eq!(status_of(&router, Some(&cookie)).await, StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn valid_session_runs_handler_once() {
    let app = TestApp::new().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let router = guarded_router(&app, hits.clone());

    let cookie = app.session_cookie().await;
    assert_eq!(status_of(&router, Some(&cookie)).await, StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn upload_form_requires_session() {
    let app = TestApp::new().await;

    let (status, _, body) = app.send(get_request("/upload", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!body.contains(UPLOAD_FORM_MARKER));
    assert!(!body.contains("multipart/form-data"));
}

#[tokio::test]
async fn upload_form_renders_for_session() {
    let app = TestApp::new().await;
    let cookie = app.session_cookie().await;

    let (status, _, body) = app.send(get_request("/upload", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(UPLOAD_FORM_MARKER));
}
