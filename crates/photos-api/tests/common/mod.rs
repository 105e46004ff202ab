//! Shared harness for the HTTP tests.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use argon2::Params;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use chrono::Utc;
use photos_api::credentials::CredentialVerifier;
use photos_api::extract::MetadataDecoder;
use photos_api::gate::SESSION_COOKIE;
use photos_api::{AppState, AppStateInner, Settings, router};
use photos_db::{Database, PoolConfig, timestamp};
use photos_types::models::User;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "test-secret-salt";
pub const BOUNDARY: &str = "photos-test-boundary";

/// A router plus the state behind it, rooted in a temp directory.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(None, |_| {}).await
    }

    pub async fn with_decoder(decoder: Arc<dyn MetadataDecoder>) -> Self {
        Self::build(Some(decoder), |_| {}).await
    }

    pub async fn with_settings(adjust: impl FnOnce(&mut Settings)) -> Self {
        Self::build(None, adjust).await
    }

    async fn build(
        decoder: Option<Arc<dyn MetadataDecoder>>,
        adjust: impl FnOnce(&mut Settings),
    ) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db = Database::open(
            &dir.path().join("photos.db"),
            PoolConfig {
                size: 4,
                acquire_timeout: Duration::from_secs(5),
            },
        )
        .expect("Failed to open database");

        let mut settings = Settings {
            upload_dir: dir.path().join("uploads"),
            ..Default::default()
        };
        adjust(&mut settings);

        let credentials = CredentialVerifier::with_params(SECRET, Params::new(64, 1, 1, None).unwrap())
            .expect("Failed to build verifier");
        let state = match decoder {
            Some(decoder) => AppStateInner::with_decoder(db, credentials, &settings, decoder),
            None => AppStateInner::new(db, credentials, &settings),
        };

        Self {
            router: router(state.clone()),
            state,
            dir,
        }
    }

    pub async fn create_user(&self, username: &str, password: &str) {
        let user = User {
            id: Uuid::now_v7(),
            username: username.to_string(),
            password_hash: self.state.credentials.hash(password).unwrap(),
            created_at: timestamp::truncate(Utc::now()),
        };
        self.state.db.insert_user(&user).await.unwrap();
    }

    /// A `Cookie` header value for a freshly created session.
    pub async fn session_cookie(&self) -> String {
        let session = self.state.sessions.create("admin").await.unwrap();
        format!("{SESSION_COOKIE}={}", session.id)
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8_lossy(&body).into_owned())
    }

    pub async fn upload_count(&self) -> usize {
        self.state.db.list_uploads().await.unwrap().len()
    }

    /// Files currently in the blob directory.
    pub fn blob_count(&self) -> usize {
        std::fs::read_dir(self.state.blobs.dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub struct Part<'a> {
    pub filename: &'a str,
    pub content_type: &'a str,
    pub bytes: Vec<u8>,
}

pub fn multipart_body(title: &str, caption: &str, images: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in [("title", title), ("caption", caption)] {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for part in images {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                part.filename, part.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(&part.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(cookie: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}
