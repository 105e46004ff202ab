use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse},
};
use axum_extra::extract::cookie::CookieJar;
use tokio_util::io::ReaderStream;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::gate;
use crate::pages;
use crate::state::AppState;

/// GET /
///
/// The gallery. Works with or without a session.
pub async fn index(State(state): State<AppState>, jar: CookieJar) -> Result<Html<String>, ApiError> {
    let session = gate::check(&state.sessions, &jar).await.session();
    let uploads = state
        .db
        .list_uploads()
        .await
        .map_err(ApiError::storage("list uploads"))?;
    Ok(Html(pages::gallery_page(&uploads, session.as_ref())))
}

/// GET /uploads/{id}: stream a stored image. Open to anonymous visitors.
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // Only ids ever reach the filesystem.
    let id: Uuid = id
        .parse()
        .map_err(|_| ApiError::Validation("invalid upload id".into()))?;

    let upload = state
        .db
        .upload_by_id(id)
        .await
        .map_err(ApiError::storage("get upload"))?
        .ok_or(ApiError::NotFound)?;

    let file = state.blobs.open(id).await.map_err(|e| {
        warn!(upload = %id, error = %e, "blob missing for stored upload");
        ApiError::NotFound
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, upload.content_type),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        Body::from_stream(ReaderStream::new(file)),
    ))
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}
