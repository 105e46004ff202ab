use axum::{
    Extension,
    extract::{Multipart, State, multipart::MultipartError},
    response::{Html, Redirect},
};
use chrono::Utc;
use photos_db::timestamp;
use photos_types::models::{Session, Upload};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::blobs::BlobWriteError;
use crate::error::ApiError;
use crate::pages;
use crate::state::AppState;

/// GET /upload
pub async fn upload_form(Extension(session): Extension<Session>) -> Html<String> {
    Html(pages::upload_page(&session))
}

/// POST /upload: accepts `title`, `caption` and one or more `images`
/// parts, in that order.
///
/// Images are committed one at a time. A failure on one image leaves the
/// earlier ones stored and skips the rest. Each stored image is handed to
/// the metadata extractor without waiting for it.
pub async fn submit_upload(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    multipart: Multipart,
) -> Result<Redirect, ApiError> {
    let ids = ingest(&state, multipart).await?;
    info!(
        username = %session.username(),
        count = ids.len(),
        "upload accepted"
    );
    Ok(Redirect::to("/"))
}

/// Store every image in the submission. Returns the new upload ids in
/// submission order.
pub async fn ingest(state: &AppState, mut multipart: Multipart) -> Result<Vec<Uuid>, ApiError> {
    // Nothing is written unless the blob area is usable.
    state
        .blobs
        .ensure_dir()
        .await
        .map_err(ApiError::io("create upload directory"))?;

    let mut title = String::new();
    let mut caption = String::new();
    let mut ids = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("title") => title = field.text().await.map_err(bad_multipart)?,
            Some("caption") => caption = field.text().await.map_err(bad_multipart)?,
            Some("images") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                if filename.is_empty() {
                    // Browsers send an empty part when no file was chosen.
                    continue;
                }
                let content_type = field.content_type().unwrap_or_default().to_string();
                if !is_accepted_image(&content_type) {
                    return Err(ApiError::Validation(format!(
                        "{filename}: expected an image, got {content_type:?}"
                    )));
                }

                let id = Uuid::now_v7();
                let size = state.blobs.write_stream(id, field).await.map_err(|e| match e {
                    BlobWriteError::Source(e) => bad_multipart(e),
                    BlobWriteError::Io(e) => ApiError::io("write blob")(e),
                })?;

                let upload = Upload::new(
                    id,
                    title.as_str(),
                    caption.as_str(),
                    filename,
                    content_type,
                    timestamp::truncate(Utc::now()),
                );
                info!(upload = %id, filename = %upload.filename, size, "stored blob");
                commit_upload(state, upload).await?;
                ids.push(id);
            }
            other => warn!(field = ?other, "ignoring unexpected multipart field"),
        }
    }

    if ids.is_empty() {
        return Err(ApiError::Validation("no images in submission".into()));
    }
    Ok(ids)
}

/// Insert the row for an already-written blob and queue its metadata
/// extraction. Runs as its own task so a cancelled request cannot stop
/// between the insert and the extraction hand-off. If the insert fails the
/// blob is removed.
pub async fn commit_upload(state: &AppState, upload: Upload) -> Result<(), ApiError> {
    let id = upload.id;
    let blobs = state.blobs.clone();
    let state = state.clone();
    let task = tokio::spawn(async move {
        if let Err(e) = state.db.insert_upload(&upload).await {
            error!(upload = %id, error = %e, "insert failed, removing blob");
            state.blobs.remove(id).await;
            return Err(ApiError::storage("insert upload")(e));
        }
        state.extractor.spawn(id);
        Ok(())
    });

    match task.await {
        Ok(result) => result,
        Err(e) => {
            error!(upload = %id, error = %e, "commit task failed, removing blob");
            blobs.remove(id).await;
            Err(ApiError::Internal(format!("commit upload {id}: {e}")))
        }
    }
}

/// Raster image types only. SVG is refused since it can carry script and
/// is served from the gallery's own origin.
fn is_accepted_image(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("image/") && essence != "image/svg+xml"
}

fn bad_multipart(e: MultipartError) -> ApiError {
    ApiError::Validation(e.body_text())
}
