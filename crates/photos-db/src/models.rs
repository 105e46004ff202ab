//! Database row types. These map directly to SQLite rows; conversion into
//! the `photos-types` models validates every column.
use photos_types::models::{Session, SessionData, Upload, UploadMetadata, User};

use crate::error::{Result, StorageError};
use crate::timestamp;

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: String,
}

pub struct SessionRow {
    pub id: String,
    pub data: String,
    pub created_at: String,
    pub expires_at: String,
}

pub struct UploadRow {
    pub id: String,
    pub title: String,
    pub caption: String,
    pub filename: String,
    pub content_type: String,
    pub metadata: String,
    pub created_at: String,
    pub modified_at: String,
}

fn corrupt(column: &'static str, id: &str, reason: impl ToString) -> StorageError {
    StorageError::Corrupt {
        column,
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_id(id: &str) -> Result<uuid::Uuid> {
    id.parse().map_err(|e| corrupt("id", id, e))
}

fn parse_ts(column: &'static str, id: &str, value: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    timestamp::parse(value).map_err(|e| corrupt(column, id, e))
}

impl TryFrom<UserRow> for User {
    type Error = StorageError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: parse_id(&row.id)?,
            created_at: parse_ts("created_at", &row.id, &row.created_at)?,
            username: row.username,
            password_hash: row.password_hash,
        })
    }
}

impl TryFrom<SessionRow> for Session {
    type Error = StorageError;

    fn try_from(row: SessionRow) -> Result<Self> {
        let data: SessionData =
            serde_json::from_str(&row.data).map_err(|e| corrupt("data", &row.id, e))?;
        Ok(Session {
            id: parse_id(&row.id)?,
            data,
            created_at: parse_ts("created_at", &row.id, &row.created_at)?,
            expires_at: parse_ts("expires_at", &row.id, &row.expires_at)?,
        })
    }
}

impl TryFrom<UploadRow> for Upload {
    type Error = StorageError;

    fn try_from(row: UploadRow) -> Result<Self> {
        let metadata: UploadMetadata =
            serde_json::from_str(&row.metadata).map_err(|e| corrupt("metadata", &row.id, e))?;
        Ok(Upload {
            id: parse_id(&row.id)?,
            created_at: parse_ts("created_at", &row.id, &row.created_at)?,
            modified_at: parse_ts("modified_at", &row.id, &row.modified_at)?,
            title: row.title,
            caption: row.caption,
            filename: row.filename,
            content_type: row.content_type,
            metadata,
        })
    }
}
