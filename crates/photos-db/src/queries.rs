use chrono::{DateTime, Utc};
use photos_types::models::{Session, Upload, User};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::Database;
use crate::error::{Result, StorageError};
use crate::models::{SessionRow, UploadRow, UserRow};
use crate::timestamp;

const UPLOAD_COLUMNS: &str =
    "id, title, caption, filename, content_type, metadata, created_at, modified_at";

impl Database {
    // -- Users --

    pub async fn insert_user(&self, user: &User) -> Result<()> {
        let (id, username, hash, created_at) = (
            user.id.to_string(),
            user.username.clone(),
            user.password_hash.clone(),
            timestamp::format(user.created_at),
        );
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO users (id, username, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
                (&id, &username, &hash, &created_at),
            )?;
            Ok(())
        })
        .await
    }

    pub async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let username = username.to_string();
        self.with_conn(move |conn| query_user_by_username(conn, &username))
            .await
    }

    // -- Sessions --

    pub async fn insert_session(&self, session: &Session) -> Result<()> {
        let data = serde_json::to_string(&session.data).map_err(|source| {
            StorageError::Serialization {
                column: "data",
                source,
            }
        })?;
        let (id, created_at, expires_at) = (
            session.id.to_string(),
            timestamp::format(session.created_at),
            timestamp::format(session.expires_at),
        );
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, data, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
                (&id, &data, &created_at, &expires_at),
            )?;
            Ok(())
        })
        .await
    }

    pub async fn session_by_id(&self, id: Uuid) -> Result<Option<Session>> {
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, data, created_at, expires_at FROM sessions WHERE id = ?1",
                    [id.to_string()],
                    |row| {
                        Ok(SessionRow {
                            id: row.get(0)?,
                            data: row.get(1)?,
                            created_at: row.get(2)?,
                            expires_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            row.map(Session::try_from).transpose()
        })
        .await
    }

    /// Returns whether a row was removed.
    pub async fn delete_session(&self, id: Uuid) -> Result<bool> {
        self.with_conn(move |conn| {
            let n = conn.execute("DELETE FROM sessions WHERE id = ?1", [id.to_string()])?;
            Ok(n > 0)
        })
        .await
    }

    pub async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let now = timestamp::format(now);
        self.with_conn(move |conn| {
            Ok(conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [&now])?)
        })
        .await
    }

    // -- Uploads --

    pub async fn insert_upload(&self, upload: &Upload) -> Result<()> {
        let params = UploadParams::from_upload(upload)?;
        self.with_conn(move |conn| {
            conn.execute(
                &format!("INSERT INTO uploads ({UPLOAD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                params.as_sql().as_slice(),
            )?;
            Ok(())
        })
        .await
    }

    /// Full-record update keyed by `upload.id`.
    pub async fn update_upload(&self, upload: &Upload) -> Result<()> {
        let params = UploadParams::from_upload(upload)?;
        self.with_conn(move |conn| {
            let n = conn.execute(
                "UPDATE uploads
                 SET title = ?2, caption = ?3, filename = ?4, content_type = ?5,
                     metadata = ?6, created_at = ?7, modified_at = MAX(?7, ?8)
                 WHERE id = ?1",
                params.as_sql().as_slice(),
            )?;
            if n == 0 {
                return Err(StorageError::NotFound {
                    entity: "upload",
                    id: params.id,
                });
            }
            Ok(())
        })
        .await
    }

    pub async fn upload_by_id(&self, id: Uuid) -> Result<Option<Upload>> {
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {UPLOAD_COLUMNS} FROM uploads WHERE id = ?1"),
                    [id.to_string()],
                    upload_row,
                )
                .optional()?;
            row.map(Upload::try_from).transpose()
        })
        .await
    }

    /// All uploads, newest first.
    pub async fn list_uploads(&self) -> Result<Vec<Upload>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {UPLOAD_COLUMNS} FROM uploads ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map([], upload_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(Upload::try_from).collect()
        })
        .await
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
    )?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    row.map(User::try_from).transpose()
}

fn upload_row(row: &Row<'_>) -> rusqlite::Result<UploadRow> {
    Ok(UploadRow {
        id: row.get(0)?,
        title: row.get(1)?,
        caption: row.get(2)?,
        filename: row.get(3)?,
        content_type: row.get(4)?,
        metadata: row.get(5)?,
        created_at: row.get(6)?,
        modified_at: row.get(7)?,
    })
}

/// Owned column values for an upload, in `UPLOAD_COLUMNS` order.
struct UploadParams {
    id: String,
    title: String,
    caption: String,
    filename: String,
    content_type: String,
    metadata: String,
    created_at: String,
    modified_at: String,
}

impl UploadParams {
    fn from_upload(upload: &Upload) -> Result<Self> {
        let metadata = serde_json::to_string(&upload.metadata).map_err(|source| {
            StorageError::Serialization {
                column: "metadata",
                source,
            }
        })?;
        Ok(Self {
            id: upload.id.to_string(),
            title: upload.title.clone(),
            caption: upload.caption.clone(),
            filename: upload.filename.clone(),
            content_type: upload.content_type.clone(),
            metadata,
            created_at: timestamp::format(upload.created_at),
            modified_at: timestamp::format(upload.modified_at.max(upload.created_at)),
        })
    }

    fn as_sql(&self) -> [&dyn rusqlite::ToSql; 8] {
        [
            &self.id,
            &self.title,
            &self.caption,
            &self.filename,
            &self.content_type,
            &self.metadata,
            &self.created_at,
            &self.modified_at,
        ]
    }
}
