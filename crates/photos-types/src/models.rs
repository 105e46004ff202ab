use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Accounts are provisioned out-of-band; the server only reads them.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Payload stored in the `sessions.data` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub data: SessionData,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn username(&self) -> &str {
        &self.data.username
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// One decoded EXIF field, kept as display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExifTag {
    pub ifd: String,
    pub tag: String,
    pub value: String,
}

/// Camera metadata for an upload. Empty until extraction succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aperture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exif: Vec<ExifTag>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub misc: BTreeMap<String, String>,
}

impl UploadMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub id: Uuid,
    pub title: String,
    pub caption: String,
    /// Client-supplied file name. Display only; the blob is stored under `id`.
    pub filename: String,
    pub content_type: String,
    pub metadata: UploadMetadata,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Upload {
    /// A freshly ingested upload with empty metadata and `modified_at == created_at`.
    pub fn new(
        id: Uuid,
        title: impl Into<String>,
        caption: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            caption: caption.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            metadata: UploadMetadata::default(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Replace the metadata block and refresh `modified_at`, never moving it
    /// before `created_at`.
    pub fn with_metadata(mut self, metadata: UploadMetadata, now: DateTime<Utc>) -> Self {
        self.metadata = metadata;
        self.modified_at = now.max(self.created_at);
        self
    }
}
