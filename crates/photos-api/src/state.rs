use std::path::PathBuf;
use std::sync::Arc;

use photos_db::Database;

use crate::blobs::BlobStore;
use crate::credentials::CredentialVerifier;
use crate::extract::{ExifDecoder, MetadataDecoder, MetadataExtractor};
use crate::session::SessionManager;

pub type AppState = Arc<AppStateInner>;

/// Request-independent settings the handlers need.
#[derive(Debug, Clone)]
pub struct Settings {
    pub upload_dir: PathBuf,
    pub session_ttl: chrono::Duration,
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            session_ttl: chrono::Duration::hours(24),
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

pub struct AppStateInner {
    pub db: Database,
    pub sessions: SessionManager,
    pub credentials: CredentialVerifier,
    pub blobs: BlobStore,
    pub extractor: Arc<MetadataExtractor>,
    pub max_upload_bytes: usize,
}

impl AppStateInner {
    pub fn new(db: Database, credentials: CredentialVerifier, settings: &Settings) -> AppState {
        Self::with_decoder(db, credentials, settings, Arc::new(ExifDecoder))
    }

    pub fn with_decoder(
        db: Database,
        credentials: CredentialVerifier,
        settings: &Settings,
        decoder: Arc<dyn MetadataDecoder>,
    ) -> AppState {
        let blobs = BlobStore::new(settings.upload_dir.clone());
        Arc::new(Self {
            sessions: SessionManager::new(db.clone(), settings.session_ttl),
            extractor: Arc::new(MetadataExtractor::new(db.clone(), blobs.clone(), decoder)),
            db,
            credentials,
            blobs,
            max_upload_bytes: settings.max_upload_bytes,
        })
    }
}
