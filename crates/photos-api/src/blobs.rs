use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

/// Failure while streaming a blob to disk. The partial file has already
/// been removed when this is returned.
#[derive(Debug, Error)]
pub enum BlobWriteError<E> {
    #[error("reading upload stream: {0}")]
    Source(E),
    #[error("writing blob: {0}")]
    Io(#[from] std::io::Error),
}

/// On-disk image storage.
///
/// Each upload is stored as a single flat file at `{dir}/{upload_id}`. The
/// client's file name never reaches the filesystem.
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Idempotent.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    pub fn path(&self, id: Uuid) -> PathBuf {
        self.dir.join(id.to_string())
    }

    /// Stream `source` into the blob for `id`, returning the bytes written.
    /// The blob only survives a complete write: on failure, or when the
    /// returned future is dropped early, the partial file is deleted.
    pub async fn write_stream<S, E>(&self, id: Uuid, source: S) -> Result<u64, BlobWriteError<E>>
    where
        S: Stream<Item = Result<Bytes, E>>,
    {
        write_to(&self.path(id), source).await
    }

    pub async fn read(&self, id: Uuid) -> std::io::Result<Vec<u8>> {
        fs::read(self.path(id)).await
    }

    pub async fn open(&self, id: Uuid) -> std::io::Result<fs::File> {
        fs::File::open(self.path(id)).await
    }

    /// Best-effort delete; failures are logged.
    pub async fn remove(&self, id: Uuid) {
        match fs::remove_file(self.path(id)).await {
            Ok(()) => info!("Deleted blob {}", id),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to delete blob {}: {}", id, e),
        }
    }
}

/// Deletes the file at `path` on drop unless disarmed.
struct PartialBlob<'a> {
    path: &'a Path,
    armed: bool,
}

impl Drop for PartialBlob<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(self.path) {
            Ok(()) => info!("Removed partial blob {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove partial blob {}: {}", self.path.display(), e),
        }
    }
}

async fn write_to<S, E>(path: &Path, source: S) -> Result<u64, BlobWriteError<E>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let mut source = std::pin::pin!(source);
    let mut partial = PartialBlob { path, armed: true };
    let mut file = fs::File::create(path).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = source.next().await {
        let chunk = chunk.map_err(BlobWriteError::Source)?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;

    partial.armed = false;
    Ok(written)
}
