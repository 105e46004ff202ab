//! Background camera-metadata extraction.
//!
//! Runs detached from the request that created the upload. Anything that
//! goes wrong here is logged and contained; the stored record is only
//! touched when a metadata block decodes cleanly.

use std::io::Cursor;
use std::sync::Arc;

use chrono::Utc;
use exif::{Exif, In, Tag, Value};
use photos_db::{Database, StorageError, timestamp};
use photos_types::models::{ExifTag, UploadMetadata};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::blobs::BlobStore;
use crate::fault;

/// What a decoder made of an image's bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Found(UploadMetadata),
    NoMetadata,
    Malformed(String),
}

/// Turns raw image bytes into structured metadata.
pub trait MetadataDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Decoded;
}

/// EXIF decoding backed by `kamadak-exif`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifDecoder;

impl MetadataDecoder for ExifDecoder {
    fn decode(&self, bytes: &[u8]) -> Decoded {
        // GIF, BMP and friends never carry an EXIF block.
        if !is_exif_container(bytes) {
            return Decoded::NoMetadata;
        }
        match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
            Ok(exif) => Decoded::Found(metadata_from(&exif)),
            Err(exif::Error::NotFound(_)) => Decoded::NoMetadata,
            Err(e) => Decoded::Malformed(e.to_string()),
        }
    }
}

/// Containers `kamadak-exif` can look inside: JPEG, TIFF, PNG, WebP and
/// the ISO BMFF family (HEIF/AVIF).
fn is_exif_container(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0xFF, 0xD8])
        || bytes.starts_with(b"II*\0")
        || bytes.starts_with(b"MM\0*")
        || bytes.starts_with(b"\x89PNG\r\n\x1a\n")
        || (bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(&b"WEBP"[..]))
        || bytes.get(4..8) == Some(&b"ftyp"[..])
}

fn metadata_from(exif: &Exif) -> UploadMetadata {
    let camera = match (ascii(exif, Tag::Make), ascii(exif, Tag::Model)) {
        // Many vendors repeat the make inside the model string.
        (Some(make), Some(model)) if model.starts_with(&make) => Some(model),
        (Some(make), Some(model)) => Some(format!("{make} {model}")),
        (make, model) => make.or(model),
    };

    let iso = exif
        .get_field(Tag::PhotographicSensitivity, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .map(|v| v.to_string());

    let aperture = rational(exif, Tag::FNumber)
        .filter(|&(_, denom)| denom != 0)
        .map(|(num, denom)| format!("f/{}", f64::from(num) / f64::from(denom)));

    let exposure = rational(exif, Tag::ExposureTime)
        .filter(|&(_, denom)| denom != 0)
        .map(|(num, denom)| match denom {
            1 => num.to_string(),
            _ => format!("{num}/{denom}"),
        });

    let tags = exif
        .fields()
        .map(|f| ExifTag {
            ifd: f.ifd_num.to_string(),
            tag: f.tag.to_string(),
            value: f.display_value().with_unit(exif).to_string(),
        })
        .collect();

    let mut misc = std::collections::BTreeMap::new();
    misc.insert(
        "byte_order".to_string(),
        if exif.little_endian() { "little-endian" } else { "big-endian" }.to_string(),
    );
    for (key, tag) in [
        ("orientation", Tag::Orientation),
        ("datetime_original", Tag::DateTimeOriginal),
        ("lens_model", Tag::LensModel),
    ] {
        if let Some(field) = exif.get_field(tag, In::PRIMARY) {
            misc.insert(key.to_string(), field.display_value().to_string());
        }
    }

    UploadMetadata {
        camera,
        iso,
        aperture,
        exposure,
        exif: tags,
        misc,
    }
}

fn ascii(exif: &Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(parts) => parts
            .first()
            .map(|s| String::from_utf8_lossy(s).trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn rational(exif: &Exif, tag: Tag) -> Option<(u32, u32)> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(values) => values.first().map(|r| (r.num, r.denom)),
        _ => None,
    }
}

/// Overlay freshly decoded values on what is already stored.
pub fn merge(existing: UploadMetadata, decoded: UploadMetadata) -> UploadMetadata {
    let mut misc = existing.misc;
    misc.extend(decoded.misc);
    UploadMetadata {
        camera: decoded.camera.or(existing.camera),
        iso: decoded.iso.or(existing.iso),
        aperture: decoded.aperture.or(existing.aperture),
        exposure: decoded.exposure.or(existing.exposure),
        exif: if decoded.exif.is_empty() {
            existing.exif
        } else {
            decoded.exif
        },
        misc,
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("upload {0} does not exist")]
    UploadMissing(Uuid),
    #[error("reading blob: {0}")]
    Blob(#[from] std::io::Error),
    #[error("malformed metadata: {0}")]
    Malformed(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("decoder failed: {0}")]
    Panicked(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Updated,
    NoMetadata,
}

pub struct MetadataExtractor {
    db: Database,
    blobs: BlobStore,
    decoder: Arc<dyn MetadataDecoder>,
}

impl MetadataExtractor {
    pub fn new(db: Database, blobs: BlobStore, decoder: Arc<dyn MetadataDecoder>) -> Self {
        Self { db, blobs, decoder }
    }

    /// Decode the blob for `id` and store its metadata. The record is left
    /// untouched unless decoding produced a metadata block.
    pub async fn extract(&self, id: Uuid) -> Result<ExtractionOutcome, ExtractionError> {
        let upload = self
            .db
            .upload_by_id(id)
            .await?
            .ok_or(ExtractionError::UploadMissing(id))?;

        let bytes = self.blobs.read(id).await?;

        let decoder = self.decoder.clone();
        let decoded = tokio::task::spawn_blocking(move || decoder.decode(&bytes))
            .await
            .map_err(|e| ExtractionError::Panicked(e.to_string()))?;

        let found = match decoded {
            Decoded::Found(found) => found,
            Decoded::NoMetadata => return Ok(ExtractionOutcome::NoMetadata),
            Decoded::Malformed(reason) => return Err(ExtractionError::Malformed(reason)),
        };

        debug!(
            upload = %id,
            camera = ?found.camera,
            iso = ?found.iso,
            aperture = ?found.aperture,
            exposure = ?found.exposure,
            tags = found.exif.len(),
            "decoded metadata"
        );

        let metadata = merge(upload.metadata.clone(), found);
        let updated = upload.with_metadata(metadata, timestamp::truncate(Utc::now()));
        self.db.update_upload(&updated).await?;
        Ok(ExtractionOutcome::Updated)
    }

    /// Run [`MetadataExtractor::extract`] as a detached task. The outcome is
    /// logged; nothing propagates back to the caller.
    pub fn spawn(self: &Arc<Self>, id: Uuid) -> JoinHandle<()> {
        let extractor = self.clone();
        fault::spawn_contained("extract_metadata", async move {
            match extractor.extract(id).await {
                Ok(ExtractionOutcome::Updated) => info!(upload = %id, "metadata extracted"),
                Ok(ExtractionOutcome::NoMetadata) => debug!(upload = %id, "no metadata block"),
                Err(e @ ExtractionError::Malformed(_)) => {
                    warn!(upload = %id, error = %e, "metadata left unchanged")
                }
                Err(e) => error!(upload = %id, error = %e, "metadata extraction failed"),
            }
        })
    }
}
