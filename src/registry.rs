// ABOUTME: Media registry coordinating metadata records, blob storage, and the delete-guard
// ABOUTME: Validates uploads, keeps blobs and records in step, and resolves public permalinks

use regex::Regex;
use sea_orm::{EntityTrait, Set, TransactionTrait};
use std::sync::{Arc, LazyLock};
use uuid::Uuid;

use crate::blob_store::{BlobEntry, BlobStore};
use crate::config::RegistryConfig;
use crate::entities::media;
use crate::error::{AppError, Result};
use crate::references::{self, Reference};
use crate::storage::Storage;
use crate::types::*;

/// What `GET /media/{id}` should answer with.
#[derive(Debug, Clone, PartialEq)]
pub enum Permalink {
    Redirect(String),
    Content { mime_type: String, data: Vec<u8> },
}

pub struct MediaRegistry {
    storage: Arc<Storage>,
    blobs: Arc<dyn BlobStore>,
    config: RegistryConfig,
}

fn sanitize_stem(original_name: &str) -> String {
    let stem = match original_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => original_name,
    };
    let sanitized: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(50)
        .collect();
    if sanitized.is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}

fn extension_of(original_name: &str) -> Option<String> {
    original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Uses the declared type unless it is missing or generic, then guesses from the extension.
fn resolve_mime_type(payload: &UploadPayload) -> String {
    let declared = payload
        .content_type
        .as_deref()
        .map(|m| m.split(';').next().unwrap_or(m).trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty() && m != "application/octet-stream");

    declared.unwrap_or_else(|| {
        mime_guess::from_path(&payload.original_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    })
}

fn image_dimensions(mime_type: &str, data: &[u8]) -> (Option<i32>, Option<i32>) {
    if !mime_type.starts_with("image/") {
        return (None, None);
    }
    match imagesize::blob_size(data) {
        Ok(size) => (
            i32::try_from(size.width).ok(),
            i32::try_from(size.height).ok(),
        ),
        Err(err) => {
            tracing::debug!(mime_type, "Could not read image dimensions: {}", err);
            (None, None)
        }
    }
}

const SCAN_PREVIEW_LEN: usize = 20;
const IMPORT_TAG: &str = "import";

// Resized copies such as `poster-300x200.jpg`
static THUMBNAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)-\d+x\d+\.[a-z0-9]+$").expect("valid thumbnail pattern")
});

fn is_thumbnail(key: &str) -> bool {
    THUMBNAIL.is_match(key)
}

/// `2026/10/poster.jpg` lives in folder `/2026/10`; a top-level key in `/`.
fn folder_of(key: &str) -> String {
    match key.rsplit_once('/') {
        Some((dir, _)) => format!("/{}", dir),
        None => DEFAULT_FOLDER.to_string(),
    }
}

fn pick(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl MediaRegistry {
    pub fn new(storage: Arc<Storage>, blobs: Arc<dyn BlobStore>, config: RegistryConfig) -> Self {
        Self {
            storage,
            blobs,
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, filter: &MediaFilter, page: PageRequest) -> Result<MediaPage> {
        let (items, total) = self.storage.list_media(filter, page).await?;
        Ok(MediaPage {
            data: items.into_iter().map(Asset::from).collect(),
            pagination: Pagination::new(page, total),
        })
    }

    pub async fn filter_options(&self) -> Result<FilterOptions> {
        Ok(FilterOptions {
            folders: self.storage.distinct_folders().await?,
            categories: self.storage.distinct_categories().await?,
        })
    }

    /// Distinct folders, newest date folder first.
    pub async fn folders(&self) -> Result<Vec<String>> {
        let mut folders = self.storage.distinct_folders().await?;
        folders.sort_by(|a, b| b.cmp(a));
        Ok(folders)
    }

    /// Public gallery: visible images only.
    pub async fn gallery(&self, page: PageRequest) -> Result<MediaPage> {
        let filter = MediaFilter {
            mime: Some(MimeFilter::Image),
            gallery_only: true,
            ..MediaFilter::default()
        };
        let mut result = self.list(&filter, page).await?;
        if let Some(base) = &self.config.public_base_url {
            for asset in &mut result.data {
                if asset.url.starts_with("/uploads/") {
                    asset.url = format!("{}{}", base, asset.url);
                }
            }
        }
        Ok(result)
    }

    pub async fn get(&self, id: Uuid) -> Result<Asset> {
        Ok(self.storage.find_media(id).await?.into())
    }

    #[tracing::instrument(skip(self, payload, metadata), fields(original_name = %payload.original_name, size = payload.data.len()))]
    pub async fn upload(&self, payload: UploadPayload, metadata: UploadMetadata) -> Result<Asset> {
        if payload.data.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        if payload.data.len() as u64 > self.config.max_upload_bytes {
            return Err(AppError::Validation(format!(
                "File exceeds the {} byte upload limit",
                self.config.max_upload_bytes
            )));
        }
        let mime_type = resolve_mime_type(&payload);
        if !self.config.accepts(&mime_type) {
            return Err(AppError::Validation(format!(
                "File type {} is not accepted",
                mime_type
            )));
        }

        let id = Uuid::new_v4();
        let now = chrono::Utc::now();
        let created_at = now.timestamp_millis();
        let short_id = id.simple().to_string();
        let filename = match extension_of(&payload.original_name) {
            Some(ext) => format!(
                "{}_{}_{}.{}",
                sanitize_stem(&payload.original_name),
                created_at,
                &short_id[..8],
                ext
            ),
            None => format!(
                "{}_{}_{}",
                sanitize_stem(&payload.original_name),
                created_at,
                &short_id[..8]
            ),
        };
        let key = format!("{}/{}", now.format("%Y/%m"), filename);

        let stored = self.blobs.put(&key, &payload.data).await?;

        let (width, height) = image_dimensions(&mime_type, &payload.data);
        let record = media::ActiveModel {
            id: Set(id),
            filename: Set(filename),
            original_name: Set(payload.original_name.clone()),
            mime_type: Set(mime_type),
            size: Set(payload.data.len() as i64),
            width: Set(width),
            height: Set(height),
            storage_key: Set(stored.key.clone()),
            url: Set(stored.url),
            alt: Set(metadata.alt.unwrap_or_default()),
            caption: Set(metadata.caption.unwrap_or_default()),
            category: Set(pick(metadata.category, DEFAULT_CATEGORY)),
            folder: Set(pick(metadata.folder, DEFAULT_FOLDER)),
            tags: Set(metadata.tags.unwrap_or_default().into_iter().collect()),
            show_in_gallery: Set(metadata.show_in_gallery.unwrap_or(false)),
            created_at: Set(created_at),
            updated_at: Set(created_at),
        };

        let model = match self.storage.insert_media(record).await {
            Ok(model) => model,
            Err(err) => {
                if let Err(cleanup) = self.blobs.delete(&stored.key).await {
                    tracing::warn!(key = %stored.key, "Failed to remove blob after insert error: {}", cleanup);
                }
                return Err(err);
            }
        };

        tracing::info!(media_id = %model.id, mime_type = %model.mime_type, "Media uploaded");
        Ok(model.into())
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn update(&self, id: Uuid, update: UpdateMediaRequest) -> Result<Asset> {
        let model = self.storage.update_media(id, update).await?;
        tracing::info!(media_id = %id, "Media metadata updated");
        Ok(model.into())
    }

    /// Applies each entry independently; one bad entry never aborts the batch.
    pub async fn batch_update(&self, updates: BatchUpdateRequest) -> BatchUpdateResponse {
        let mut response = BatchUpdateResponse::default();

        for (raw_id, entry) in updates {
            let outcome = match Uuid::parse_str(&raw_id) {
                Ok(id) => self.update(id, entry.into()).await.map(|_| ()),
                Err(_) => Err(AppError::NotFound(format!("Media {}", raw_id))),
            };
            match outcome {
                Ok(()) => response.success += 1,
                Err(err) => {
                    response.failed += 1;
                    response.errors.push(format!("{}: {}", raw_id, err));
                }
            }
        }

        response
    }

    pub async fn compute_references(&self, id: Uuid) -> Result<Vec<Reference>> {
        self.storage.find_media(id).await?;
        references::compute_references(&self.storage.db, id).await
    }

    /// Deletes an unreferenced asset and its blob.
    ///
    /// The reference scan and the record removal share one transaction over
    /// the database that also holds content documents, so a concurrent content
    /// write is either seen by the scan or ordered after the commit. The blob
    /// is removed before commit; if that fails the transaction rolls back and
    /// the record survives.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let txn = self.storage.db.begin().await?;

        let asset = media::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Media {}", id)))?;

        let used_in = references::compute_references(&txn, id).await?;
        if !used_in.is_empty() {
            txn.rollback().await?;
            return Err(AppError::ReferenceConflict(used_in));
        }

        Storage::delete_media_record(&txn, id).await?;

        if let Err(err) = self.blobs.delete(&asset.storage_key).await {
            txn.rollback().await?;
            return Err(err);
        }

        txn.commit().await?;
        tracing::info!(media_id = %id, "Media deleted");
        Ok(())
    }

    /// MIME type of a stored blob when it is a media file this registry accepts.
    fn scanned_mime_type(&self, key: &str) -> Option<String> {
        let mime_type = mime_guess::from_path(key).first()?.essence_str().to_string();
        self.config.accepts(&mime_type).then_some(mime_type)
    }

    /// Counts the media files in the blob store without importing anything.
    pub async fn scan_preview(&self) -> Result<ScanPreview> {
        let media_files: Vec<BlobEntry> = self
            .blobs
            .list()
            .await?
            .into_iter()
            .filter(|entry| self.scanned_mime_type(&entry.key).is_some())
            .collect();
        let (thumbnails, candidates): (Vec<BlobEntry>, Vec<BlobEntry>) = media_files
            .into_iter()
            .partition(|entry| is_thumbnail(&entry.key));

        Ok(ScanPreview {
            total_files: (thumbnails.len() + candidates.len()) as u64,
            filtered_files: candidates.len() as u64,
            thumbnails_skipped: thumbnails.len() as u64,
            preview: candidates
                .into_iter()
                .take(SCAN_PREVIEW_LEN)
                .map(|entry| entry.key)
                .collect(),
        })
    }

    /// Creates records for media files in the blob store that have none.
    ///
    /// Thumbnails and blobs already known by key, url or filename are skipped.
    /// A failing file is counted and the scan moves on.
    #[tracing::instrument(skip(self))]
    pub async fn scan_import(&self) -> Result<ScanReport> {
        let mut report = ScanReport {
            success: true,
            ..ScanReport::default()
        };

        for entry in self.blobs.list().await? {
            let Some(mime_type) = self.scanned_mime_type(&entry.key) else {
                continue;
            };
            report.total += 1;
            if is_thumbnail(&entry.key) {
                report.skipped += 1;
                continue;
            }
            match self.import_blob(&entry, mime_type).await {
                Ok(true) => report.imported += 1,
                Ok(false) => report.skipped += 1,
                Err(err) => {
                    tracing::warn!(key = %entry.key, "Failed to import blob: {}", err);
                    report.errors += 1;
                }
            }
        }

        tracing::info!(
            imported = report.imported,
            skipped = report.skipped,
            errors = report.errors,
            "Uploads scan finished"
        );
        Ok(report)
    }

    async fn import_blob(&self, entry: &BlobEntry, mime_type: String) -> Result<bool> {
        let filename = entry
            .key
            .rsplit_once('/')
            .map_or(entry.key.as_str(), |(_, name)| name)
            .to_string();
        if self
            .storage
            .find_media_at(&entry.key, &entry.url, &filename)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        let size = i64::try_from(entry.size)
            .map_err(|_| AppError::Storage(format!("Blob {} is too large", entry.key)))?;
        let now = chrono::Utc::now().timestamp_millis();
        let record = media::ActiveModel {
            id: Set(Uuid::new_v4()),
            original_name: Set(filename.clone()),
            filename: Set(filename),
            mime_type: Set(mime_type),
            size: Set(size),
            width: Set(None),
            height: Set(None),
            storage_key: Set(entry.key.clone()),
            url: Set(entry.url.clone()),
            alt: Set(String::new()),
            caption: Set(String::new()),
            category: Set(DEFAULT_CATEGORY.to_string()),
            folder: Set(folder_of(&entry.key)),
            tags: Set([IMPORT_TAG].into_iter().collect()),
            show_in_gallery: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };
        self.storage.insert_media(record).await?;
        Ok(true)
    }

    pub async fn resolve_permalink(&self, id: Uuid) -> Result<Permalink> {
        let asset = self.storage.find_media(id).await?;

        if asset.url.starts_with("http://") || asset.url.starts_with("https://") {
            return Ok(Permalink::Redirect(asset.url));
        }
        if let Some(base) = &self.config.public_base_url {
            return Ok(Permalink::Redirect(format!("{}{}", base, asset.url)));
        }

        let data = self.blobs.get(&asset.storage_key).await?;
        Ok(Permalink::Content {
            mime_type: asset.mime_type,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_stem() {
        assert_eq!(sanitize_stem("Affiche été 2024.jpg"), "Affiche__t__2024");
        assert_eq!(sanitize_stem(".hidden"), "_hidden");
        assert_eq!(sanitize_stem("équipe"), "_quipe");
        assert_eq!(sanitize_stem(""), "file");
        assert_eq!(sanitize_stem(&"a".repeat(80)).len(), 50);
    }

    #[test]
    fn test_thumbnails_and_folders() {
        assert!(is_thumbnail("2019/05/affiche-300x200.jpg"));
        assert!(is_thumbnail("logo-150X150.PNG"));
        assert!(!is_thumbnail("2019/05/affiche.jpg"));
        assert!(!is_thumbnail("saison-2019x.jpg"));

        assert_eq!(folder_of("2019/05/affiche.jpg"), "/2019/05");
        assert_eq!(folder_of("logo.png"), "/");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("photo.JPG").as_deref(), Some("jpg"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of("README"), None);
        assert_eq!(extension_of("weird.j/pg"), None);
    }

    #[test]
    fn test_resolve_mime_type_prefers_declared_type() {
        let payload = UploadPayload {
            original_name: "clip.bin".to_string(),
            content_type: Some("video/mp4; codecs=avc1".to_string()),
            data: vec![1],
        };
        assert_eq!(resolve_mime_type(&payload), "video/mp4");

        let payload = UploadPayload {
            original_name: "dossier.pdf".to_string(),
            content_type: Some("application/octet-stream".to_string()),
            data: vec![1],
        };
        assert_eq!(resolve_mime_type(&payload), "application/pdf");

        let payload = UploadPayload {
            original_name: "photo.png".to_string(),
            content_type: None,
            data: vec![1],
        };
        assert_eq!(resolve_mime_type(&payload), "image/png");
    }
}
