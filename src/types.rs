// ABOUTME: Type definitions for API requests, responses, and list filters
// ABOUTME: Converts stored media rows into the JSON shape the admin UI and public site consume

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::entities::media;
use crate::error::{AppError, Result};
use crate::references::{Reference, permalink_path};

pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const DEFAULT_GALLERY_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 200;

pub const DEFAULT_CATEGORY: &str = "général";
pub const DEFAULT_FOLDER: &str = "/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: Uuid,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    pub url: String,
    pub permalink: String,
    pub alt: String,
    pub caption: String,
    pub category: String,
    pub folder: String,
    pub tags: Vec<String>,
    pub show_in_gallery: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

impl From<media::Model> for Asset {
    fn from(model: media::Model) -> Self {
        Asset {
            permalink: permalink_path(model.id),
            id: model.id,
            filename: model.filename,
            original_name: model.original_name,
            mime_type: model.mime_type,
            size: model.size,
            width: model.width,
            height: model.height,
            url: model.url,
            alt: model.alt,
            caption: model.caption,
            category: model.category,
            folder: model.folder,
            tags: model.tags.0,
            show_in_gallery: model.show_in_gallery,
            created_at: from_millis(model.created_at),
            updated_at: from_millis(model.updated_at),
        }
    }
}

/// Coarse MIME family used by the list filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimeFilter {
    Image,
    Video,
    Audio,
    /// Anything outside image, video and audio.
    Other,
    /// A concrete type or prefix such as `application/pdf`.
    Prefix(String),
}

impl MimeFilter {
    pub fn parse(raw: &str) -> Result<Option<Self>> {
        let raw = raw.trim().to_ascii_lowercase();
        let filter = match raw.as_str() {
            "" => return Ok(None),
            "image" => MimeFilter::Image,
            "video" => MimeFilter::Video,
            "audio" => MimeFilter::Audio,
            "other" => MimeFilter::Other,
            s if s.contains('/') => MimeFilter::Prefix(s.to_string()),
            s => {
                return Err(AppError::Validation(format!(
                    "Unknown mimeType filter: {}",
                    s
                )));
            }
        };
        Ok(Some(filter))
    }
}

/// Query string of `GET /api/admin/media`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMediaQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub folder: Option<String>,
    pub category: Option<String>,
    pub mime_type: Option<String>,
}

/// Validated filters; every populated field must match.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MediaFilter {
    pub search: Option<String>,
    pub mime: Option<MimeFilter>,
    pub folder: Option<String>,
    pub category: Option<String>,
    pub gallery_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, limit: Option<u64>, default_limit: u64) -> Result<Self> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(default_limit);
        if page == 0 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        let request = Self { page, limit };
        if request.offset().is_none() {
            return Err(AppError::Validation(format!("page {} is out of range", page)));
        }
        Ok(request)
    }

    /// Rows to skip, or `None` when the offset does not fit a SQL integer.
    pub fn offset(&self) -> Option<u64> {
        self.page
            .checked_sub(1)?
            .checked_mul(self.limit)
            .filter(|offset| i64::try_from(*offset).is_ok())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ListMediaQuery {
    pub fn into_parts(self) -> Result<(MediaFilter, PageRequest)> {
        let page = PageRequest::new(self.page, self.limit, DEFAULT_PAGE_SIZE)?;
        let mime = match self.mime_type.as_deref() {
            Some(raw) => MimeFilter::parse(raw)?,
            None => None,
        };
        let filter = MediaFilter {
            search: non_blank(self.search).map(|s| s.trim().to_string()),
            mime,
            folder: non_blank(self.folder),
            category: non_blank(self.category),
            gallery_only: false,
        };
        Ok((filter, page))
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct GalleryQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total.div_ceil(request.limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPage {
    pub data: Vec<Asset>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub folders: Vec<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListMediaResponse {
    #[serde(flatten)]
    pub page: MediaPage,
    pub filters: FilterOptions,
}

/// Caller-supplied metadata for an upload; unset fields take defaults.
#[derive(Debug, Default, Clone)]
pub struct UploadMetadata {
    pub alt: Option<String>,
    pub caption: Option<String>,
    pub category: Option<String>,
    pub folder: Option<String>,
    pub tags: Option<Vec<String>>,
    pub show_in_gallery: Option<bool>,
}

/// A single binary received from the admin UI.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub original_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Editable metadata. Fields not listed here (id, filename, url, mimeType,
/// size) are dropped during deserialization.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMediaRequest {
    pub original_name: Option<String>,
    pub alt: Option<String>,
    pub caption: Option<String>,
    pub category: Option<String>,
    pub folder: Option<String>,
    pub tags: Option<Vec<String>>,
    pub show_in_gallery: Option<bool>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BatchUpdateEntry {
    pub tags: Option<Vec<String>>,
    pub alt: Option<String>,
    pub category: Option<String>,
}

impl From<BatchUpdateEntry> for UpdateMediaRequest {
    fn from(entry: BatchUpdateEntry) -> Self {
        // Blank values leave the stored field alone
        UpdateMediaRequest {
            tags: entry.tags,
            alt: non_blank(entry.alt),
            category: non_blank(entry.category),
            ..UpdateMediaRequest::default()
        }
    }
}

pub type BatchUpdateRequest = HashMap<String, BatchUpdateEntry>;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdateResponse {
    pub success: u64,
    pub failed: u64,
    pub errors: Vec<String>,
}

/// Dry run of an uploads directory import.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPreview {
    /// Media files found, thumbnails included.
    pub total_files: u64,
    /// Files an import would consider.
    pub filtered_files: u64,
    pub thumbnails_skipped: u64,
    /// First keys an import would consider.
    pub preview: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub success: bool,
    pub imported: u64,
    pub skipped: u64,
    pub errors: u64,
    pub total: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencesResponse {
    pub used_in: Vec<Reference>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentDocumentResponse {
    pub collection: String,
    pub id: String,
    pub body: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl ContentDocumentResponse {
    pub fn from_model(model: crate::entities::content_document::Model) -> Result<Self> {
        Ok(Self {
            body: serde_json::from_str(&model.body)?,
            collection: model.collection,
            id: model.id,
            updated_at: from_millis(model.updated_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::media::Tags;

    #[test]
    fn test_tags_collapse_to_set() {
        let tags: Tags = ["a", "a", "b"].into_iter().collect();
        assert_eq!(tags.0, vec!["a".to_string(), "b".to_string()]);

        let tags: Tags = [" spectacle ", "", "affiche", "spectacle"].into_iter().collect();
        assert_eq!(tags.0, vec!["affiche".to_string(), "spectacle".to_string()]);
    }

    #[test]
    fn test_mime_filter_parsing() {
        assert_eq!(MimeFilter::parse("image").unwrap(), Some(MimeFilter::Image));
        assert_eq!(MimeFilter::parse(" Audio ").unwrap(), Some(MimeFilter::Audio));
        assert_eq!(MimeFilter::parse("").unwrap(), None);
        assert_eq!(
            MimeFilter::parse("application/pdf").unwrap(),
            Some(MimeFilter::Prefix("application/pdf".to_string()))
        );
        assert!(matches!(MimeFilter::parse("pictures"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_page_request_bounds() {
        assert_eq!(
            PageRequest::new(None, None, DEFAULT_PAGE_SIZE).unwrap(),
            PageRequest { page: 1, limit: 50 }
        );
        assert!(PageRequest::new(Some(0), None, DEFAULT_PAGE_SIZE).is_err());
        assert!(PageRequest::new(None, Some(0), DEFAULT_PAGE_SIZE).is_err());
        assert!(PageRequest::new(None, Some(MAX_PAGE_SIZE + 1), DEFAULT_PAGE_SIZE).is_err());
    }

    #[test]
    fn test_page_request_offset_must_fit_sql_integer() {
        let last_page = i64::MAX as u64 / 200 + 1;
        let request = PageRequest::new(Some(last_page), Some(200), DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(request.offset(), Some((last_page - 1) * 200));

        assert!(matches!(
            PageRequest::new(Some(last_page + 1), Some(200), DEFAULT_PAGE_SIZE),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            PageRequest::new(Some(u64::MAX), Some(200), DEFAULT_PAGE_SIZE),
            Err(AppError::Validation(_))
        ));
        assert_eq!(PageRequest { page: u64::MAX, limit: 200 }.offset(), None);
        assert_eq!(PageRequest { page: 0, limit: 200 }.offset(), None);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let request = PageRequest { page: 1, limit: 20 };
        assert_eq!(Pagination::new(request, 0).total_pages, 0);
        assert_eq!(Pagination::new(request, 20).total_pages, 1);
        assert_eq!(Pagination::new(request, 41).total_pages, 3);
    }

    #[test]
    fn test_update_request_ignores_identity_fields() {
        let request: UpdateMediaRequest = serde_json::from_value(serde_json::json!({
            "id": "00000000-0000-0000-0000-000000000000",
            "url": "/elsewhere.jpg",
            "mimeType": "text/plain",
            "size": 1,
            "alt": "Affiche",
        }))
        .unwrap();
        assert_eq!(request.alt.as_deref(), Some("Affiche"));
        assert!(request.original_name.is_none());
    }

    #[test]
    fn test_blank_query_filters_are_dropped() {
        let query = ListMediaQuery {
            search: Some("  ".to_string()),
            folder: Some("".to_string()),
            category: Some("spectacles".to_string()),
            ..ListMediaQuery::default()
        };
        let (filter, _) = query.into_parts().unwrap();
        assert_eq!(filter.search, None);
        assert_eq!(filter.folder, None);
        assert_eq!(filter.category.as_deref(), Some("spectacles"));
    }
}
