// ABOUTME: HTTP endpoints for the media library admin screens, public gallery, and permalinks
// ABOUTME: Parses multipart uploads and query filters before handing off to the registry

use axum::{
    extract::{Multipart, Path, Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, Result};
use crate::registry::Permalink;
use crate::types::*;

/// Unknown and malformed ids are both "not found" to callers.
pub fn parse_media_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("Media {}", raw)))
}

fn query_error(rejection: QueryRejection) -> AppError {
    AppError::Validation(rejection.body_text())
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        other => Err(AppError::Validation(format!(
            "showInGallery must be a boolean, got {}",
            other
        ))),
    }
}

/// Collects file parts (`file` or `files`) and the shared metadata text parts.
async fn read_upload_form(mut multipart: Multipart) -> Result<(Vec<UploadPayload>, UploadMetadata)> {
    let mut files = Vec::new();
    let mut metadata = UploadMetadata::default();
    let mut tags: Vec<String> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" | "files" => {
                let original_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| "upload".to_string());
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                files.push(UploadPayload {
                    original_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            "alt" | "caption" | "category" | "folder" | "tags" | "showInGallery" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                match name.as_str() {
                    "alt" => metadata.alt = Some(text),
                    "caption" => metadata.caption = Some(text),
                    "category" => metadata.category = Some(text),
                    "folder" => metadata.folder = Some(text),
                    "tags" => tags.extend(text.split(',').map(|t| t.trim().to_string())),
                    _ => metadata.show_in_gallery = Some(parse_flag(&text)?),
                }
            }
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    if !tags.is_empty() {
        metadata.tags = Some(tags);
    }
    Ok((files, metadata))
}

pub async fn list_media(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListMediaQuery>, QueryRejection>,
) -> Result<Json<ListMediaResponse>> {
    let Query(query) = query.map_err(query_error)?;
    let (filter, page) = query.into_parts()?;

    let page = state.registry.list(&filter, page).await?;
    let filters = state.registry.filter_options().await?;
    Ok(Json(ListMediaResponse { page, filters }))
}

/// `POST /api/admin/media`: one or more `files` parts, answered with an array.
pub async fn upload_media(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<Asset>>)> {
    let (files, metadata) = read_upload_form(multipart).await?;
    if files.is_empty() {
        return Err(AppError::Validation("No files uploaded".to_string()));
    }

    let mut created = Vec::with_capacity(files.len());
    for payload in files {
        created.push(state.registry.upload(payload, metadata.clone()).await?);
    }
    Ok((StatusCode::CREATED, Json(created)))
}

/// `POST /api/admin/media/upload`: exactly one `file` part.
pub async fn upload_single(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Asset>)> {
    let (mut files, metadata) = read_upload_form(multipart).await?;
    if files.len() != 1 {
        return Err(AppError::Validation(format!(
            "Expected exactly one file, got {}",
            files.len()
        )));
    }
    let payload = files.remove(0);
    let asset = state.registry.upload(payload, metadata).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

pub async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Asset>> {
    let id = parse_media_id(&id)?;
    Ok(Json(state.registry.get(id).await?))
}

pub async fn update_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<UpdateMediaRequest>,
) -> Result<Json<Asset>> {
    let id = parse_media_id(&id)?;
    Ok(Json(state.registry.update(id, update).await?))
}

pub async fn delete_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id = parse_media_id(&id)?;
    state.registry.delete(id).await?;
    Ok(Json(json!({"success": true})))
}

pub async fn media_references(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReferencesResponse>> {
    let id = parse_media_id(&id)?;
    let used_in = state.registry.compute_references(id).await?;
    Ok(Json(ReferencesResponse { used_in }))
}

pub async fn batch_update(
    State(state): State<AppState>,
    Json(updates): Json<BatchUpdateRequest>,
) -> Json<BatchUpdateResponse> {
    Json(state.registry.batch_update(updates).await)
}

/// `GET /api/admin/media/scan`: what an import of the uploads directory would pick up.
pub async fn scan_preview(State(state): State<AppState>) -> Result<Json<ScanPreview>> {
    Ok(Json(state.registry.scan_preview().await?))
}

/// `POST /api/admin/media/scan`: registers uploaded files that have no record yet.
pub async fn scan_import(State(state): State<AppState>) -> Result<Json<ScanReport>> {
    Ok(Json(state.registry.scan_import().await?))
}

pub async fn list_folders(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.registry.folders().await?))
}

pub async fn gallery(
    State(state): State<AppState>,
    query: std::result::Result<Query<GalleryQuery>, QueryRejection>,
) -> Result<Json<MediaPage>> {
    let Query(query) = query.map_err(query_error)?;
    let page = PageRequest::new(query.page, query.limit, DEFAULT_GALLERY_PAGE_SIZE)?;
    Ok(Json(state.registry.gallery(page).await?))
}

/// `GET /media/{id}`: stable public address for an asset.
pub async fn resolve_permalink(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_media_id(&id)?;
    let response = match state.registry.resolve_permalink(id).await? {
        Permalink::Redirect(location) => {
            (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
        }
        Permalink::Content { mime_type, data } => {
            ([(header::CONTENT_TYPE, mime_type)], data).into_response()
        }
    };
    Ok(response)
}
