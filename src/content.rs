// ABOUTME: HTTP endpoints for content collection documents that embed media ids
// ABOUTME: Minimal CRUD so editors can attach and detach media that the delete-guard scans

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{Value, json};

use crate::AppState;
use crate::error::{AppError, Result};
use crate::references::ContentCollection;
use crate::types::ContentDocumentResponse;

pub async fn list_documents(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<Vec<ContentDocumentResponse>>> {
    let collection: ContentCollection = collection.parse()?;
    let documents = state
        .storage
        .list_documents(collection)
        .await?
        .into_iter()
        .map(ContentDocumentResponse::from_model)
        .collect::<Result<Vec<_>>>()?;
    Ok(Json(documents))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<ContentDocumentResponse>> {
    let collection: ContentCollection = collection.parse()?;
    let model = state.storage.get_document(collection, &id).await?;
    Ok(Json(ContentDocumentResponse::from_model(model)?))
}

/// Creates or replaces the whole document body.
pub async fn put_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<ContentDocumentResponse>> {
    let collection: ContentCollection = collection.parse()?;
    if !body.is_object() {
        return Err(AppError::Validation(
            "Document body must be a JSON object".to_string(),
        ));
    }
    if id.trim().is_empty() {
        return Err(AppError::Validation("Document id must not be empty".to_string()));
    }

    let model = state.storage.put_document(collection, &id, &body).await?;
    Ok(Json(ContentDocumentResponse::from_model(model)?))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let collection: ContentCollection = collection.parse()?;
    state.storage.delete_document(collection, &id).await?;
    Ok(Json(json!({"success": true})))
}
