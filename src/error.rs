// ABOUTME: Centralized error handling system with detailed context and logging
// ABOUTME: Maps registry failures to structured JSON responses without leaking storage details

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::references::Reference;

#[derive(Debug)]
pub enum AppError {
    Database(sea_orm::DbErr),
    NotFound(String),
    Validation(String),
    Storage(String),
    ReferenceConflict(Vec<Reference>),
    Serialization(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(err) => write!(f, "Database error: {}", err),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::ReferenceConflict(refs) => {
                write!(f, "Media is referenced in {} place(s)", refs.len())
            }
            AppError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Database(_) => {
                tracing::error!("Database error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed",
                )
            }
            AppError::NotFound(msg) => {
                tracing::info!("Resource not found: {}", msg);
                (StatusCode::NOT_FOUND, "Resource not found")
            }
            AppError::Validation(msg) => {
                tracing::warn!("Rejected request: {}", msg);
                (StatusCode::BAD_REQUEST, msg.as_str())
            }
            AppError::Storage(_) => {
                tracing::error!("Storage error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage operation failed",
                )
            }
            AppError::ReferenceConflict(refs) => {
                tracing::info!(references = refs.len(), "Refusing to delete media in use");
                let body = Json(json!({
                    "error": "Media is in use",
                    "status": StatusCode::CONFLICT.as_u16(),
                    "usedIn": refs,
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::Serialization(_) => {
                tracing::error!("Serialization error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Data processing failed")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

// Conversion implementations
impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
