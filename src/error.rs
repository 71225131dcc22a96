//! Error types for the imagedrive application.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::validation::field_messages;

/// Application-wide error type, shared by the server and the client.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad input, shown inline to the user
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Form payload failed its schema
    #[error("Invalid form: {0}")]
    InvalidForm(#[from] validator::ValidationErrors),

    /// File rejected by the upload size ceiling
    #[error("File size exceeds {}MB limit", .limit / (1024 * 1024))]
    SizeLimit { size: u64, limit: u64 },

    /// Entry missing or not owned by the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage provider (ImageKit) failure
    #[error("Storage provider error: {message}")]
    Storage { status: u16, message: String },

    /// Identity provider failure or missing session
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Client-side upload failure; the selected file is kept for a retry
    #[error("Failed to upload file: {0}")]
    Upload(String),

    /// HTTP client error
    #[error("HTTP request failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status used when this error crosses the API boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidForm(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::SizeLimit { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage { .. } | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Upload(_)
            | AppError::Database(_)
            | AppError::Io(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Rebuild an error from a failed API response on the client side.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or_else(|| body.to_string());

        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                AppError::Validation(message)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Auth(message),
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            StatusCode::PAYLOAD_TOO_LARGE => AppError::SizeLimit {
                size: 0,
                limit: crate::MAX_UPLOAD_BYTES,
            },
            StatusCode::BAD_GATEWAY => AppError::Storage {
                status: status.as_u16(),
                message,
            },
            _ => AppError::Internal(format!("{} ({})", message, status)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = json!({ "error": self.to_string() });

        match &self {
            AppError::Storage { status, message } => {
                tracing::error!("Storage provider error: status={}, message={}", status, message);
            }
            AppError::HttpClient(e) => {
                tracing::error!("HTTP client error: {}", e);
            }
            AppError::Auth(msg) => {
                tracing::warn!("Auth error: {}", msg);
            }
            AppError::NotFound(msg) => {
                tracing::debug!("Not found: {}", msg);
            }
            AppError::Validation(msg) => {
                tracing::warn!("Bad request: {}", msg);
            }
            AppError::InvalidForm(errors) => {
                tracing::debug!("Form rejected: {}", errors);
                body["fields"] = json!(field_messages(errors));
            }
            AppError::SizeLimit { size, limit } => {
                tracing::warn!("Upload of {} bytes rejected (limit {})", size, limit);
            }
            AppError::Json(e) => {
                tracing::warn!("JSON error: {}", e);
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
            }
            AppError::Upload(msg) | AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
            }
        }

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
