//! ImageKit API request and response types.

use serde::Deserialize;

/// Error body returned by ImageKit on non-success responses.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(default)]
    pub help: Option<String>,
}

// ============================================================================
// File Operations
// ============================================================================

/// Response data for a file upload.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UploadData {
    pub file_id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub size: i64,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
}
