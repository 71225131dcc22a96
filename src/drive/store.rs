//! Storage provider seam used by the file tree and the upload route.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A file handed to the storage provider.
#[derive(Debug, Clone)]
pub struct UploadObject {
    pub user_id: String,
    pub parent_id: Option<uuid::Uuid>,
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Where the provider stored an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub storage_id: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub size: i64,
}

/// Short-lived parameters authorizing direct uploads to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthParameters {
    pub token: String,
    pub expire: i64,
    pub signature: String,
}

/// Binary object storage behind the file tree.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, object: UploadObject) -> Result<StoredObject>;

    /// Delete a stored object. Fails with `AppError::Storage` when the
    /// provider refuses.
    async fn delete(&self, storage_id: &str) -> Result<()>;

    fn auth_parameters(&self) -> Result<AuthParameters>;
}
