//! ImageKit API client for object operations.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};

use super::auth::{Credentials, API_BASE_URL, UPLOAD_URL};
use super::types::{ApiError, UploadData};
use super::RETRY_DELAY;
use crate::drive::{AuthParameters, ObjectStore, StoredObject, UploadObject};
use crate::error::{AppError, Result};

/// Client for interacting with the ImageKit API.
#[derive(Clone)]
pub struct ImageKitClient {
    credentials: Credentials,
    /// Root folder for every user's uploads
    folder_root: String,
    /// Retries on 429 responses; 0 disables retrying
    max_retries: usize,
    upload_url: String,
    api_base_url: String,
}

impl ImageKitClient {
    /// Create a new ImageKit client.
    pub fn new(credentials: Credentials, folder_root: String, max_retries: usize) -> Self {
        Self {
            credentials,
            folder_root,
            max_retries,
            upload_url: UPLOAD_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
        }
    }

    /// Point the client at other endpoints (used against local stand-ins).
    pub fn with_base_urls(mut self, upload_url: String, api_base_url: String) -> Self {
        self.upload_url = upload_url;
        self.api_base_url = api_base_url;
        self
    }

    /// Folder an upload lands in: `<root>/<user>` or `<root>/<user>/folders/<parent>`.
    pub fn folder_for(&self, object: &UploadObject) -> String {
        let root = self.folder_root.trim_end_matches('/');
        match object.parent_id {
            Some(parent) => format!("{}/{}/folders/{}", root, object.user_id, parent),
            None => format!("{}/{}", root, object.user_id),
        }
    }

    /// Send an authenticated request, rebuilding it for each attempt.
    /// Only 429 responses are retried, and only when retries are configured.
    async fn send<F>(&self, action: &str, build: F) -> Result<Response>
    where
        F: Fn() -> Result<RequestBuilder>,
    {
        for attempt in 0..=self.max_retries {
            let response = self.credentials.authorize(build()?).send().await?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                if attempt < self.max_retries {
                    tracing::warn!(
                        "Rate limited (429) when {}, waiting {}s before retry (attempt {}/{})",
                        action,
                        RETRY_DELAY.as_secs(),
                        attempt + 1,
                        self.max_retries
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                } else if self.max_retries > 0 {
                    tracing::error!(
                        "Rate limited (429) after {} retries when {}, giving up",
                        self.max_retries,
                        action
                    );
                }
            }

            return Ok(response);
        }

        unreachable!()
    }
}

/// Turn a non-success response into a storage error.
async fn provider_error(response: Response) -> AppError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&text)
        .map(|e| e.message)
        .unwrap_or(text);

    AppError::Storage {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl ObjectStore for ImageKitClient {
    /// Upload a file with a unique name under the user's folder.
    async fn upload(&self, object: UploadObject) -> Result<StoredObject> {
        let folder = self.folder_for(&object);
        tracing::debug!(
            "Uploading '{}' ({} bytes) to {}",
            object.file_name,
            object.data.len(),
            folder
        );

        let response = self
            .send("uploading file", || {
                let part = Part::bytes(object.data.to_vec())
                    .file_name(object.file_name.clone())
                    .mime_str(&object.content_type)?;

                let form = Form::new()
                    .part("file", part)
                    .text("fileName", object.file_name.clone())
                    .text("folder", folder.clone())
                    .text("useUniqueFileName", "true");

                Ok(self
                    .credentials
                    .http_client()
                    .post(&self.upload_url)
                    .multipart(form))
            })
            .await?;

        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }

        let data: UploadData = response.json().await?;
        tracing::info!(
            "Uploaded '{}' as {} ({})",
            data.name,
            data.file_id,
            data.file_path.as_deref().unwrap_or(&data.url)
        );

        Ok(StoredObject {
            storage_id: data.file_id,
            url: data.url,
            thumbnail_url: data.thumbnail_url,
            size: data.size,
        })
    }

    /// Delete a stored file. An object that is already gone counts as deleted.
    async fn delete(&self, storage_id: &str) -> Result<()> {
        let url = format!("{}/files/{}", self.api_base_url, storage_id);

        let response = self
            .send("deleting file", || {
                Ok(self.credentials.http_client().delete(&url))
            })
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::warn!("Object {} was already missing at ImageKit", storage_id);
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }

        tracing::info!("Deleted object {}", storage_id);
        Ok(())
    }

    fn auth_parameters(&self) -> Result<AuthParameters> {
        Ok(self.credentials.auth_parameters())
    }
}

impl std::fmt::Debug for ImageKitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageKitClient")
            .field("credentials", &self.credentials)
            .field("folder_root", &self.folder_root)
            .finish()
    }
}
