//! HTTP client for the drive API.

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use uuid::Uuid;

use super::upload::SelectedFile;
use crate::api::types::{
    CreateFolderRequest, DeleteResponse, EmptyTrashResponse, ImageKitAuthResponse, ListQuery,
    MoveRequest, ProfileResponse,
};
use crate::drive::FileEntry;
use crate::error::{AppError, Result};
use crate::identity::{Session, UserProfile};
use crate::validation::{SignInForm, SignUpForm};

/// Size of the body chunks between two progress reports.
const UPLOAD_CHUNK: usize = 64 * 1024;

/// Upload progress callback, called with a percentage in 0..=100.
pub type Progress = Arc<dyn Fn(u8) + Send + Sync>;

/// Percentage of `sent` over `total`, rounded, capped at 100.
pub fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent * 100 + total / 2) / total).min(100) as u8
}

/// Talks to a drive server on behalf of one session.
#[derive(Clone)]
pub struct DriveClient {
    base_url: String,
    http: Client,
    /// Follows redirects, for fetching from the CDN
    cdn: Client,
    session: Option<String>,
    user_id: Arc<Mutex<Option<String>>>,
}

impl DriveClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            cdn: Client::new(),
            session: None,
            user_id: Arc::default(),
        })
    }

    /// Authenticate later calls with a session token.
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<RequestBuilder> {
        let session = self
            .session
            .as_deref()
            .ok_or_else(|| AppError::Auth("Not signed in".to_string()))?;

        Ok(self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(session))
    }

    async fn json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        let response = checked(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    /// User id of the session, looked up once through the profile.
    pub async fn user_id(&self) -> Result<String> {
        if let Some(id) = self.user_id.lock().clone() {
            return Ok(id);
        }
        let id = self.profile().await?.user.id;
        *self.user_id.lock() = Some(id.clone());
        Ok(id)
    }

    // ========================================================================
    // Listing
    // ========================================================================

    /// Entries of a folder (root when `None`), trashed ones included so the
    /// tabs can filter locally.
    pub async fn list(&self, parent: Option<Uuid>) -> Result<Vec<FileEntry>> {
        let query = ListQuery {
            parent_id: parent.map(|p| p.to_string()),
            include_trashed: true,
        };
        Self::json(self.request(reqwest::Method::GET, "/api/files")?.query(&query)).await
    }

    pub async fn get(&self, id: Uuid) -> Result<FileEntry> {
        Self::json(self.request(reqwest::Method::GET, &format!("/api/files/{}", id))?).await
    }

    /// Breadcrumb from the root down to `id`.
    pub async fn ancestors(&self, id: Uuid) -> Result<Vec<FileEntry>> {
        Self::json(self.request(reqwest::Method::GET, &format!("/api/files/{}/path", id))?).await
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Send one file as multipart, reporting progress as the body is sent.
    pub async fn upload(
        &self,
        file: &SelectedFile,
        parent: Option<Uuid>,
        progress: Progress,
    ) -> Result<FileEntry> {
        let user_id = self.user_id().await?;
        let total = file.data.len() as u64;

        let chunks: Vec<Bytes> = (0..file.data.len())
            .step_by(UPLOAD_CHUNK)
            .map(|start| file.data.slice(start..(start + UPLOAD_CHUNK).min(file.data.len())))
            .collect();

        progress(0);
        let mut sent = 0u64;
        let report = progress.clone();
        let body = stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            report(percent(sent, total));
            Ok::<_, std::io::Error>(chunk)
        });

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(body), total)
            .file_name(file.name.clone())
            .mime_str(&file.content_type)?;

        let mut form = Form::new().part("file", part).text("userId", user_id);
        if let Some(parent) = parent {
            form = form.text("parentId", parent.to_string());
        }

        let entry: FileEntry = Self::json(
            self.request(reqwest::Method::POST, "/api/files/upload")?
                .multipart(form),
        )
        .await?;

        progress(100);
        tracing::info!("Uploaded '{}' as {}", entry.name, entry.id);
        Ok(entry)
    }

    pub async fn create_folder(&self, name: &str, parent: Option<Uuid>) -> Result<FileEntry> {
        let request = CreateFolderRequest {
            name: name.trim().to_string(),
            user_id: self.user_id().await?,
            parent_id: parent.map(|p| p.to_string()),
        };
        Self::json(
            self.request(reqwest::Method::POST, "/api/folders/create")?
                .json(&request),
        )
        .await
    }

    // ========================================================================
    // Flags, moves and deletion
    // ========================================================================

    async fn patch(&self, id: Uuid, action: &str) -> Result<FileEntry> {
        Self::json(self.request(reqwest::Method::PATCH, &format!("/api/files/{}/{}", id, action))?)
            .await
    }

    pub async fn toggle_star(&self, id: Uuid) -> Result<FileEntry> {
        self.patch(id, "star").await
    }

    pub async fn toggle_trash(&self, id: Uuid) -> Result<FileEntry> {
        self.patch(id, "trash").await
    }

    pub async fn restore(&self, id: Uuid) -> Result<FileEntry> {
        self.patch(id, "restore").await
    }

    pub async fn move_to(&self, id: Uuid, parent: Option<Uuid>) -> Result<FileEntry> {
        let request = MoveRequest {
            parent_id: parent.map(|p| p.to_string()),
        };
        Self::json(
            self.request(reqwest::Method::PATCH, &format!("/api/files/{}/move", id))?
                .json(&request),
        )
        .await
    }

    /// Delete permanently.
    pub async fn delete(&self, id: Uuid) -> Result<DeleteResponse> {
        Self::json(self.request(reqwest::Method::DELETE, &format!("/api/files/{}", id))?).await
    }

    pub async fn empty_trash(&self) -> Result<EmptyTrashResponse> {
        Self::json(self.request(reqwest::Method::DELETE, "/api/trash")?).await
    }

    // ========================================================================
    // Download
    // ========================================================================

    /// Where the server redirects downloads of `id`.
    pub async fn download_url(&self, id: Uuid) -> Result<String> {
        let response = checked(
            self.request(reqwest::Method::GET, &format!("/api/files/{}/download", id))?
                .send()
                .await?,
        )
        .await?;

        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| AppError::Internal("Download did not redirect".to_string()))
    }

    /// Fetch the bytes of a stored file.
    pub async fn download(&self, id: Uuid) -> Result<Bytes> {
        let url = self.download_url(id).await?;
        tracing::debug!("Downloading {} from {}", id, url);
        let response = checked(self.cdn.get(&url).send().await?).await?;
        Ok(response.bytes().await?)
    }

    // ========================================================================
    // Account
    // ========================================================================

    pub async fn imagekit_auth(&self) -> Result<ImageKitAuthResponse> {
        Self::json(self.request(reqwest::Method::GET, "/api/imagekit-auth")?).await
    }

    pub async fn profile(&self) -> Result<ProfileResponse> {
        Self::json(self.request(reqwest::Method::GET, "/api/profile")?).await
    }

    /// Open a session. The returned client is signed in.
    pub async fn sign_in(&self, form: &SignInForm) -> Result<(Session, DriveClient)> {
        let session: Session = Self::json(
            self.http
                .post(format!("{}/api/auth/sign-in", self.base_url))
                .json(form),
        )
        .await?;

        let mut client = self.clone().with_session(session.session_id.clone());
        client.user_id = Arc::new(Mutex::new(Some(session.user_id.clone())));
        Ok((session, client))
    }

    pub async fn sign_up(&self, form: &SignUpForm) -> Result<UserProfile> {
        Self::json(
            self.http
                .post(format!("{}/api/auth/sign-up", self.base_url))
                .json(form),
        )
        .await
    }
}

/// Pass success and redirect responses through; map the rest to `AppError`.
async fn checked(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() || status.is_redirection() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::from_response(status, &body))
}

impl std::fmt::Debug for DriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveClient")
            .field("base_url", &self.base_url)
            .field("signed_in", &self.session.is_some())
            .finish()
    }
}
