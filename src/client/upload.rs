//! Upload form: one selected image, a size ceiling, progress and retry.

use bytes::Bytes;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::api::{DriveClient, Progress};
use crate::drive::FileEntry;
use crate::error::{AppError, Result};
use crate::MAX_UPLOAD_BYTES;

/// Shown when an upload fails for any reason; the selection stays put.
pub const UPLOAD_FAILED: &str = "Failed to upload file. Please try again.";

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl SelectedFile {
    /// Wrap in-memory bytes, guessing the content type from the name.
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        let content_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .to_string();
        Self {
            name,
            content_type,
            data: data.into(),
        }
    }

    /// Read a file from disk. Files over `limit` are refused before reading.
    pub async fn from_path(path: &Path, limit: u64) -> Result<Self> {
        let size = tokio::fs::metadata(path).await?.len();
        if size > limit {
            return Err(AppError::SizeLimit { size, limit });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::Validation(format!("{} is not a file", path.display())))?;
        let data = tokio::fs::read(path).await?;
        Ok(Self::new(name, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Human-readable size: bytes, then KB and MB with one decimal.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

/// State of the upload form between user actions.
pub struct UploadForm {
    max_bytes: u64,
    selected: Option<SelectedFile>,
    error: Option<String>,
    uploading: bool,
    progress: Arc<AtomicU8>,
    listener: Option<Progress>,
}

impl Default for UploadForm {
    fn default() -> Self {
        Self::new(MAX_UPLOAD_BYTES)
    }
}

impl UploadForm {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            selected: None,
            error: None,
            uploading: false,
            progress: Arc::default(),
            listener: None,
        }
    }

    /// Also forward progress percentages to `listener`.
    pub fn with_progress_listener(mut self, listener: Progress) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }

    fn check_size(&mut self, size: u64) -> Result<()> {
        if size > self.max_bytes {
            let err = AppError::SizeLimit {
                size,
                limit: self.max_bytes,
            };
            self.error = Some(err.to_string());
            return Err(err);
        }
        Ok(())
    }

    /// Pick a file. An oversized file is refused and the previous
    /// selection, if any, is kept.
    pub fn select(&mut self, file: SelectedFile) -> Result<()> {
        self.check_size(file.size())?;
        self.selected = Some(file);
        self.error = None;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.selected = None;
        self.error = None;
        self.progress.store(0, Ordering::Relaxed);
    }

    /// Upload the selected file into `parent`. On success the selection is
    /// cleared and `on_success` runs; on failure the file stays selected.
    pub async fn upload<F>(
        &mut self,
        client: &DriveClient,
        parent: Option<Uuid>,
        on_success: F,
    ) -> Result<FileEntry>
    where
        F: FnOnce(&FileEntry),
    {
        let file = self
            .selected
            .clone()
            .ok_or_else(|| AppError::Validation("No file selected".to_string()))?;
        self.check_size(file.size())?;

        self.uploading = true;
        self.error = None;
        self.progress.store(0, Ordering::Relaxed);

        let progress = self.progress.clone();
        let listener = self.listener.clone();
        let report: Progress = Arc::new(move |pct| {
            progress.store(pct, Ordering::Relaxed);
            if let Some(listener) = &listener {
                listener(pct);
            }
        });

        let result = client.upload(&file, parent, report).await;
        self.uploading = false;

        match result {
            Ok(entry) => {
                self.clear();
                on_success(&entry);
                Ok(entry)
            }
            Err(e) => {
                tracing::warn!("Upload of '{}' failed: {}", file.name, e);
                self.error = Some(UPLOAD_FAILED.to_string());
                Err(AppError::Upload(e.to_string()))
            }
        }
    }
}

/// Create a folder. A blank name is refused without a request.
pub async fn create_folder<F>(
    client: &DriveClient,
    name: &str,
    parent: Option<Uuid>,
    on_success: F,
) -> Result<FileEntry>
where
    F: FnOnce(&FileEntry),
{
    if name.trim().is_empty() {
        return Err(AppError::Validation(
            "Please enter a valid folder name.".to_string(),
        ));
    }
    let folder = client.create_folder(name, parent).await?;
    on_success(&folder);
    Ok(folder)
}
