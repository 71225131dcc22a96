//! REST handlers for the drive.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{delete, get, patch, post},
    Json, Router,
};
use bytes::Bytes;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::extract::AuthUser;
use super::types::*;
use crate::drive::{
    FileEntry, FileTree, Flag, NewFileEntry, ObjectStore, UploadObject, UserContext,
};
use crate::error::{AppError, Result};
use crate::identity::{IdentityProvider, Session, UserProfile};
use crate::validation::{SignInForm, SignUpForm};

/// Room for multipart boundaries and the small text fields next to the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers.
pub struct AppState {
    pub tree: FileTree,
    pub identity: Arc<dyn IdentityProvider>,
    /// Largest accepted upload in bytes
    pub max_upload_bytes: u64,
    /// Public ImageKit settings handed to clients for direct uploads
    pub imagekit_public_key: String,
    pub imagekit_url_endpoint: String,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let upload_limit =
        DefaultBodyLimit::max(state.max_upload_bytes as usize + MULTIPART_OVERHEAD);
    let state = Arc::new(state);

    Router::new()
        // Listing and lookups
        .route("/api/files", get(list_files))
        .route("/api/files/:id", get(get_file).delete(delete_file))
        .route("/api/files/:id/path", get(file_path))
        .route("/api/files/:id/download", get(download_file))
        // Creation
        .route("/api/files/upload", post(upload_file).layer(upload_limit))
        .route("/api/folders/create", post(create_folder))
        // Flags and moves
        .route("/api/files/:id/star", patch(toggle_star))
        .route("/api/files/:id/trash", patch(toggle_trash))
        .route("/api/files/:id/restore", patch(restore_file))
        .route("/api/files/:id/move", patch(move_file))
        .route("/api/trash", delete(empty_trash))
        // Providers
        .route("/api/imagekit-auth", get(imagekit_auth))
        .route("/api/profile", get(profile))
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/auth/sign-up", post(sign_up))
        .with_state(state)
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::Validation(format!("Invalid id: {}", raw)))
}

/// Absent, empty and `"null"` all mean the root.
fn parse_parent(raw: Option<&str>) -> Result<Option<Uuid>> {
    match raw.map(str::trim) {
        None | Some("") | Some("null") => Ok(None),
        Some(id) => parse_id(id).map(Some),
    }
}

/// A body may name its user, but only the signed-in one.
fn check_user(ctx: &UserContext, claimed: Option<&str>) -> Result<()> {
    if claimed != Some(ctx.user_id.as_str()) {
        return Err(AppError::Auth("Unauthorized".to_string()));
    }
    Ok(())
}

// ============================================================================
// Listing and lookups
// ============================================================================

/// GET /api/files?parentId=&includeTrashed=
async fn list_files(
    State(state): State<Arc<AppState>>,
    AuthUser(ctx): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<FileEntry>>> {
    let parent = parse_parent(query.parent_id.as_deref())?;
    let entries = state
        .tree
        .list_for_user(&ctx, parent, query.include_trashed)
        .await?;
    Ok(Json(entries))
}

/// GET /api/files/:id
async fn get_file(
    State(state): State<Arc<AppState>>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileEntry>> {
    Ok(Json(state.tree.get(&ctx, parse_id(&id)?).await?))
}

/// GET /api/files/:id/path - Breadcrumb from the root.
async fn file_path(
    State(state): State<Arc<AppState>>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<FileEntry>>> {
    Ok(Json(state.tree.ancestors(&ctx, parse_id(&id)?).await?))
}

/// GET /api/files/:id/download - Redirect to the CDN URL.
async fn download_file(
    State(state): State<Arc<AppState>>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let entry = state.tree.get(&ctx, parse_id(&id)?).await?;
    if entry.is_folder {
        return Err(AppError::Validation(format!(
            "'{}' is a folder and cannot be downloaded",
            entry.name
        )));
    }

    tracing::debug!("Redirecting download of {} to {}", entry.id, entry.file_url);
    Ok(Redirect::temporary(&entry.file_url))
}

// ============================================================================
// Creation
// ============================================================================

fn multipart_error(err: MultipartError, limit: u64) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::SizeLimit { size: 0, limit }
    } else {
        AppError::Validation(err.body_text())
    }
}

struct UploadedFile {
    name: String,
    content_type: String,
    data: Bytes,
}

/// POST /api/files/upload - multipart `file`, `userId`, optional `parentId`.
async fn upload_file(
    State(state): State<Arc<AppState>>,
    AuthUser(ctx): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<FileEntry>> {
    let limit = state.max_upload_bytes;
    let mut file = None;
    let mut user_id = None;
    let mut parent_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&file_name)
                            .first_or_octet_stream()
                            .to_string()
                    });
                let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
                file = Some(UploadedFile {
                    name: file_name,
                    content_type,
                    data,
                });
            }
            "userId" => {
                user_id = Some(field.text().await.map_err(|e| multipart_error(e, limit))?);
            }
            "parentId" => {
                parent_id = Some(field.text().await.map_err(|e| multipart_error(e, limit))?);
            }
            other => tracing::debug!("Ignoring upload field '{}'", other),
        }
    }

    check_user(&ctx, user_id.as_deref())?;
    let file = file.ok_or_else(|| AppError::Validation("No file provided".to_string()))?;

    if !file.content_type.starts_with("image/") {
        return Err(AppError::Validation("Only images are supported".to_string()));
    }
    let size = file.data.len() as u64;
    if size > limit {
        return Err(AppError::SizeLimit { size, limit });
    }

    let parent = parse_parent(parent_id.as_deref())?;
    if let Some(parent) = parent {
        state.tree.writable_parent(&ctx, parent).await?;
    }

    tracing::info!(
        "Uploading '{}' ({} bytes, {}) for user {}",
        file.name,
        size,
        file.content_type,
        ctx.user_id
    );

    let stored = state
        .tree
        .store()
        .upload(UploadObject {
            user_id: ctx.user_id.clone(),
            parent_id: parent,
            file_name: file.name.clone(),
            content_type: file.content_type.clone(),
            data: file.data,
        })
        .await?;
    let storage_id = stored.storage_id.clone();

    let entry = NewFileEntry::file(file.name, file.content_type, stored, parent);
    match state.tree.create(&ctx, entry).await {
        Ok(created) => Ok(Json(created)),
        Err(e) => {
            // Don't leave an object nobody can see.
            if let Err(cleanup) = state.tree.store().delete(&storage_id).await {
                tracing::warn!("Could not remove orphaned object {}: {}", storage_id, cleanup);
            }
            Err(e)
        }
    }
}

/// POST /api/folders/create
async fn create_folder(
    State(state): State<Arc<AppState>>,
    AuthUser(ctx): AuthUser,
    Json(request): Json<CreateFolderRequest>,
) -> Result<Json<FileEntry>> {
    check_user(&ctx, Some(&request.user_id))?;
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Folder name is required".to_string()));
    }

    let parent = parse_parent(request.parent_id.as_deref())?;
    let folder = state
        .tree
        .create_folder(&ctx, &request.name, parent)
        .await?;
    Ok(Json(folder))
}

// ============================================================================
// Flags, moves and deletion
// ============================================================================

/// PATCH /api/files/:id/star - Toggle the star.
async fn toggle_star(
    State(state): State<Arc<AppState>>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileEntry>> {
    let entry = state
        .tree
        .toggle_flag(&ctx, parse_id(&id)?, Flag::Star)
        .await?;
    Ok(Json(entry))
}

/// PATCH /api/files/:id/trash - Move to or out of the trash.
async fn toggle_trash(
    State(state): State<Arc<AppState>>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileEntry>> {
    let entry = state
        .tree
        .toggle_flag(&ctx, parse_id(&id)?, Flag::Trash)
        .await?;
    Ok(Json(entry))
}

/// PATCH /api/files/:id/restore
async fn restore_file(
    State(state): State<Arc<AppState>>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileEntry>> {
    Ok(Json(state.tree.restore(&ctx, parse_id(&id)?).await?))
}

/// PATCH /api/files/:id/move
async fn move_file(
    State(state): State<Arc<AppState>>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<FileEntry>> {
    let parent = parse_parent(request.parent_id.as_deref())?;
    let entry = state
        .tree
        .move_entry(&ctx, parse_id(&id)?, parent)
        .await?;
    Ok(Json(entry))
}

/// DELETE /api/files/:id - Delete permanently.
async fn delete_file(
    State(state): State<Arc<AppState>>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let id = parse_id(&id)?;
    state.tree.purge(&ctx, id).await?;
    Ok(Json(DeleteResponse {
        success: true,
        deleted_id: id.to_string(),
    }))
}

/// DELETE /api/trash - Delete everything in the trash.
async fn empty_trash(
    State(state): State<Arc<AppState>>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<EmptyTrashResponse>> {
    let deleted_count = state.tree.empty_trash(&ctx).await?;
    Ok(Json(EmptyTrashResponse {
        success: true,
        deleted_count,
    }))
}

// ============================================================================
// Providers
// ============================================================================

/// GET /api/imagekit-auth
async fn imagekit_auth(
    State(state): State<Arc<AppState>>,
    AuthUser(_ctx): AuthUser,
) -> Result<Json<ImageKitAuthResponse>> {
    Ok(Json(ImageKitAuthResponse {
        params: state.tree.store().auth_parameters()?,
        public_key: state.imagekit_public_key.clone(),
        url_endpoint: state.imagekit_url_endpoint.clone(),
    }))
}

/// GET /api/profile
async fn profile(
    State(state): State<Arc<AppState>>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<ProfileResponse>> {
    let user = state.identity.user(&ctx.user_id).await?;
    let usage = state.tree.usage(&ctx).await?;
    Ok(Json(ProfileResponse { user, usage }))
}

/// POST /api/auth/sign-in
async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(form): Json<SignInForm>,
) -> Result<Json<Session>> {
    form.validate()?;
    let session = state
        .identity
        .sign_in(&form.identifier, &form.password)
        .await?;
    Ok(Json(session))
}

/// POST /api/auth/sign-up
async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(form): Json<SignUpForm>,
) -> Result<impl IntoResponse> {
    form.validate()?;
    let user: UserProfile = state.identity.sign_up(&form.email, &form.password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
