//! Request and response bodies of the REST API.

use serde::{Deserialize, Serialize};

use crate::drive::{AuthParameters, StorageUsage};
use crate::identity::UserProfile;

/// Query parameters for listing a folder.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Folder to list; absent or empty lists the root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub include_trashed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    pub name: String,
    pub user_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    /// New parent folder; `None` moves to the root
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyTrashResponse {
    pub success: bool,
    pub deleted_count: u64,
}

/// Parameters for uploading straight from a browser to ImageKit.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageKitAuthResponse {
    #[serde(flatten)]
    pub params: AuthParameters,
    pub public_key: String,
    pub url_endpoint: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
    pub usage: StorageUsage,
}
