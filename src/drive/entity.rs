use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Type marker stored for folders.
pub const FOLDER_TYPE: &str = "folder";

/// One row of the `files` table: a file or a folder.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "files")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub path: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub file_type: String,
    pub file_url: String,
    #[sea_orm(nullable)]
    pub thumbnail_url: Option<String>,
    /// ImageKit file id, needed to delete the stored object
    #[sea_orm(nullable)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub storage_id: Option<String>,
    #[sea_orm(indexed)]
    pub user_id: String,
    #[sea_orm(nullable, indexed)]
    pub parent_id: Option<Uuid>,
    pub is_folder: bool,
    pub is_starred: bool,
    pub is_trash: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_delete = "SetNull"
    )]
    Parent,
}

impl ActiveModelBehavior for ActiveModel {}
