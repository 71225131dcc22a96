//! File/folder tree stored in a flat, self-referencing `files` table.

use chrono::Utc;
use sea_orm::sea_query::{Expr, Index};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Schema, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use super::context::UserContext;
use super::entity::{self, Column, Entity, FOLDER_TYPE};
use super::store::{ObjectStore, StoredObject};
use crate::error::{AppError, Result};

pub type FileEntry = entity::Model;

/// Fields supplied when creating an entry; ownership comes from the context.
#[derive(Debug, Clone)]
pub struct NewFileEntry {
    pub name: String,
    pub size: i64,
    pub file_type: String,
    pub file_url: String,
    pub thumbnail_url: Option<String>,
    pub storage_id: Option<String>,
    pub parent_id: Option<Uuid>,
    pub is_folder: bool,
}

impl NewFileEntry {
    pub fn folder(name: impl Into<String>, parent_id: Option<Uuid>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            file_type: FOLDER_TYPE.to_string(),
            file_url: String::new(),
            thumbnail_url: None,
            storage_id: None,
            parent_id,
            is_folder: true,
        }
    }

    pub fn file(
        name: impl Into<String>,
        content_type: impl Into<String>,
        stored: StoredObject,
        parent_id: Option<Uuid>,
    ) -> Self {
        Self {
            name: name.into(),
            size: stored.size,
            file_type: content_type.into(),
            file_url: stored.url,
            thumbnail_url: stored.thumbnail_url,
            storage_id: Some(stored.storage_id),
            parent_id,
            is_folder: false,
        }
    }
}

/// Boolean flags that can be flipped on an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Star,
    Trash,
}

/// Per-user totals shown on the profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    pub files: u64,
    pub folders: u64,
    pub starred: u64,
    pub trashed: u64,
    pub total_bytes: i64,
}

/// Access layer for the file tree. Every call is scoped to one user.
#[derive(Clone)]
pub struct FileTree {
    pub(crate) db: DatabaseConnection,
    store: Arc<dyn ObjectStore>,
}

impl FileTree {
    /// Connect to the database and make sure the schema exists.
    pub async fn connect(database_url: &str, store: Arc<dyn ObjectStore>) -> Result<Self> {
        let db = Database::connect(database_url).await?;
        init_schema(&db).await?;
        tracing::info!("File tree database ready");
        Ok(Self { db, store })
    }

    /// The storage provider backing this tree.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Direct children of `folder_id` (root entries when `None`).
    /// Trashed entries are left out unless `include_trashed` is set.
    pub async fn list_for_user(
        &self,
        ctx: &UserContext,
        folder_id: Option<Uuid>,
        include_trashed: bool,
    ) -> Result<Vec<FileEntry>> {
        let mut query = Entity::find().filter(Column::UserId.eq(ctx.user_id.as_str()));

        query = match folder_id {
            Some(id) => {
                self.get_folder(ctx, id).await?;
                query.filter(Column::ParentId.eq(id))
            }
            None => query.filter(Column::ParentId.is_null()),
        };

        if !include_trashed {
            query = query.filter(Column::IsTrash.eq(false));
        }

        let entries = query
            .order_by_desc(Column::IsFolder)
            .order_by_asc(Column::Name)
            .all(&self.db)
            .await?;

        tracing::debug!(
            "Listed {} entries for user {} in {:?}",
            entries.len(),
            ctx.user_id,
            folder_id
        );
        Ok(entries)
    }

    /// Fetch one entry owned by the user.
    pub async fn get(&self, ctx: &UserContext, id: Uuid) -> Result<FileEntry> {
        find_owned(&self.db, ctx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))
    }

    /// Fetch an entry and require it to be a folder.
    pub async fn get_folder(&self, ctx: &UserContext, id: Uuid) -> Result<FileEntry> {
        let entry = self.get(ctx, id).await?;
        if !entry.is_folder {
            return Err(AppError::Validation(format!("{} is not a folder", entry.name)));
        }
        Ok(entry)
    }

    /// Breadcrumb from the root down to (and including) the entry.
    pub async fn ancestors(&self, ctx: &UserContext, id: Uuid) -> Result<Vec<FileEntry>> {
        let mut chain = vec![self.get(ctx, id).await?];
        let mut seen = HashSet::from([id]);

        while let Some(parent_id) = chain.last().and_then(|e| e.parent_id) {
            if !seen.insert(parent_id) {
                tracing::warn!("Parent loop detected at {}", parent_id);
                break;
            }
            match find_owned(&self.db, ctx, parent_id).await? {
                Some(parent) => chain.push(parent),
                None => break,
            }
        }

        chain.reverse();
        Ok(chain)
    }

    /// Totals for the profile page.
    pub async fn usage(&self, ctx: &UserContext) -> Result<StorageUsage> {
        let entries = Entity::find()
            .filter(Column::UserId.eq(ctx.user_id.as_str()))
            .all(&self.db)
            .await?;

        Ok(entries
            .iter()
            .fold(StorageUsage::default(), |mut usage, entry| {
                if entry.is_folder {
                    usage.folders += 1;
                } else {
                    usage.files += 1;
                    usage.total_bytes += entry.size;
                }
                if entry.is_starred && !entry.is_trash {
                    usage.starred += 1;
                }
                if entry.is_trash {
                    usage.trashed += 1;
                }
                usage
            }))
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Insert a file or folder row for the user.
    pub async fn create(&self, ctx: &UserContext, entry: NewFileEntry) -> Result<FileEntry> {
        let name = entry.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Name cannot be empty".to_string()));
        }
        if name.contains('/') {
            return Err(AppError::Validation(format!(
                "Name '{}' must not contain '/'",
                name
            )));
        }

        let parent_path = match entry.parent_id {
            Some(parent_id) => self.writable_parent(ctx, parent_id).await?.path,
            None => String::new(),
        };

        let now = Utc::now();
        let model = entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            path: Set(join_path(&parent_path, name)),
            size: Set(entry.size),
            file_type: Set(entry.file_type),
            file_url: Set(entry.file_url),
            thumbnail_url: Set(entry.thumbnail_url),
            storage_id: Set(entry.storage_id),
            user_id: Set(ctx.user_id.clone()),
            parent_id: Set(entry.parent_id),
            is_folder: Set(entry.is_folder),
            is_starred: Set(false),
            is_trash: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        let created = model.insert(&self.db).await?;
        tracing::info!(
            "Created {} '{}' ({}) for user {}",
            if created.is_folder { "folder" } else { "file" },
            created.path,
            created.id,
            ctx.user_id
        );
        Ok(created)
    }

    /// Create a folder under `parent_id` (root when `None`).
    pub async fn create_folder(
        &self,
        ctx: &UserContext,
        name: &str,
        parent_id: Option<Uuid>,
    ) -> Result<FileEntry> {
        self.create(ctx, NewFileEntry::folder(name, parent_id)).await
    }

    /// Set one flag. Trashing a folder trashes its subtree; clearing the
    /// trash flag is a restore.
    pub async fn set_flag(
        &self,
        ctx: &UserContext,
        id: Uuid,
        flag: Flag,
        value: bool,
    ) -> Result<FileEntry> {
        let entry = self.get(ctx, id).await?;
        self.apply_flag(ctx, entry, flag, value).await
    }

    /// Flip one flag, as the star and trash buttons do.
    pub async fn toggle_flag(&self, ctx: &UserContext, id: Uuid, flag: Flag) -> Result<FileEntry> {
        let entry = self.get(ctx, id).await?;
        let value = match flag {
            Flag::Star => !entry.is_starred,
            Flag::Trash => !entry.is_trash,
        };
        self.apply_flag(ctx, entry, flag, value).await
    }

    /// Take an entry (and its subtree) out of the trash.
    pub async fn restore(&self, ctx: &UserContext, id: Uuid) -> Result<FileEntry> {
        self.set_flag(ctx, id, Flag::Trash, false).await
    }

    /// Reparent an entry. Moving a folder under itself or one of its
    /// descendants is rejected.
    pub async fn move_entry(
        &self,
        ctx: &UserContext,
        id: Uuid,
        new_parent: Option<Uuid>,
    ) -> Result<FileEntry> {
        let entry = self.get(ctx, id).await?;

        let parent_path = match new_parent {
            Some(parent_id) => {
                let parent = self.writable_parent(ctx, parent_id).await?;
                let chain = self.ancestors(ctx, parent_id).await?;
                if chain.iter().any(|a| a.id == id) {
                    return Err(AppError::Validation(format!(
                        "Cannot move '{}' into itself or one of its subfolders",
                        entry.name
                    )));
                }
                parent.path
            }
            None => String::new(),
        };

        let txn = self.db.begin().await?;
        let moved = reparent(&txn, ctx, entry, new_parent, &parent_path).await?;
        txn.commit().await?;
        tracing::info!("Moved {} to {}", moved.id, moved.path);
        Ok(moved)
    }

    /// Permanently delete an entry, its subtree and their stored objects.
    pub async fn purge(&self, ctx: &UserContext, id: Uuid) -> Result<u64> {
        let entry = self.get(ctx, id).await?;
        let removed = self.purge_subtree(ctx, entry).await?;
        tracing::info!("Purged {} ({} rows) for user {}", id, removed, ctx.user_id);
        Ok(removed)
    }

    /// Purge every trashed entry of the user. Returns the number of rows removed.
    pub async fn empty_trash(&self, ctx: &UserContext) -> Result<u64> {
        let trashed = Entity::find()
            .filter(Column::UserId.eq(ctx.user_id.as_str()))
            .filter(Column::IsTrash.eq(true))
            .all(&self.db)
            .await?;

        let trashed_ids: HashSet<Uuid> = trashed.iter().map(|e| e.id).collect();

        let mut removed = 0;
        for entry in trashed
            .into_iter()
            .filter(|e| e.parent_id.map_or(true, |p| !trashed_ids.contains(&p)))
        {
            removed += self.purge_subtree(ctx, entry).await?;
        }

        tracing::info!("Emptied trash for user {}: {} rows", ctx.user_id, removed);
        Ok(removed)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Resolve a folder new entries may be placed in: owned, a folder, not trashed.
    pub async fn writable_parent(&self, ctx: &UserContext, parent_id: Uuid) -> Result<FileEntry> {
        let parent = find_owned(&self.db, ctx, parent_id)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!("Parent folder {} does not exist", parent_id))
            })?;

        if !parent.is_folder {
            return Err(AppError::Validation(format!(
                "Parent '{}' is not a folder",
                parent.name
            )));
        }
        if parent.is_trash {
            return Err(AppError::Validation(format!(
                "Parent folder '{}' is in the trash",
                parent.name
            )));
        }
        Ok(parent)
    }

    async fn apply_flag(
        &self,
        ctx: &UserContext,
        entry: FileEntry,
        flag: Flag,
        value: bool,
    ) -> Result<FileEntry> {
        match flag {
            Flag::Star => {
                let mut active: entity::ActiveModel = entry.into();
                active.is_starred = Set(value);
                active.updated_at = Set(Utc::now());
                Ok(active.update(&self.db).await?)
            }
            Flag::Trash => {
                let id = entry.id;
                let parent_id = entry.parent_id;
                let txn = self.db.begin().await?;
                set_trash_subtree(&txn, ctx, &entry, value).await?;

                if !value {
                    // A restored entry whose folder is still trashed goes back to the root.
                    if let Some(parent_id) = parent_id {
                        let parent_trashed = find_owned(&txn, ctx, parent_id)
                            .await?
                            .map_or(true, |p| p.is_trash);
                        if parent_trashed {
                            let restored = find_owned(&txn, ctx, id).await?.ok_or_else(|| {
                                AppError::NotFound(format!("File {} not found", id))
                            })?;
                            let moved = reparent(&txn, ctx, restored, None, "").await?;
                            txn.commit().await?;
                            return Ok(moved);
                        }
                    }
                }

                txn.commit().await?;
                self.get(ctx, id).await
            }
        }
    }

    /// Remove an entry and its subtree, children before parents. Each stored
    /// object is deleted before its row; a provider failure stops the purge
    /// with the remaining rows intact.
    async fn purge_subtree(&self, ctx: &UserContext, entry: FileEntry) -> Result<u64> {
        let root_id = entry.id;
        let mut doomed = vec![entry];
        doomed.extend(descendants(&self.db, ctx, root_id).await?);
        doomed.reverse();

        let mut removed = 0;
        for item in doomed {
            if let Some(storage_id) = item.storage_id.as_deref() {
                self.store.delete(storage_id).await.map_err(|e| match e {
                    AppError::Storage { .. } => e,
                    other => AppError::Storage {
                        status: 502,
                        message: other.to_string(),
                    },
                })?;
            }

            Entity::delete_by_id(item.id)
                .filter(Column::UserId.eq(ctx.user_id.as_str()))
                .exec(&self.db)
                .await?;
            removed += 1;
            tracing::debug!("Deleted row {} ({})", item.id, item.path);
        }

        Ok(removed)
    }
}

async fn init_schema(db: &DatabaseConnection) -> Result<()> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut table = schema.create_table_from_entity(Entity);
    table.if_not_exists();
    db.execute(backend.build(&table)).await?;

    for mut index in schema.create_index_from_entity(Entity) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    let tree_index = Index::create()
        .if_not_exists()
        .name("idx-files-user_id-parent_id")
        .table(Entity)
        .col(Column::UserId)
        .col(Column::ParentId)
        .to_owned();
    db.execute(backend.build(&tree_index)).await?;

    Ok(())
}

/// Set the trash flag on an entry and its subtree. Trashing stamps every
/// row it changes with one `deleted_at`; restoring clears only the rows
/// carrying the entry's stamp, so entries trashed on their own stay trashed.
async fn set_trash_subtree<C: ConnectionTrait>(
    conn: &C,
    ctx: &UserContext,
    entry: &FileEntry,
    value: bool,
) -> Result<()> {
    let subtree = descendants(conn, ctx, entry.id).await?;
    let now = Utc::now();

    let mut ids = vec![entry.id];
    let deleted_at = if value {
        let stamp = entry.deleted_at.filter(|_| entry.is_trash).unwrap_or(now);
        ids.extend(subtree.iter().filter(|e| !e.is_trash).map(|e| e.id));
        Some(stamp)
    } else {
        if let Some(stamp) = entry.deleted_at {
            ids.extend(
                subtree
                    .iter()
                    .filter(|e| e.is_trash && e.deleted_at == Some(stamp))
                    .map(|e| e.id),
            );
        }
        None
    };

    let result = Entity::update_many()
        .col_expr(Column::IsTrash, Expr::value(value))
        .col_expr(Column::DeletedAt, Expr::value(deleted_at))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::UserId.eq(ctx.user_id.as_str()))
        .filter(Column::Id.is_in(ids))
        .filter(Column::IsTrash.eq(!value))
        .exec(conn)
        .await?;

    tracing::info!(
        "{} {} entries under {}",
        if value { "Trashed" } else { "Restored" },
        result.rows_affected,
        entry.id
    );
    Ok(())
}

/// Point an entry at a new parent and rewrite the paths of its subtree.
async fn reparent<C: ConnectionTrait>(
    conn: &C,
    ctx: &UserContext,
    entry: FileEntry,
    new_parent: Option<Uuid>,
    parent_path: &str,
) -> Result<FileEntry> {
    let subtree = descendants(conn, ctx, entry.id).await?;
    let now = Utc::now();

    let new_path = join_path(parent_path, &entry.name);
    let mut paths = HashMap::from([(entry.id, new_path.clone())]);

    let mut active: entity::ActiveModel = entry.into();
    active.parent_id = Set(new_parent);
    active.path = Set(new_path);
    active.updated_at = Set(now);
    let moved = active.update(conn).await?;

    // Descendants come level by level, so a parent's path is known first.
    for child in subtree {
        let Some(base) = child.parent_id.and_then(|p| paths.get(&p).cloned()) else {
            continue;
        };
        let path = join_path(&base, &child.name);
        paths.insert(child.id, path.clone());

        let mut active: entity::ActiveModel = child.into();
        active.path = Set(path);
        active.update(conn).await?;
    }

    Ok(moved)
}

async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    ctx: &UserContext,
    id: Uuid,
) -> Result<Option<FileEntry>> {
    Ok(Entity::find_by_id(id)
        .filter(Column::UserId.eq(ctx.user_id.as_str()))
        .one(conn)
        .await?)
}

/// All entries below `root`, breadth first.
async fn descendants<C: ConnectionTrait>(
    conn: &C,
    ctx: &UserContext,
    root: Uuid,
) -> Result<Vec<FileEntry>> {
    let mut found = Vec::new();
    let mut seen = HashSet::from([root]);
    let mut frontier = vec![root];

    while !frontier.is_empty() {
        let children = Entity::find()
            .filter(Column::UserId.eq(ctx.user_id.as_str()))
            .filter(Column::ParentId.is_in(frontier))
            .all(conn)
            .await?;

        frontier = Vec::new();
        for child in children {
            if seen.insert(child.id) {
                if child.is_folder {
                    frontier.push(child.id);
                }
                found.push(child);
            }
        }
    }

    Ok(found)
}

fn join_path(parent: &str, name: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), name)
}
