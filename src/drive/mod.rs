pub mod context;
pub mod entity;
pub mod store;
pub mod tree;


pub use context::UserContext;
pub use store::{AuthParameters, ObjectStore, StoredObject, UploadObject};
pub use tree::{FileEntry, FileTree, Flag, NewFileEntry, StorageUsage};
