//! Client side of the drive: API calls and the state behind each screen.

pub mod api;
pub mod confirm;
pub mod dashboard;
pub mod tabs;
pub mod upload;

pub use api::{DriveClient, Progress};
pub use confirm::ConfirmationModal;
pub use tabs::{FileAction, FileView, Tab};
pub use upload::{SelectedFile, UploadForm};
