//! Personal image drive backed by ImageKit storage and Clerk identity.
//!
//! This library provides the file tree, the provider clients, the HTTP API
//! and the client-side flows shared by the `imagedrive` server and `drive-cli`.

pub mod api;
pub mod client;
pub mod config;
pub mod drive;
pub mod error;
pub mod identity;
pub mod imagekit;
pub mod validation;

/// Upload ceiling applied by the client before any request and by the server.
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
