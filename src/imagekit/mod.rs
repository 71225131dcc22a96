use std::time::Duration;

pub const RETRY_DELAY: Duration = Duration::from_secs(1);

pub mod auth;
pub mod client;
pub mod types;

#[cfg(test)]
mod tests;

pub use auth::{sign, Credentials};
pub use client::ImageKitClient;
pub use types::{ApiError, UploadData};
