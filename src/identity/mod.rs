//! Who is signed in.
//!
//! The dashboard only needs four things from an identity provider: check a
//! session token, sign a user in, create an account, and read a profile.

use async_trait::async_trait;

use crate::error::Result;

pub mod clerk;
pub mod types;


pub use clerk::ClerkClient;
pub use types::{Session, UserProfile};

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a session token to its user. Fails with `Auth` when the
    /// session is unknown or no longer active.
    async fn verify_session(&self, token: &str) -> Result<Session>;

    /// Check an email and password and open a new session.
    async fn sign_in(&self, identifier: &str, password: &str) -> Result<Session>;

    /// Create an account.
    async fn sign_up(&self, email: &str, password: &str) -> Result<UserProfile>;

    async fn user(&self, user_id: &str) -> Result<UserProfile>;
}
