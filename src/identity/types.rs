//! Identity types and Clerk Backend API payloads.

use serde::{Deserialize, Serialize};

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
}

/// What the profile page shows about a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub image_url: Option<String>,
    /// Unix milliseconds
    pub created_at: Option<i64>,
    pub last_sign_in_at: Option<i64>,
}

impl UserProfile {
    /// Full name when both parts are known, otherwise the first available
    /// of first name, username and email.
    pub fn display_name(&self) -> String {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());

        match (non_empty(&self.first_name), non_empty(&self.last_name)) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (first, _) => first
                .or_else(|| non_empty(&self.username))
                .or_else(|| non_empty(&self.email))
                .unwrap_or_else(|| "User".to_string()),
        }
    }
}

// ============================================================================
// Clerk Backend API
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ClerkSession {
    pub id: String,
    pub user_id: String,
    pub status: String,
}

impl ClerkSession {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

#[derive(Debug, Deserialize)]
pub struct ClerkEmailAddress {
    pub id: String,
    pub email_address: String,
}

#[derive(Debug, Deserialize)]
pub struct ClerkUser {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<ClerkEmailAddress>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub last_sign_in_at: Option<i64>,
}

impl From<ClerkUser> for UserProfile {
    fn from(user: ClerkUser) -> Self {
        let email = user
            .email_addresses
            .iter()
            .find(|e| Some(&e.id) == user.primary_email_address_id.as_ref())
            .or_else(|| user.email_addresses.first())
            .map(|e| e.email_address.clone());

        UserProfile {
            id: user.id,
            email,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            image_url: user.image_url,
            created_at: user.created_at,
            last_sign_in_at: user.last_sign_in_at,
        }
    }
}

/// Request body for creating a user.
#[derive(Debug, Serialize)]
pub struct CreateUserRequest {
    pub email_address: Vec<String>,
    pub password: String,
}

/// Request body for checking a password.
#[derive(Debug, Serialize)]
pub struct VerifyPasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPasswordData {
    pub verified: bool,
}

/// Request body for creating a session.
#[derive(Debug, Serialize)]
pub struct CreateSessionRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ClerkErrorItem {
    pub message: String,
    #[serde(default)]
    pub long_message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClerkErrors {
    pub errors: Vec<ClerkErrorItem>,
}
