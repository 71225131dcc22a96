//! Clerk Backend API client.

use async_trait::async_trait;
use cached::{Cached, TimedSizedCache};
use parking_lot::Mutex;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::types::*;
use super::IdentityProvider;
use crate::error::{AppError, Result};

/// Base URL for the Clerk Backend API.
pub const BASE_URL: &str = "https://api.clerk.com/v1";

/// Seconds a verified session is trusted before asking Clerk again.
const SESSION_CACHE_SECONDS: u64 = 60;
const SESSION_CACHE_SIZE: usize = 1024;

/// Identity provider backed by Clerk.
#[derive(Clone)]
pub struct ClerkClient {
    secret_key: String,
    base_url: String,
    http_client: Client,
    /// Password sign-in through the Backend API; only development instances serve it
    password_sign_in: bool,
    /// session id -> verified session
    sessions: Arc<Mutex<TimedSizedCache<String, Session>>>,
}

impl ClerkClient {
    /// Create a new Clerk client.
    pub fn new(secret_key: String) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            secret_key,
            base_url: BASE_URL.to_string(),
            http_client,
            password_sign_in: false,
            sessions: Arc::new(Mutex::new(TimedSizedCache::with_size_and_lifespan(
                SESSION_CACHE_SIZE,
                SESSION_CACHE_SECONDS,
            ))),
        })
    }

    /// Point the client at another API base.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Allow `sign_in` to check passwords and open sessions itself.
    ///
    /// Clerk serves `POST /sessions` only on development instances, so this
    /// stays off in production, where users sign in through Clerk and hand
    /// their session id to the drive.
    pub fn with_password_sign_in(mut self, enabled: bool) -> Self {
        self.password_sign_in = enabled;
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(clerk_error(response).await);
        }
        Ok(response.json().await?)
    }
}

/// Turn a Clerk error response into an auth error carrying its first message.
async fn clerk_error(response: Response) -> AppError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<ClerkErrors>(&text)
        .ok()
        .and_then(|e| e.errors.into_iter().next())
        .map(|e| e.long_message.unwrap_or(e.message))
        .unwrap_or_else(|| format!("Identity provider returned {}", status));

    tracing::debug!("Clerk error: status={}, message={}", status, message);
    AppError::Auth(message)
}

#[async_trait]
impl IdentityProvider for ClerkClient {
    async fn verify_session(&self, token: &str) -> Result<Session> {
        if let Some(session) = self.sessions.lock().cache_get(token) {
            return Ok(session.clone());
        }

        let response = self
            .request(reqwest::Method::GET, &format!("/sessions/{}", token))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::Auth("Invalid session".to_string()));
        }

        let clerk_session: ClerkSession = Self::parse(response).await?;
        if !clerk_session.is_active() {
            return Err(AppError::Auth(format!(
                "Session is {}",
                clerk_session.status
            )));
        }

        let session = Session {
            session_id: clerk_session.id,
            user_id: clerk_session.user_id,
        };
        self.sessions
            .lock()
            .cache_set(token.to_string(), session.clone());

        tracing::debug!("Verified session for user {}", session.user_id);
        Ok(session)
    }

    async fn sign_in(&self, identifier: &str, password: &str) -> Result<Session> {
        if !self.password_sign_in {
            return Err(AppError::Auth(
                "Password sign-in is disabled; sign in with Clerk and use its session id"
                    .to_string(),
            ));
        }

        let users: Vec<ClerkUser> = Self::parse(
            self.request(reqwest::Method::GET, "/users")
                .query(&[("email_address", identifier)])
                .send()
                .await?,
        )
        .await?;

        let user = users
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Auth("Couldn't find your account".to_string()))?;

        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/users/{}/verify_password", user.id),
            )
            .json(&VerifyPasswordRequest {
                password: password.to_string(),
            })
            .send()
            .await?;

        let verified = if response.status().is_client_error() {
            false
        } else {
            Self::parse::<VerifyPasswordData>(response).await?.verified
        };
        if !verified {
            return Err(AppError::Auth("Password is incorrect".to_string()));
        }

        let clerk_session: ClerkSession = Self::parse(
            self.request(reqwest::Method::POST, "/sessions")
                .json(&CreateSessionRequest {
                    user_id: user.id.clone(),
                })
                .send()
                .await?,
        )
        .await?;

        tracing::info!("User {} signed in", user.id);
        Ok(Session {
            session_id: clerk_session.id,
            user_id: clerk_session.user_id,
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<UserProfile> {
        let user: ClerkUser = Self::parse(
            self.request(reqwest::Method::POST, "/users")
                .json(&CreateUserRequest {
                    email_address: vec![email.to_string()],
                    password: password.to_string(),
                })
                .send()
                .await?,
        )
        .await?;

        tracing::info!("Created user {}", user.id);
        Ok(user.into())
    }

    async fn user(&self, user_id: &str) -> Result<UserProfile> {
        let user: ClerkUser = Self::parse(
            self.request(reqwest::Method::GET, &format!("/users/{}", user_id))
                .send()
                .await?,
        )
        .await?;
        Ok(user.into())
    }
}

impl std::fmt::Debug for ClerkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClerkClient")
            .field("base_url", &self.base_url)
            .field("password_sign_in", &self.password_sign_in)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}
