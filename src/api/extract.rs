//! Resolves the signed-in user of a request.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use std::sync::Arc;

use super::handler::AppState;
use crate::drive::UserContext;
use crate::error::{AppError, Result};

/// The user behind the `Authorization: Bearer <session id>` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserContext);

/// Pull the session token out of an `Authorization` header value.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| AppError::Auth("Unauthorized".to_string()))?;

        let session = state.identity.verify_session(token).await?;
        Ok(AuthUser(
            UserContext::new(session.user_id).with_session(session.session_id),
        ))
    }
}
