//! Credentials and upload signatures for the ImageKit API.

use chrono::{Duration, Utc};
use data_encoding::HEXLOWER;
use reqwest::{Client, RequestBuilder};
use ring::hmac;

use crate::drive::AuthParameters;

/// Base URL for the ImageKit upload API.
pub const UPLOAD_URL: &str = "https://upload.imagekit.io/api/v1/files/upload";

/// Base URL for the ImageKit management API.
pub const API_BASE_URL: &str = "https://api.imagekit.io/v1";

/// How long client upload signatures stay valid.
const SIGNATURE_TTL_MINUTES: i64 = 30;

/// Account keys plus the HTTP client that carries them.
#[derive(Clone)]
pub struct Credentials {
    public_key: String,
    private_key: String,
    http_client: Client,
}

impl Credentials {
    /// Create credentials with a shared HTTP client.
    pub fn new(public_key: String, private_key: String) -> crate::error::Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            public_key,
            private_key,
            http_client,
        })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Attach HTTP basic auth (private key, empty password) to a request.
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.private_key, Some(""))
    }

    /// Fresh `{token, expire, signature}` for a client-side upload.
    pub fn auth_parameters(&self) -> AuthParameters {
        let token = uuid::Uuid::new_v4().to_string();
        let expire = (Utc::now() + Duration::minutes(SIGNATURE_TTL_MINUTES)).timestamp();
        let signature = sign(&self.private_key, &token, expire);

        tracing::debug!("Issued upload signature expiring at {}", expire);
        AuthParameters {
            token,
            expire,
            signature,
        }
    }

    /// Get the HTTP client.
    pub fn http_client(&self) -> &Client {
        &self.http_client
    }
}

/// `hex(HMAC-SHA1(private_key, token ++ expire))`.
pub fn sign(private_key: &str, token: &str, expire: i64) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, private_key.as_bytes());
    let tag = hmac::sign(&key, format!("{}{}", token, expire).as_bytes());
    HEXLOWER.encode(tag.as_ref())
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}
