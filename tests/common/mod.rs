//! Shared fixtures: an API server on a real port with in-memory providers.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

use imagedrive::api::{create_router, AppState};
use imagedrive::client::DriveClient;
use imagedrive::drive::{AuthParameters, FileTree, ObjectStore, StoredObject, UploadObject};
use imagedrive::error::{AppError, Result};
use imagedrive::identity::{IdentityProvider, Session, UserProfile};
use imagedrive::validation::SignInForm;
use imagedrive::MAX_UPLOAD_BYTES;

pub const PASSWORD: &str = "correct-horse";

/// Object store that keeps only a log of what happened.
#[derive(Default)]
pub struct FakeStore {
    pub uploads: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn upload(&self, object: UploadObject) -> Result<StoredObject> {
        let mut uploads = self.uploads.lock();
        let storage_id = format!("obj_{}", uploads.len() + 1);
        uploads.push(object.file_name.clone());

        Ok(StoredObject {
            url: format!(
                "https://ik.imagekit.io/test/{}/{}",
                object.user_id, object.file_name
            ),
            thumbnail_url: None,
            size: object.data.len() as i64,
            storage_id,
        })
    }

    async fn delete(&self, storage_id: &str) -> Result<()> {
        self.deleted.lock().push(storage_id.to_string());
        Ok(())
    }

    fn auth_parameters(&self) -> Result<AuthParameters> {
        Ok(AuthParameters {
            token: "token-1".to_string(),
            expire: 1_700_001_800,
            signature: "abc123".to_string(),
        })
    }
}

/// Identity provider with two known users: `alice@example.com` and
/// `bob@example.com`, both using [`PASSWORD`].
#[derive(Default)]
pub struct FakeIdentity {
    sessions: Mutex<HashMap<String, String>>,
}

fn user_id_for(email: &str) -> Option<String> {
    match email {
        "alice@example.com" => Some("user_alice".to_string()),
        "bob@example.com" => Some("user_bob".to_string()),
        _ => None,
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn verify_session(&self, token: &str) -> Result<Session> {
        let user_id = self
            .sessions
            .lock()
            .get(token)
            .cloned()
            .ok_or_else(|| AppError::Auth("Invalid session".to_string()))?;
        Ok(Session {
            session_id: token.to_string(),
            user_id,
        })
    }

    async fn sign_in(&self, identifier: &str, password: &str) -> Result<Session> {
        let user_id = user_id_for(identifier)
            .ok_or_else(|| AppError::Auth("Couldn't find your account".to_string()))?;
        if password != PASSWORD {
            return Err(AppError::Auth("Password is incorrect".to_string()));
        }

        let mut sessions = self.sessions.lock();
        let session_id = format!("sess_{}", sessions.len() + 1);
        sessions.insert(session_id.clone(), user_id.clone());
        Ok(Session {
            session_id,
            user_id,
        })
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<UserProfile> {
        if user_id_for(email).is_some() {
            return Err(AppError::Auth("That email address is taken.".to_string()));
        }
        Ok(profile("user_new", email))
    }

    async fn user(&self, user_id: &str) -> Result<UserProfile> {
        let email = user_id.trim_start_matches("user_");
        Ok(profile(user_id, &format!("{}@example.com", email)))
    }
}

fn profile(id: &str, email: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        email: Some(email.to_string()),
        first_name: None,
        last_name: None,
        username: None,
        image_url: None,
        created_at: Some(1_700_000_000_000),
        last_sign_in_at: None,
    }
}

/// A running server and handles on its fakes.
pub struct TestApp {
    pub base_url: String,
    pub store: Arc<FakeStore>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let dir = TempDir::new().unwrap();
        let database_url = format!("sqlite:{}/drive.db?mode=rwc", dir.path().display());

        let store = Arc::new(FakeStore::default());
        let tree = FileTree::connect(&database_url, store.clone()).await.unwrap();

        let router = create_router(AppState {
            tree,
            identity: Arc::new(FakeIdentity::default()),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            imagekit_public_key: "public_test".to_string(),
            imagekit_url_endpoint: "https://ik.imagekit.io/test".to_string(),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            store,
            _dir: dir,
        }
    }

    /// A client signed in as `email`.
    pub async fn sign_in(&self, email: &str) -> (Session, DriveClient) {
        let form = SignInForm {
            identifier: email.to_string(),
            password: PASSWORD.to_string(),
        };
        DriveClient::new(self.base_url.clone())
            .unwrap()
            .sign_in(&form)
            .await
            .unwrap()
    }

    pub fn upload_count(&self) -> usize {
        self.store.uploads.lock().len()
    }
}
