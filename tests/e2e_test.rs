//! End-to-end tests against the real ImageKit and Clerk services.
//!
//! These tests require:
//! - Environment variables: IMAGEKIT_PUBLIC_KEY, IMAGEKIT_PRIVATE_KEY,
//!   IMAGEKIT_URL_ENDPOINT, CLERK_SECRET_KEY
//! - An existing Clerk user on a development instance: E2E_EMAIL and E2E_PASSWORD
//!
//! The tests will:
//! 1. Start the server binary on a free port with a temporary database
//! 2. Sign in and create a folder
//! 3. Upload a small PNG into it and download it back
//! 4. Star, trash and empty the trash
//! 5. Verify the listing is empty afterwards

use std::env;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;

use imagedrive::client::upload::{SelectedFile, UploadForm};
use imagedrive::client::DriveClient;
use imagedrive::validation::SignInForm;

struct E2eEnv {
    imagekit_public_key: String,
    imagekit_private_key: String,
    imagekit_url_endpoint: String,
    clerk_secret_key: String,
    email: String,
    password: String,
}

/// Get credentials from environment.
fn get_test_env() -> Option<E2eEnv> {
    Some(E2eEnv {
        imagekit_public_key: env::var("IMAGEKIT_PUBLIC_KEY").ok()?,
        imagekit_private_key: env::var("IMAGEKIT_PRIVATE_KEY").ok()?,
        imagekit_url_endpoint: env::var("IMAGEKIT_URL_ENDPOINT").ok()?,
        clerk_secret_key: env::var("CLERK_SECRET_KEY").ok()?,
        email: env::var("E2E_EMAIL").ok()?,
        password: env::var("E2E_PASSWORD").ok()?,
    })
}

/// Find an available port.
fn find_available_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to port");
    listener.local_addr().unwrap().port()
}

/// Kills the server when the test ends, pass or fail.
struct Server(Child);

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// Start the server as a child process.
fn start_server(env: &E2eEnv, port: u16, db_dir: &TempDir) -> Server {
    let child = Command::new(env!("CARGO_BIN_EXE_imagedrive"))
        .env("IMAGEKIT_PUBLIC_KEY", &env.imagekit_public_key)
        .env("IMAGEKIT_PRIVATE_KEY", &env.imagekit_private_key)
        .env("IMAGEKIT_URL_ENDPOINT", &env.imagekit_url_endpoint)
        .env("IMAGEKIT_FOLDER", "/imagedrive-e2e")
        .env("CLERK_SECRET_KEY", &env.clerk_secret_key)
        .env("CLERK_PASSWORD_SIGN_IN", "true")
        .env(
            "DATABASE_URL",
            format!("sqlite:{}/e2e.db?mode=rwc", db_dir.path().display()),
        )
        .env("LISTEN_ADDR", "127.0.0.1")
        .env("LISTEN_PORT", port.to_string())
        .env("PROVIDER_RETRIES", "2")
        .env("RUST_LOG", "info")
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("Failed to start server");
    Server(child)
}

/// Wait for the server to be ready.
async fn wait_for_server(base_url: &str, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    let url = format!("{}/api/files", base_url);

    while start.elapsed() < timeout {
        // Any response (a 401 here) means the server is up.
        if reqwest::get(&url).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

/// A tiny valid PNG (1x1, transparent).
fn tiny_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

#[tokio::test]
async fn test_e2e_upload_star_trash() {
    let Some(test_env) = get_test_env() else {
        eprintln!("Skipping e2e test: ImageKit/Clerk credentials or E2E_EMAIL/E2E_PASSWORD not set");
        return;
    };

    let db_dir = TempDir::new().unwrap();
    let port = find_available_port();
    let _server = start_server(&test_env, port, &db_dir);
    let base_url = format!("http://127.0.0.1:{}", port);
    assert!(
        wait_for_server(&base_url, Duration::from_secs(30)).await,
        "Server did not start"
    );

    let form = SignInForm {
        identifier: test_env.email.clone(),
        password: test_env.password.clone(),
    };
    let (_, client) = DriveClient::new(base_url.clone())
        .unwrap()
        .sign_in(&form)
        .await
        .expect("Sign-in failed");

    let folder_name = format!("e2e-{}", chrono::Utc::now().timestamp());
    let folder = client.create_folder(&folder_name, None).await.unwrap();

    let mut upload = UploadForm::default();
    upload
        .select(SelectedFile::new("pixel.png", tiny_png()))
        .unwrap();
    let pixel = upload
        .upload(&client, Some(folder.id), |_| {})
        .await
        .expect("Upload failed");
    assert!(pixel.file_url.starts_with("https://"));

    let data = client.download(pixel.id).await.unwrap();
    // The CDN may re-encode, so only check something came back.
    assert!(!data.is_empty());

    assert!(client.toggle_star(pixel.id).await.unwrap().is_starred);
    assert!(client.toggle_trash(folder.id).await.unwrap().is_trash);

    let emptied = client.empty_trash().await.unwrap();
    assert!(emptied.deleted_count >= 2);

    let root = client.list(None).await.unwrap();
    assert!(root.iter().all(|e| e.id != folder.id));
}
