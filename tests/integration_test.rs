//! API tests: the real router and file tree over TCP, with in-memory
//! storage and identity providers.

mod common;

use parking_lot::Mutex;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;

use common::TestApp;
use imagedrive::client::tabs::{FileView, Tab};
use imagedrive::client::upload::{create_folder, SelectedFile, UploadForm};
use imagedrive::error::AppError;
use imagedrive::MAX_UPLOAD_BYTES;

fn image(name: &str, size: usize) -> SelectedFile {
    SelectedFile::new(name, vec![0xAB; size])
}

async fn upload(client: &imagedrive::client::DriveClient, name: &str) -> imagedrive::drive::FileEntry {
    let mut form = UploadForm::default();
    form.select(image(name, 1024)).unwrap();
    form.upload(client, None, |_| {}).await.unwrap()
}

#[tokio::test]
async fn test_vacation_upload_scenario() {
    let app = TestApp::spawn().await;
    let (session, client) = app.sign_in("alice@example.com").await;

    let vacation = create_folder(&client, "Vacation", None, |_| {}).await.unwrap();
    assert!(vacation.is_folder);
    assert_eq!(vacation.path, "/Vacation");

    // Just under the ceiling: accepted, with progress up to 100%.
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let mut form = UploadForm::default().with_progress_listener(Arc::new(move |pct: u8| {
        log.lock().push(pct);
    }));
    form.select(image("beach.jpg", MAX_UPLOAD_BYTES as usize - 1)).unwrap();

    let mut refreshed = 0;
    let beach = form
        .upload(&client, Some(vacation.id), |_| refreshed += 1)
        .await
        .unwrap();
    assert_eq!(refreshed, 1);
    assert!(form.selected().is_none());
    assert_eq!(seen.lock().last(), Some(&100));
    assert_eq!(beach.parent_id, Some(vacation.id));
    assert_eq!(beach.user_id, session.user_id);
    assert_eq!(beach.path, "/Vacation/beach.jpg");
    assert_eq!(beach.file_type, "image/jpeg");
    assert_eq!(beach.size, MAX_UPLOAD_BYTES as i64 - 1);

    let listing = client.list(Some(vacation.id)).await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id, beach.id);

    // Over the ceiling: refused before any request.
    let err = form
        .select(image("huge.png", 6 * 1024 * 1024))
        .unwrap_err();
    assert!(matches!(err, AppError::SizeLimit { .. }));
    assert_eq!(app.upload_count(), 1);

    let breadcrumb = client.ancestors(beach.id).await.unwrap();
    let names: Vec<_> = breadcrumb.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["Vacation", "beach.jpg"]);
}

#[tokio::test]
async fn test_star_trash_empty_scenario() {
    let app = TestApp::spawn().await;
    let (_, client) = app.sign_in("alice@example.com").await;

    let a = upload(&client, "a.png").await;
    let b = upload(&client, "b.png").await;

    let starred = client.toggle_star(a.id).await.unwrap();
    assert!(starred.is_starred);

    let mut view = FileView::new(client.list(None).await.unwrap());
    view.select(Tab::Starred);
    assert_eq!(view.visible().len(), 1);

    let trashed = client.toggle_trash(a.id).await.unwrap();
    assert!(trashed.is_trash);
    assert!(trashed.deleted_at.is_some());

    view.set_entries(client.list(None).await.unwrap());
    assert!(view.visible().is_empty());
    view.select(Tab::Trash);
    assert_eq!(view.visible()[0].id, a.id);
    assert!(view.can_empty_trash());

    let emptied = client.empty_trash().await.unwrap();
    assert!(emptied.success);
    assert_eq!(emptied.deleted_count, 1);

    let remaining = client.list(None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, b.id);
    assert_eq!(*app.store.deleted.lock(), ["obj_1"]);
}

#[tokio::test]
async fn test_restore_brings_entry_back() {
    let app = TestApp::spawn().await;
    let (_, client) = app.sign_in("alice@example.com").await;

    let a = upload(&client, "a.png").await;
    client.toggle_trash(a.id).await.unwrap();

    let restored = client.restore(a.id).await.unwrap();
    assert!(!restored.is_trash);
    assert!(restored.deleted_at.is_none());

    let view = FileView::new(client.list(None).await.unwrap());
    assert_eq!(view.visible()[0].id, a.id);
}

#[tokio::test]
async fn test_purged_entry_never_listed_again() {
    let app = TestApp::spawn().await;
    let (_, client) = app.sign_in("alice@example.com").await;

    let a = upload(&client, "a.png").await;
    let deleted = client.delete(a.id).await.unwrap();
    assert!(deleted.success);
    assert_eq!(deleted.deleted_id, a.id.to_string());

    assert!(client.list(None).await.unwrap().is_empty());
    let err = client.get(a.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_move_rejects_cycle() {
    let app = TestApp::spawn().await;
    let (_, client) = app.sign_in("alice@example.com").await;

    let outer = client.create_folder("Outer", None).await.unwrap();
    let inner = client.create_folder("Inner", Some(outer.id)).await.unwrap();

    let err = client.move_to(outer.id, Some(inner.id)).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let moved = client.move_to(inner.id, None).await.unwrap();
    assert_eq!(moved.path, "/Inner");
    assert_eq!(moved.parent_id, None);
}

#[tokio::test]
async fn test_users_are_isolated() {
    let app = TestApp::spawn().await;
    let (_, alice) = app.sign_in("alice@example.com").await;
    let (_, bob) = app.sign_in("bob@example.com").await;

    let a = upload(&alice, "private.png").await;

    assert!(bob.list(None).await.unwrap().is_empty());
    assert!(matches!(bob.get(a.id).await, Err(AppError::NotFound(_))));
    assert!(matches!(bob.delete(a.id).await, Err(AppError::NotFound(_))));
    assert!(app.store.deleted.lock().is_empty());
}

#[tokio::test]
async fn test_requests_need_a_session() {
    let app = TestApp::spawn().await;
    let http = reqwest::Client::new();

    let response = http
        .get(format!("{}/api/files", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = http
        .get(format!("{}/api/files", app.base_url))
        .bearer_auth("sess_forged")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Invalid session"));
}

#[tokio::test]
async fn test_body_user_must_match_session() {
    let app = TestApp::spawn().await;
    let (session, _) = app.sign_in("alice@example.com").await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/folders/create", app.base_url))
        .bearer_auth(&session.session_id)
        .json(&json!({ "name": "Stolen", "userId": "user_bob", "parentId": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_server_enforces_upload_rules() {
    let app = TestApp::spawn().await;
    let (session, _) = app.sign_in("alice@example.com").await;
    let http = reqwest::Client::new();
    let url = format!("{}/api/files/upload", app.base_url);

    // Not an image
    let form = Form::new()
        .part(
            "file",
            Part::bytes(b"hello".to_vec())
                .file_name("notes.txt")
                .mime_str("text/plain")
                .unwrap(),
        )
        .text("userId", session.user_id.clone());
    let response = http
        .post(&url)
        .bearer_auth(&session.session_id)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // One byte over, sent past the client-side check
    let form = Form::new()
        .part(
            "file",
            Part::bytes(vec![0u8; MAX_UPLOAD_BYTES as usize + 1])
                .file_name("huge.png")
                .mime_str("image/png")
                .unwrap(),
        )
        .text("userId", session.user_id.clone());
    let response = http
        .post(&url)
        .bearer_auth(&session.session_id)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    assert_eq!(app.upload_count(), 0);
}

#[tokio::test]
async fn test_download_redirects_to_cdn() {
    let app = TestApp::spawn().await;
    let (_, client) = app.sign_in("alice@example.com").await;

    let a = upload(&client, "a.png").await;
    let url = client.download_url(a.id).await.unwrap();
    assert_eq!(url, a.file_url);
    assert_eq!(url, "https://ik.imagekit.io/test/user_alice/a.png");
}

#[tokio::test]
async fn test_sign_in_form_errors_by_field() {
    let app = TestApp::spawn().await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/auth/sign-in", app.base_url))
        .json(&json!({ "identifier": "not-an-email", "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["fields"]["identifier"][0], "Invalid email");
    assert_eq!(
        body["fields"]["password"][0],
        "Password must and should be 8 characters"
    );
}

#[tokio::test]
async fn test_wrong_password_is_auth_error() {
    let app = TestApp::spawn().await;
    let client = imagedrive::client::DriveClient::new(app.base_url.clone()).unwrap();

    let form = imagedrive::validation::SignInForm {
        identifier: "alice@example.com".to_string(),
        password: "wrong-password".to_string(),
    };
    let err = client.sign_in(&form).await.unwrap_err();
    assert!(matches!(err, AppError::Auth(ref m) if m.contains("Password is incorrect")));
}

#[tokio::test]
async fn test_profile_and_upload_auth() {
    let app = TestApp::spawn().await;
    let (_, client) = app.sign_in("alice@example.com").await;

    client.create_folder("Docs", None).await.unwrap();
    let a = upload(&client, "a.png").await;
    client.toggle_star(a.id).await.unwrap();

    let profile = client.profile().await.unwrap();
    assert_eq!(profile.user.id, "user_alice");
    assert_eq!(profile.usage.files, 1);
    assert_eq!(profile.usage.folders, 1);
    assert_eq!(profile.usage.starred, 1);
    assert_eq!(profile.usage.total_bytes, 1024);

    let auth = client.imagekit_auth().await.unwrap();
    assert_eq!(auth.params.token, "token-1");
    assert_eq!(auth.public_key, "public_test");
}
