#[cfg(test)]
mod tests {
    use crate::drive::{ObjectStore, UploadObject};
    use crate::error::AppError;
    use crate::imagekit::{sign, Credentials, ImageKitClient};
    use axum::extract::{Multipart, State};
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::routing::{delete, post};
    use axum::{Json, Router};
    use bytes::Bytes;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base: &str, retries: usize) -> ImageKitClient {
        let credentials =
            Credentials::new("public_test".to_string(), "private_test_key".to_string()).unwrap();
        ImageKitClient::new(credentials, "/imagedrive".to_string(), retries)
            .with_base_urls(format!("{}/upload", base), format!("{}/v1", base))
    }

    fn beach() -> UploadObject {
        UploadObject {
            user_id: "user_alice".to_string(),
            parent_id: None,
            file_name: "beach.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            data: Bytes::from_static(b"not really a jpeg"),
        }
    }

    #[test]
    fn test_signature_matches_reference() {
        let signature = sign(
            "private_test_key",
            "8e2f1a6c-0d3b-4c55-9a77-1f0e2d3c4b5a",
            1_700_000_000,
        );
        assert_eq!(signature, "dcfc96866d8ce37ffaccaaa451cb794ee6f3224b");
    }

    #[test]
    fn test_auth_parameters_are_fresh_and_signed() {
        let credentials =
            Credentials::new("public_test".to_string(), "private_test_key".to_string()).unwrap();
        let params = credentials.auth_parameters();

        assert!(params.expire > chrono::Utc::now().timestamp());
        assert_eq!(params.signature, sign("private_test_key", &params.token, params.expire));
        assert_ne!(params.token, credentials.auth_parameters().token);
    }

    #[test]
    fn test_folder_layout() {
        let client = client_for("http://unused", 0);
        let mut object = beach();
        assert_eq!(client.folder_for(&object), "/imagedrive/user_alice");

        let parent = uuid::Uuid::new_v4();
        object.parent_id = Some(parent);
        assert_eq!(
            client.folder_for(&object),
            format!("/imagedrive/user_alice/folders/{}", parent)
        );
    }

    type Seen = Arc<Mutex<HashMap<String, String>>>;

    async fn fake_upload(
        State(seen): State<Seen>,
        headers: HeaderMap,
        mut multipart: Multipart,
    ) -> Json<serde_json::Value> {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        seen.lock().insert("authorization".to_string(), auth);

        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            let value = if name == "file" {
                format!("{} bytes", field.bytes().await.unwrap().len())
            } else {
                field.text().await.unwrap()
            };
            seen.lock().insert(name, value);
        }

        Json(json!({
            "fileId": "file_123",
            "name": "beach_AbC.jpg",
            "url": "https://ik.imagekit.io/demo/beach_AbC.jpg",
            "thumbnailUrl": "https://ik.imagekit.io/demo/tr:n-ik_ml_thumbnail/beach_AbC.jpg",
            "size": 17,
            "filePath": "/imagedrive/user_alice/beach_AbC.jpg",
            "fileType": "image"
        }))
    }

    #[tokio::test]
    async fn test_upload_sends_form_and_parses_response() {
        let seen: Seen = Arc::default();
        let base = spawn(
            Router::new()
                .route("/upload", post(fake_upload))
                .with_state(seen.clone()),
        )
        .await;

        let stored = client_for(&base, 0).upload(beach()).await.unwrap();
        assert_eq!(stored.storage_id, "file_123");
        assert_eq!(stored.size, 17);
        assert!(stored.thumbnail_url.is_some());

        let seen = seen.lock();
        assert_eq!(seen["fileName"], "beach.jpg");
        assert_eq!(seen["folder"], "/imagedrive/user_alice");
        assert_eq!(seen["useUniqueFileName"], "true");
        assert_eq!(seen["file"], "17 bytes");
        assert!(seen["authorization"].starts_with("Basic "));
    }

    #[tokio::test]
    async fn test_delete_missing_object_is_ok() {
        let base = spawn(Router::new().route(
            "/v1/files/:id",
            delete(|| async { StatusCode::NOT_FOUND }),
        ))
        .await;

        client_for(&base, 0).delete("file_gone").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_failure_is_storage_error() {
        let base = spawn(Router::new().route(
            "/v1/files/:id",
            delete(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Your request could not be processed" })),
                )
            }),
        ))
        .await;

        let err = client_for(&base, 0).delete("file_123").await.unwrap_err();
        match err {
            AppError::Storage { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Your request could not be processed");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_retried_only_when_configured() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let base = spawn(Router::new().route(
            "/v1/files/:id",
            delete(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        StatusCode::TOO_MANY_REQUESTS
                    } else {
                        StatusCode::NO_CONTENT
                    }
                }
            }),
        ))
        .await;

        let err = client_for(&base, 0).delete("file_123").await.unwrap_err();
        assert!(matches!(err, AppError::Storage { status: 429, .. }));

        hits.store(0, Ordering::SeqCst);
        client_for(&base, 1).delete("file_123").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
