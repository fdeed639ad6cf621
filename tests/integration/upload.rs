//! Upload pass-through integration tests
//!
//! The uploader is built from environment-style configuration and pointed at
//! a mock Cloudinary endpoint.

use std::collections::HashMap;
use chatty::backend::server::Config;
use chatty::backend::upload::{uploads, CloudinaryUploader, UploadOptions, UploadOutcome};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn uploader_from_env(server: &MockServer) -> CloudinaryUploader {
    let env: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgres://localhost/chatty_test"),
        ("REDIS_HOST", "memory://"),
        ("CLIENT_URL", "http://localhost:3000"),
        ("SECRET_KEY_ONE", "integration-primary-secret-0123456789"),
        ("SECRET_KEY_TWO", "integration-secondary-secret-0123456789"),
        ("CLOUD_NAME", "chatty"),
        ("CLOUD_API_KEY", "key-1"),
        ("CLOUD_API_SECRET", "secret-1"),
    ]);
    let config = Config::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();
    CloudinaryUploader::new(config.cloudinary.expect("cloudinary configured")).with_base_url(server.uri())
}

#[tokio::test]
async fn test_avatar_upload_reports_provider_result() {
    let server = MockServer::start().await;
    let result = json!({
        "public_id": "avatars/42",
        "version": 1700000000,
        "secure_url": "https://res.cloudinary.com/chatty/image/upload/avatars/42.png"
    });
    Mock::given(method("POST"))
        .and(path("/v1_1/chatty/auto/upload"))
        .and(body_string_contains("public_id=avatars%2F42"))
        .and(body_string_contains("invalidate=true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(result.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = uploads(
        &uploader_from_env(&server),
        "data:image/png;base64,iVBORw0KGgo=",
        UploadOptions::new().public_id("avatars/42").overwrite(true).invalidate(true),
    )
    .await;

    assert!(outcome.is_uploaded());
    assert_eq!(outcome.payload(), &result);
}

#[tokio::test]
async fn test_rejected_upload_reports_provider_error() {
    let server = MockServer::start().await;
    let error = json!({"error": {"message": "Invalid Signature"}});
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(error.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = uploads(&uploader_from_env(&server), "file", UploadOptions::new()).await;

    match outcome {
        UploadOutcome::Failed(failure) => {
            assert_eq!(failure.message, "Invalid Signature");
            assert_eq!(failure.http_code, Some(401));
            assert_eq!(failure.payload, error);
        }
        UploadOutcome::Uploaded(result) => panic!("expected a failure, got {}", result),
    }
}
