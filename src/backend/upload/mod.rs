//! Upload Module
//!
//! Media uploads are delegated to an external provider. The provider is a
//! black box with one call, `upload(file, options)`, and the outcome is
//! handed back to the caller unchanged:
//!
//! - **`UploadOutcome::Uploaded`** carries the provider's success payload
//! - **`UploadOutcome::Failed`** carries the provider's error payload
//!
//! `uploads()` never returns an `Err` and never panics; every outcome is
//! logged under the `upload` target. The call settles exactly once.
//!
//! # Providers
//!
//! - **`cloudinary`** - signed uploads to the Cloudinary REST API
//!
//! # Example
//!
//! ```rust,no_run
//! use chatty::backend::upload::{uploads, UploadOptions, UploadOutcome, UploadProvider};
//!
//! # async fn example(provider: &dyn UploadProvider) {
//! let options = UploadOptions::new().public_id("avatar-42").overwrite(true);
//! match uploads(provider, "data:image/png;base64,iVBORw0KGgo=", options).await {
//!     UploadOutcome::Uploaded(result) => println!("stored at {}", result["secure_url"]),
//!     UploadOutcome::Failed(error) => println!("rejected: {}", error.message),
//! }
//! # }
//! ```

pub mod cloudinary;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use cloudinary::CloudinaryUploader;

/// Per-upload options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub public_id: Option<String>,
    pub overwrite: Option<bool>,
    pub invalidate: Option<bool>,
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn public_id(mut self, public_id: impl Into<String>) -> Self {
        self.public_id = Some(public_id.into());
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = Some(overwrite);
        self
    }

    pub fn invalidate(mut self, invalidate: bool) -> Self {
        self.invalidate = Some(invalidate);
        self
    }
}

/// The provider's error payload
#[derive(Debug, Clone, PartialEq, Error)]
#[error("upload failed: {message}")]
pub struct UploadFailure {
    pub message: String,
    /// HTTP status reported by the provider, if the request got that far
    pub http_code: Option<u16>,
    /// The provider's response body, unchanged
    pub payload: Value,
}

impl UploadFailure {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            payload: serde_json::json!({ "error": { "message": message } }),
            message,
            http_code: None,
        }
    }
}

/// Result of one upload
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Uploaded(Value),
    Failed(UploadFailure),
}

impl UploadOutcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, Self::Uploaded(_))
    }

    /// The payload the provider reported, success or error
    pub fn payload(&self) -> &Value {
        match self {
            Self::Uploaded(result) => result,
            Self::Failed(failure) => &failure.payload,
        }
    }
}

/// External upload capability
#[async_trait]
pub trait UploadProvider: Send + Sync {
    async fn upload(&self, file: &str, options: &UploadOptions) -> Result<Value, UploadFailure>;
}

/// Upload a file and report the outcome without raising
pub async fn uploads(provider: &dyn UploadProvider, file: &str, options: UploadOptions) -> UploadOutcome {
    match provider.upload(file, &options).await {
        Ok(result) => {
            tracing::info!(
                target: "upload",
                public_id = ?options.public_id,
                "[Upload] Upload complete: {}",
                result
            );
            UploadOutcome::Uploaded(result)
        }
        Err(failure) => {
            tracing::error!(
                target: "upload",
                public_id = ?options.public_id,
                http_code = ?failure.http_code,
                "[Upload] {}: {}",
                failure,
                failure.payload
            );
            UploadOutcome::Failed(failure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    /// Reports a fixed outcome and records what it was asked
    struct StubProvider {
        outcome: Result<Value, UploadFailure>,
        calls: Mutex<Vec<(String, UploadOptions)>>,
    }

    impl StubProvider {
        fn new(outcome: Result<Value, UploadFailure>) -> Self {
            Self {
                outcome,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl UploadProvider for StubProvider {
        async fn upload(&self, file: &str, options: &UploadOptions) -> Result<Value, UploadFailure> {
            self.calls.lock().unwrap().push((file.to_string(), options.clone()));
            self.outcome.clone()
        }
    }

    #[tokio::test]
    async fn test_success_payload_passes_through() {
        let payload = json!({"public_id": "avatar", "secure_url": "https://cdn/avatar.png", "version": 3});
        let provider = StubProvider::new(Ok(payload.clone()));

        let outcome = uploads(&provider, "file.png", UploadOptions::new().public_id("avatar")).await;

        assert_eq!(outcome, UploadOutcome::Uploaded(payload.clone()));
        assert_eq!(outcome.payload(), &payload);
    }

    #[tokio::test]
    async fn test_error_payload_passes_through() {
        let failure = UploadFailure {
            message: "Invalid image file".to_string(),
            http_code: Some(400),
            payload: json!({"error": {"message": "Invalid image file"}}),
        };
        let provider = StubProvider::new(Err(failure.clone()));

        let outcome = uploads(&provider, "not-an-image", UploadOptions::new()).await;

        assert!(!outcome.is_uploaded());
        assert_eq!(outcome, UploadOutcome::Failed(failure.clone()));
        assert_eq!(outcome.payload(), &failure.payload);
    }

    #[tokio::test]
    async fn test_settles_once() {
        let provider = StubProvider::new(Ok(json!({})));
        let options = UploadOptions::new().public_id("p").overwrite(true).invalidate(false);

        let _ = uploads(&provider, "file.png", options.clone()).await;

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ("file.png".to_string(), options));
    }

    #[test]
    fn test_failure_payload_shape() {
        let failure = UploadFailure::new("timeout");
        assert_eq!(failure.payload, json!({"error": {"message": "timeout"}}));
        assert_eq!(failure.http_code, None);
    }
}
