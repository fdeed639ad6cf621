/**
 * Cloudinary Upload Provider
 *
 * Signed uploads through the Cloudinary REST API:
 *
 * ```text
 * POST {api}/v1_1/{cloud_name}/auto/upload
 * file=...&public_id=...&overwrite=...&invalidate=...&timestamp=...
 *     &api_key=...&signature=...&signature_algorithm=sha256
 * ```
 *
 * The signature is the SHA-256 hex digest of the signed parameters sorted
 * by name (`k=v` joined with `&`) followed by the API secret. `file`,
 * `api_key` and the signature fields themselves are not signed.
 *
 * `file` may be a remote URL, a data URI or base64 content; the provider
 * fetches or decodes it.
 */

use std::collections::BTreeMap;
use std::time::Duration;
use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use crate::backend::server::config::CloudinaryConfig;
use crate::backend::upload::{UploadFailure, UploadOptions, UploadProvider};

pub const CLOUDINARY_API: &str = "https://api.cloudinary.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Upload provider for one Cloudinary account
#[derive(Debug, Clone)]
pub struct CloudinaryUploader {
    config: CloudinaryConfig,
    client: reqwest::Client,
    base_url: String,
}

impl CloudinaryUploader {
    pub fn new(config: CloudinaryConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            config,
            client,
            base_url: CLOUDINARY_API.to_string(),
        }
    }

    /// Point at another API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1_1/{}/auto/upload", self.base_url, self.config.cloud_name)
    }

    /// Sign the given parameters with the account secret
    pub fn sign(&self, params: &BTreeMap<&'static str, String>) -> String {
        let to_sign = params
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");
        let digest = Sha256::digest(format!("{}{}", to_sign, self.config.api_secret).as_bytes());
        format!("{:x}", digest)
    }
}

fn signed_params(options: &UploadOptions, timestamp: i64) -> BTreeMap<&'static str, String> {
    let mut params = BTreeMap::new();
    if let Some(public_id) = &options.public_id {
        params.insert("public_id", public_id.clone());
    }
    if let Some(overwrite) = options.overwrite {
        params.insert("overwrite", overwrite.to_string());
    }
    if let Some(invalidate) = options.invalidate {
        params.insert("invalidate", invalidate.to_string());
    }
    params.insert("timestamp", timestamp.to_string());
    params
}

fn error_message(payload: &Value) -> Option<String> {
    payload
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl UploadProvider for CloudinaryUploader {
    async fn upload(&self, file: &str, options: &UploadOptions) -> Result<Value, UploadFailure> {
        let params = signed_params(options, chrono::Utc::now().timestamp());
        let signature = self.sign(&params);

        let mut form: Vec<(&str, String)> = params.into_iter().collect();
        form.push(("file", file.to_string()));
        form.push(("api_key", self.config.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));

        let response = self
            .client
            .post(self.endpoint())
            .form(&form)
            .send()
            .await
            .map_err(|e| UploadFailure::new(format!("request failed: {}", e)))?;

        let status = response.status();
        let payload: Value = response.json().await.map_err(|e| UploadFailure {
            message: format!("unreadable response: {}", e),
            http_code: Some(status.as_u16()),
            payload: Value::Null,
        })?;

        if status.is_success() {
            return Ok(payload);
        }
        Err(UploadFailure {
            message: error_message(&payload)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("upload rejected").to_string()),
            http_code: Some(status.as_u16()),
            payload,
        })
    }
}
