//! Blob Storage
//!
//! Uploaded files (consultation attachments, hospital card photos) are
//! stored outside MongoDB; only the returned URL is persisted.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, error};

use crate::shared::error::{ClinicError, Result};

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key` and return its public URL
    async fn put(&self, key: &str, content_type: Option<&str>, data: Bytes) -> Result<String>;
}

/// Used when no blob endpoint is configured; every upload fails.
pub struct DisabledBlobStore;

#[async_trait]
impl BlobStore for DisabledBlobStore {
    async fn put(&self, key: &str, _content_type: Option<&str>, _data: Bytes) -> Result<String> {
        Err(ClinicError::blob(format!("uploads are not configured (key {})", key)))
    }
}

/// Blob service speaking `PUT {endpoint}/{key}` with a bearer token,
/// answering `{"url": "..."}`.
pub struct HttpBlobStore {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

#[derive(Deserialize)]
struct PutResponse {
    url: Option<String>,
}

impl HttpBlobStore {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.endpoint, key)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, key: &str, content_type: Option<&str>, data: Bytes) -> Result<String> {
        let url = self.object_url(key);
        let size = data.len();

        let mut request = self.client.put(&url).body(data);
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }
        if let Some(ct) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, ct);
        }

        let response = request.send().await.map_err(|e| {
            error!(key, error = %e, "Blob upload request failed");
            ClinicError::blob(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(key, status = %status, "Blob upload rejected");
            return Err(ClinicError::blob(format!("upload of {} returned {}", key, status)));
        }

        let stored_url = response
            .json::<PutResponse>()
            .await
            .ok()
            .and_then(|r| r.url)
            .unwrap_or(url);

        debug!(key, size, url = %stored_url, "Blob stored");
        Ok(stored_url)
    }
}

/// Make an uploaded file name safe to embed in a blob key.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();

    if cleaned.trim_matches(['.', '_']).is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
