//! Public object storage for uploaded images.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("blob store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `filename` and return its public URL.
    async fn put(&self, filename: &str, content_type: &str, bytes: Bytes) -> Result<String, BlobError>;
}

/// Vercel-style blob API: `PUT {base}/{pathname}` answered with `{"url": …}`.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl HttpBlobStore {
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

#[derive(Deserialize)]
struct PutReply {
    url: String,
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, filename: &str, content_type: &str, bytes: Bytes) -> Result<String, BlobError> {
        let size = bytes.len();
        let response = self
            .http
            .put(format!("{}/{filename}", self.base_url))
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-content-type", content_type)
            .header("x-access", "public")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(filename, status = status.as_u16(), "blob upload rejected");
            return Err(BlobError::Status { status: status.as_u16(), body });
        }
        let PutReply { url } = response.json().await?;
        info!(filename, size, url = %url, "blob stored");
        Ok(url)
    }
}
