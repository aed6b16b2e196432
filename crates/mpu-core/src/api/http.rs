//! Blocking curl client for the three control-plane endpoints.
//!
//! One Easy handle per call; the calls are small JSON POSTs off the transfer
//! hot path. Runs in the current thread; call from `spawn_blocking` if used
//! from async code.

use anyhow::{Context, Result};
use std::time::Duration;
use url::Url;

use super::types::{CompleteResponse, CompletedPart, CreateUploadResponse, SignedUrlResponse};
use super::StorageApi;

/// JSON-over-HTTP implementation of [`StorageApi`].
pub struct HttpStorageApi {
    base: Url,
    timeout: Duration,
}

impl HttpStorageApi {
    /// Client rooted at `base` (e.g. `http://localhost:3000/api/`).
    /// A missing trailing slash is added so endpoint joining keeps the
    /// base path segment.
    pub fn new(mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self {
            base,
            timeout: Duration::from_secs(30),
        }
    }

    /// Override the per-call timeout (default 30s).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolved base URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<Vec<u8>> {
        let url = self
            .base
            .join(path)
            .with_context(|| format!("invalid API path: {}", path))?;
        let payload = serde_json::to_vec(body).context("encode request body")?;
        let mut response = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str()).context("invalid URL")?;
        easy.post(true)?;
        easy.post_fields_copy(&payload)?;
        easy.connect_timeout(Duration::from_secs(15))?;
        easy.timeout(self.timeout)?;

        let mut list = curl::easy::List::new();
        list.append("Content-Type: application/json")?;
        list.append("Accept: application/json")?;
        easy.http_headers(list)?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                response.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer
                .perform()
                .with_context(|| format!("POST {} failed", url))?;
        }

        let code = easy.response_code().context("no response code")?;
        if !(200..300).contains(&code) {
            anyhow::bail!("POST {} returned HTTP {}", url, code);
        }
        Ok(response)
    }
}

impl StorageApi for HttpStorageApi {
    fn create_upload(&self, filename: &str) -> Result<CreateUploadResponse> {
        let body = serde_json::json!({ "filename": filename });
        let raw = self.post_json("multipart_uploads", &body)?;
        serde_json::from_slice(&raw).context("malformed create-upload response")
    }

    fn part_url(
        &self,
        object_key: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<SignedUrlResponse> {
        let body = serde_json::json!({
            "fileKey": object_key,
            "uploadId": upload_id,
            "partNumber": part_number,
        });
        let raw = self.post_json(&format!("multipart_uploads/{}/part_url", upload_id), &body)?;
        serde_json::from_slice(&raw).context("malformed part-url response")
    }

    fn complete_upload(
        &self,
        object_key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<CompleteResponse> {
        let body = serde_json::json!({
            "fileKey": object_key,
            "uploadId": upload_id,
            "parts": parts,
        });
        let raw = self.post_json(
            &format!("multipart_uploads/{}/completions", upload_id),
            &body,
        )?;
        serde_json::from_slice(&raw).context("malformed completions response")
    }
}
