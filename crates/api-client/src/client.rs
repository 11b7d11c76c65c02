use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tracing::debug;

use hubble_api::*;
use hubble_core::Attachment;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("{status}{}", body_suffix(.body))]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("service error: {0}")]
    Service(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn body_suffix(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Typed HTTP client for the Hubble processing service.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl ApiClient {
    /// Create a new client.
    ///
    /// `connect_timeout` bounds connection setup for every call;
    /// `request_timeout` bounds the short request/response calls only, so a
    /// long-running processing stream is never cut off.
    pub fn new(base_url: &str, connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── Health ────────────────────────────────────────────────────────────

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self
            .client
            .get(self.url(HEALTH_PATH))
            .timeout(self.request_timeout)
            .send()
            .await?;
        parse_response(resp).await
    }

    // ── Processing ────────────────────────────────────────────────────────

    /// Upload a document and return the open event-stream response.
    ///
    /// Non-2xx statuses are turned into [`ApiError::Status`]; the body is
    /// left unread otherwise.
    pub async fn process(&self, attachment: Attachment, request: &str) -> Result<reqwest::Response> {
        let file_name = attachment.file_name().to_string();
        let media_type = attachment.media_type().to_string();
        let part = Part::bytes(attachment.into_bytes())
            .file_name(file_name.clone())
            .mime_str(&media_type)?;
        let form = Form::new()
            .part(FILE_FIELD, part)
            .text(REQUEST_FIELD, request.to_string());

        debug!(file = %file_name, %request, "uploading document");
        let resp = self
            .client
            .post(self.url(PROCESS_PATH))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .multipart(form)
            .send()
            .await?;
        ensure_success(resp).await
    }

    // ── Regeneration ──────────────────────────────────────────────────────

    pub async fn regenerate(&self, req: &RegenerateRequest) -> Result<RegenerateResponse> {
        let resp = self
            .client
            .post(self.url(REGENERATE_PATH))
            .timeout(self.request_timeout)
            .form(req)
            .send()
            .await?;
        let body: RegenerateResponse = parse_response(resp).await?;
        body.into_result().map_err(ApiError::Service)
    }

    // ── Artifacts ─────────────────────────────────────────────────────────

    /// Fetch a resolved chart or download reference.
    pub async fn fetch_artifact(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send().await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    /// Fetch an artifact and write it to `dest`, returning the byte count.
    pub async fn download_artifact(&self, url: &str, dest: &Path) -> Result<u64> {
        let bytes = self.fetch_artifact(url).await?;
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;
        Ok(bytes.len() as u64)
    }
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Status { status, body });
    }
    Ok(resp)
}

/// Parse an HTTP response: return the deserialized body on 2xx,
/// or an error containing the status and body text.
async fn parse_response<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let resp = ensure_success(resp).await?;
    Ok(resp.json().await?)
}
