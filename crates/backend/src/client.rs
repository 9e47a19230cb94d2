//! HTTP implementation of [`FileBackend`].
//!
//! Async client using `reqwest` with Bearer token authentication taken from
//! the [`Session`].

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use filedock_protocol::{ApiErrorBody, FileListResponse, FileRecord};
use futures_util::StreamExt;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Response, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::{BackendFuture, FileBackend, ProgressCallback, UploadPayload};
use crate::error::BackendError;
use crate::session::Session;

const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Size of the body chunks handed to the transport. Progress is reported
/// once per chunk.
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Connection settings for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub upload_chunk_size: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            request_timeout: DEFAULT_TIMEOUT,
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
        }
    }
}

/// Storage API client bound to one session.
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    chunk_size: usize,
    session: Session,
}

impl HttpBackend {
    /// Creates a client that authenticates as `session`.
    pub fn new(config: &BackendConfig, session: Session) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", session.token()))
                .map_err(|_| BackendError::Config("token is not a valid header value".into()))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chunk_size: config.upload_chunk_size.max(1),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn file_url(&self, id: &str, suffix: &str) -> String {
        let encoded = utf8_percent_encode(id, NON_ALPHANUMERIC);
        self.url(&format!("/files/{encoded}{suffix}"))
    }

    fn ensure_active(&self) -> Result<(), BackendError> {
        if self.session.is_active() {
            Ok(())
        } else {
            Err(BackendError::SignedOut)
        }
    }

    async fn upload_file(
        &self,
        payload: UploadPayload,
        on_progress: ProgressCallback,
    ) -> Result<FileRecord, BackendError> {
        self.ensure_active()?;

        let total = payload.bytes.len() as u64;
        let body = progress_body(payload.bytes, self.chunk_size, on_progress);
        let part = Part::stream_with_length(body, total)
            .file_name(payload.name.clone())
            .mime_str(&payload.media_type)?;
        let form = Form::new().part("file", part);

        debug!(file = %payload.name, size = total, "uploading");
        let resp = self
            .http
            .post(self.url("/files/upload"))
            .multipart(form)
            .send()
            .await?;
        let body = check_status(resp).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_files(&self) -> Result<Vec<FileRecord>, BackendError> {
        self.ensure_active()?;
        let resp = self.http.get(self.url("/files")).send().await?;
        let body = check_status(resp).await?.bytes().await?;
        let list: FileListResponse = serde_json::from_slice(&body)?;
        Ok(list.into_files())
    }

    async fn get_content(&self, id: &str) -> Result<Bytes, BackendError> {
        self.ensure_active()?;
        let resp = self.http.get(self.file_url(id, "/content")).send().await?;
        Ok(check_status(resp).await?.bytes().await?)
    }

    async fn remove_file(&self, id: &str) -> Result<(), BackendError> {
        self.ensure_active()?;
        let resp = self.http.delete(self.file_url(id, "")).send().await?;
        check_status(resp).await?;
        Ok(())
    }
}

impl FileBackend for HttpBackend {
    fn upload(
        &self,
        payload: UploadPayload,
        on_progress: ProgressCallback,
    ) -> BackendFuture<'_, FileRecord> {
        let cancel = self.session.child_token();
        Box::pin(async move { cancellable(&cancel, self.upload_file(payload, on_progress)).await })
    }

    fn list_files(&self, cancel: CancellationToken) -> BackendFuture<'_, Vec<FileRecord>> {
        Box::pin(async move { cancellable(&cancel, self.get_files()).await })
    }

    fn fetch_content<'a>(
        &'a self,
        id: &'a str,
        cancel: CancellationToken,
    ) -> BackendFuture<'a, Bytes> {
        Box::pin(async move { cancellable(&cancel, self.get_content(id)).await })
    }

    fn delete_file<'a>(&'a self, id: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(self.remove_file(id))
    }
}

/// Races `fut` against `cancel`. Cancellation wins ties.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, BackendError>>,
) -> Result<T, BackendError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BackendError::Cancelled),
        result = fut => result,
    }
}

/// Maps non-success responses to errors, keeping the server's reason.
async fn check_status(resp: Response) -> Result<Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(BackendError::NotFound);
    }

    let body = resp.bytes().await.unwrap_or_default();
    let api = ApiErrorBody::parse(&body);
    warn!(status = status.as_u16(), reason = ?api.message, "request rejected");
    Err(BackendError::Rejected {
        status: status.as_u16(),
        message: api.message,
        code: api.code,
    })
}

/// Wraps `payload` in a streaming body that reports cumulative bytes handed
/// to the transport.
fn progress_body(payload: Bytes, chunk_size: usize, on_progress: ProgressCallback) -> Body {
    let total = payload.len() as u64;
    let chunks: Vec<Bytes> = (0..payload.len())
        .step_by(chunk_size)
        .map(|start| payload.slice(start..(start + chunk_size).min(payload.len())))
        .collect();

    let mut sent = 0u64;
    let stream = futures_util::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len() as u64;
        on_progress(sent, total);
        Ok::<_, std::io::Error>(chunk)
    });
    Body::wrap_stream(stream)
}
