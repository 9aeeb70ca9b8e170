//! Transport seam: the trait the coordinator submits files through, plus
//! the reqwest-backed implementation used in production.

use std::io::Cursor;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::policy::HttpMethod;
use crate::source::FileSource;

/// Progress callback invoked with `(bytes_sent, bytes_total)` as the file
/// body leaves the transport.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send + Sync>;

/// One file submission: the file itself plus extra multipart fields
/// flattened alongside it.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub file: FileSource,
    pub form_data: Vec<(String, String)>,
}

/// Structured error body some servers return alongside a failure status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub errors: Vec<ServerError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

/// Transport-level failure: a generic message, plus the server's structured
/// payload when the response body carried one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub payload: Option<ErrorPayload>,
}

impl TransportError {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            payload: None,
        }
    }
}

/// Performs the actual network submission of one file.
///
/// `endpoint` is the policy's endpoint path; implementations resolve it
/// against whatever base they were configured with. The request is
/// multipart/form-data with the file under field `file` and the payload's
/// extra fields flattened in. The response body is returned as plain text.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: HttpMethod,
        endpoint: &str,
        payload: UploadPayload,
        on_progress: ProgressFn,
    ) -> Result<String, TransportError>;
}

/// reqwest-backed transport submitting to `base_url` + endpoint path.
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn request_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!("{}{}", self.base_url.trim_end_matches('/'), endpoint)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: HttpMethod,
        endpoint: &str,
        payload: UploadPayload,
        on_progress: ProgressFn,
    ) -> Result<String, TransportError> {
        let url = self.request_url(endpoint);
        let total = payload.file.len();
        let file_name = payload.file.name().to_string();
        debug!(%url, file = %file_name, total, "submitting multipart upload");

        let reader = ProgressReader {
            inner: Cursor::new(payload.file.bytes()),
            sent: 0,
            total,
            on_progress,
        };
        let part = Part::stream_with_length(reqwest::Body::wrap_stream(ReaderStream::new(reader)), total)
            .file_name(file_name);

        let mut form = Form::new();
        for (key, value) in payload.form_data {
            form = form.text(key, value);
        }
        form = form.part("file", part);

        let request = match method {
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Patch => self.client.patch(&url),
        };

        let response = request
            .multipart(form)
            .send()
            .await
            .map_err(|err| TransportError::message(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError::message(err.to_string()))?;

        if !status.is_success() {
            warn!(%url, %status, "upload request failed");
            // A non-JSON error body just means no structured metadata.
            let payload = serde_json::from_str::<ErrorPayload>(&body).ok();
            return Err(TransportError {
                message: format!("The upload request failed ({status})"),
                payload,
            });
        }

        Ok(body)
    }
}

/// Counts bytes as reqwest drains the file body, reporting each read to the
/// progress callback.
struct ProgressReader {
    inner: Cursor<Bytes>,
    sent: u64,
    total: u64,
    on_progress: ProgressFn,
}

impl AsyncRead for ProgressReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);

        if let Poll::Ready(Ok(())) = poll {
            let read = (buf.filled().len() - before) as u64;
            if read > 0 {
                this.sent += read;
                (this.on_progress)(this.sent, this.total);
            }
        }

        poll
    }
}
