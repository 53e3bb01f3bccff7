//! HTTP multipart transport
//!
//! Posts each file as a `multipart/form-data` request with a `file` part and,
//! when non-empty, a `subdir` text part. The endpoint already carries the
//! pre-shared key (see `config::build_endpoint`).

use crate::error::{TransportError, TransportResult};
use crate::transport::{Connector, Transport, UploadReceipt};
use reqwest::blocking::{multipart, Client};
use reqwest::redirect::Policy;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

/// Longest server message kept for display
const MAX_MESSAGE_LEN: usize = 200;

/// Maximum number of redirects followed per request
const MAX_REDIRECTS: usize = 10;

/// JSON body returned by the upload endpoint
#[derive(Debug, Deserialize)]
struct ServerReply {
    #[serde(default)]
    success: Option<bool>,

    #[serde(default)]
    message: Option<String>,

    #[serde(default)]
    error: Option<String>,
}

/// Builds an `HttpTransport` for each worker
#[derive(Debug, Clone)]
pub struct HttpConnector {
    endpoint: String,
    timeout: Duration,
}

impl HttpConnector {
    /// Create a connector for `endpoint` with a per-request `timeout`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

impl Connector for HttpConnector {
    type Transport = HttpTransport;

    fn connect(&self, worker_id: usize) -> TransportResult<HttpTransport> {
        debug!(worker = worker_id, "Creating HTTP client");
        HttpTransport::new(self.endpoint.clone(), self.timeout)
    }
}

/// Blocking HTTP upload client owned by a single worker
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with its own client
    pub fn new(endpoint: String, timeout: Duration) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("file-uploader/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::InitFailed(e.without_url().to_string()))?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    fn request_error(&self, path: &Path, err: reqwest::Error) -> TransportError {
        let path = path.display().to_string();
        if err.is_timeout() {
            TransportError::Timeout {
                path,
                secs: self.timeout.as_secs(),
            }
        } else {
            // Strip the URL: it carries the upload key.
            TransportError::Request {
                path,
                reason: err.without_url().to_string(),
            }
        }
    }
}

impl Transport for HttpTransport {
    fn upload(&mut self, path: &Path, subdir: &str) -> TransportResult<UploadReceipt> {
        let request_failed = |e: std::io::Error| TransportError::Request {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let bytes = std::fs::metadata(path).map_err(request_failed)?.len();

        let mut form = multipart::Form::new().file("file", path).map_err(request_failed)?;
        if !subdir.is_empty() {
            form = form.text("subdir", subdir.to_string());
        }

        trace!(path = %path.display(), subdir = subdir, bytes = bytes, "Sending upload request");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .map_err(|e| self.request_error(path, e))?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| self.request_error(path, e))?;

        interpret_response(path, status, &body, bytes)
    }
}

/// Turn a server response into a receipt or an error
///
/// Non-2xx statuses are failures. A 2xx JSON body with `"success": false` is
/// a rejection; anything else in the 2xx range is a success.
pub fn interpret_response(
    path: &Path,
    status: u16,
    body: &str,
    bytes: u64,
) -> TransportResult<UploadReceipt> {
    let reply = serde_json::from_str::<ServerReply>(body).ok();

    let message = match &reply {
        Some(reply) => reply.message.clone().or_else(|| reply.error.clone()),
        None => {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| truncate(trimmed, MAX_MESSAGE_LEN))
        }
    };

    if !(200..300).contains(&status) {
        return Err(TransportError::Status {
            path: path.display().to_string(),
            status,
            message,
        });
    }

    if let Some(ServerReply {
        success: Some(false),
        ..
    }) = reply
    {
        return Err(TransportError::Rejected {
            path: path.display().to_string(),
            message: message.unwrap_or_else(|| "Unknown error".to_string()),
        });
    }

    Ok(UploadReceipt {
        status,
        bytes,
        message,
    })
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
